//! Error types for the `gifclip` crate.
//!
//! This module defines [`GifClipError`], the unified error type returned by
//! every fallible operation in the crate. The first five variants mirror the
//! stages a conversion can fail in; the remaining ones wrap upstream errors
//! so `?` works across I/O, image decoding, and FFmpeg calls.

use std::io::Error as IoError;

#[cfg(feature = "pixel")]
use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `gifclip` operations.
///
/// Every variant renders a message that a front end can show as-is: the
/// underlying cause is always part of the text.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GifClipError {
    /// A conversion parameter was rejected before any work started (bad time
    /// range, resolution, frame rate, palette size, or a missing source).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The media could not be obtained, either because a local path does not
    /// exist or because the downloader exhausted every format selector.
    #[error("Source unavailable ({location}): {reason}")]
    SourceUnavailable {
        /// The path or URL that was being resolved.
        location: String,
        /// What went wrong, including remediation hints.
        reason: String,
    },

    /// No extraction strategy could produce frames.
    #[error("Frame extraction failed: {0}")]
    ExtractionFailed(String),

    /// The animated image could not be produced (no frames survived, or the
    /// written file failed verification).
    #[error("GIF encoding failed: {0}")]
    EncodingFailed(String),

    /// The operation was cancelled via a
    /// [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,

    /// An error originating from the FFmpeg libraries.
    #[cfg(feature = "pixel")]
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// Metadata returned by an external tool could not be parsed.
    #[error("Failed to parse {tool} output: {reason}")]
    ParseError {
        /// The tool whose output was being read.
        tool: String,
        /// Why parsing failed.
        reason: String,
    },

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while loading or resizing frames.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),
}

impl GifClipError {
    /// Returns `true` for [`GifClipError::Cancelled`].
    ///
    /// Cancellation travels through the same `Result` channel as failures but
    /// is reported as a normal terminal state by
    /// [`ConversionJob`](crate::ConversionJob).
    pub fn is_cancelled(&self) -> bool {
        matches!(self, GifClipError::Cancelled)
    }
}

#[cfg(feature = "pixel")]
impl From<FfmpegError> for GifClipError {
    fn from(error: FfmpegError) -> Self {
        GifClipError::FfmpegError(error.to_string())
    }
}

impl From<serde_json::Error> for GifClipError {
    fn from(error: serde_json::Error) -> Self {
        GifClipError::ParseError {
            tool: "JSON".to_string(),
            reason: error.to_string(),
        }
    }
}
