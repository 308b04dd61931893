//! Verbosity of the in-process decoder.
//!
//! The decoder writes its own diagnostics straight to stderr, bypassing the
//! [`log`] facade. Corrupt packets near a seek point are common and harmless
//! for GIF extraction and show up at the warning level.
//! [`FfmpegLogLevel::from_filter`] maps a `log` filter onto the closest decoder
//! level so a front end can keep both in step.
//!
//! # Example
//!
//! ```no_run
//! use gifclip::FfmpegLogLevel;
//!
//! gifclip::set_ffmpeg_log_level(FfmpegLogLevel::from_filter(log::LevelFilter::Debug));
//! ```

use ffmpeg_next::util::log::Level;
use log::LevelFilter;

/// Decoder log verbosity, from silent to most verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    /// No output at all.
    Quiet,
    /// Unrecoverable errors only.
    Fatal,
    /// Errors, including damaged packets.
    Error,
    /// Warnings and errors.
    Warning,
    /// Informational messages.
    Info,
    /// Per-packet debugging output.
    Debug,
}

impl FfmpegLogLevel {
    /// The decoder level closest to a `log` filter.
    pub fn from_filter(filter: LevelFilter) -> Self {
        match filter {
            LevelFilter::Off => FfmpegLogLevel::Quiet,
            LevelFilter::Error => FfmpegLogLevel::Fatal,
            LevelFilter::Warn => FfmpegLogLevel::Error,
            LevelFilter::Info => FfmpegLogLevel::Warning,
            LevelFilter::Debug => FfmpegLogLevel::Info,
            LevelFilter::Trace => FfmpegLogLevel::Debug,
        }
    }

    fn to_ffmpeg_level(self) -> Level {
        match self {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Fatal => Level::Fatal,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Debug => Level::Debug,
        }
    }
}

/// Set the decoder's stderr verbosity. Rust-side `log` output is unaffected.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    ffmpeg_next::util::log::set_level(level.to_ffmpeg_level());
}
