//! Local media file probing.
//!
//! [`probe_local`] walks an ordered list of probers and keeps the first one
//! that returns metadata: the in-process decoder (with the `pixel` feature),
//! then `ffprobe` JSON output, then fixed defaults. A prober that cannot
//! answer reports [`ProbeAttempt::Unavailable`] and the next one is tried.
//!
//! # Example
//!
//! ```no_run
//! use gifclip::{JobOptions, probe_local};
//!
//! let info = probe_local("input.mp4", &JobOptions::new())?;
//! if let Some(stream) = info.best_stream() {
//!     println!("{}x{}", stream.width, stream.height);
//! }
//! # Ok::<(), gifclip::GifClipError>(())
//! ```

use std::path::Path;
use std::process::{Command, Stdio};

use serde_json::Value;

use crate::config::JobOptions;
use crate::error::GifClipError;
use crate::metadata::{StreamDescriptor, VideoInfo};
use crate::utilities::file_stem;

/// Width reported when no prober could read the file.
pub const FALLBACK_WIDTH: u32 = 1920;
/// Height reported when no prober could read the file.
pub const FALLBACK_HEIGHT: u32 = 1080;
/// Frame rate reported when no prober could read the file.
pub const FALLBACK_FPS: f64 = 25.0;
/// Duration, in seconds, reported when no prober could read the file.
pub const FALLBACK_DURATION: f64 = 60.0;

/// Result of one prober.
#[derive(Debug, Clone)]
pub enum ProbeAttempt {
    /// The prober read the file.
    Found(VideoInfo),
    /// The prober could not answer; the reason is logged.
    Unavailable(String),
}

/// One way of reading local file metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prober {
    /// Open the file with the in-process decoder.
    #[cfg(feature = "pixel")]
    Pixel,
    /// Run the given `ffprobe`-compatible binary and parse its JSON.
    Cli(String),
    /// Assume 1920×1080, 25 fps, 60 s.
    Defaults,
}

impl Prober {
    /// The default chain for `options`.
    pub fn chain(options: &JobOptions) -> Vec<Prober> {
        let mut chain = Vec::with_capacity(3);
        #[cfg(feature = "pixel")]
        chain.push(Prober::Pixel);
        chain.push(Prober::Cli(options.probe_binary.clone()));
        chain.push(Prober::Defaults);
        chain
    }

    /// Short name for log messages.
    pub fn name(&self) -> &str {
        match self {
            #[cfg(feature = "pixel")]
            Prober::Pixel => "decoder",
            Prober::Cli(binary) => binary,
            Prober::Defaults => "defaults",
        }
    }

    /// Try to read metadata for `path`.
    pub fn attempt(&self, path: &Path) -> ProbeAttempt {
        match self {
            #[cfg(feature = "pixel")]
            Prober::Pixel => match crate::pixel::PixelReader::open(path) {
                Ok(reader) => ProbeAttempt::Found(reader.info()),
                Err(error) => ProbeAttempt::Unavailable(error.to_string()),
            },
            Prober::Cli(binary) => probe_with_cli(binary, path),
            Prober::Defaults => ProbeAttempt::Found(fallback_info(path)),
        }
    }
}

/// Read metadata for a local file.
///
/// # Errors
///
/// Returns [`GifClipError::SourceUnavailable`] if `path` does not exist.
/// Probing itself never fails: the last prober in the chain always answers.
pub fn probe_local<P: AsRef<Path>>(
    path: P,
    options: &JobOptions,
) -> Result<VideoInfo, GifClipError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(GifClipError::SourceUnavailable {
            location: path.display().to_string(),
            reason: "file does not exist".to_string(),
        });
    }

    for prober in Prober::chain(options) {
        match prober.attempt(path) {
            ProbeAttempt::Found(info) => {
                log::debug!("probed {} with {}", path.display(), prober.name());
                return Ok(info);
            }
            ProbeAttempt::Unavailable(reason) => {
                log::warn!("{} could not probe {}: {reason}", prober.name(), path.display());
            }
        }
    }

    Ok(fallback_info(path))
}

/// Parse the output of `ffprobe -print_format json -show_format
/// -show_streams` for the file at `path`.
///
/// Only video streams are kept. Frame rates given as fractions (`"30000/1001"`)
/// are evaluated.
pub fn parse_probe_json(json: &str, path: &Path) -> Result<VideoInfo, GifClipError> {
    let document: Value = serde_json::from_str(json)?;
    let streams: Vec<StreamDescriptor> = document["streams"]
        .as_array()
        .map(|streams| {
            streams
                .iter()
                .filter(|stream| stream["codec_type"].as_str() == Some("video"))
                .filter_map(|stream| {
                    let width = stream["width"].as_u64().and_then(|w| u32::try_from(w).ok())?;
                    let height = stream["height"].as_u64().and_then(|h| u32::try_from(h).ok())?;
                    Some(StreamDescriptor {
                        width,
                        height,
                        frames_per_second: stream["r_frame_rate"]
                            .as_str()
                            .or_else(|| stream["avg_frame_rate"].as_str())
                            .and_then(parse_rate),
                        codec: stream["codec_name"].as_str().map(str::to_string),
                        container: container_of(path),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    if streams.is_empty() {
        return Err(GifClipError::ParseError {
            tool: "ffprobe".to_string(),
            reason: "no video stream in output".to_string(),
        });
    }

    let duration = document["format"]["duration"]
        .as_str()
        .and_then(|d| d.trim().parse::<f64>().ok())
        .or_else(|| document["format"]["duration"].as_f64())
        .filter(|d| d.is_finite() && *d > 0.0);

    Ok(VideoInfo {
        title: file_stem(path),
        duration,
        uploader: "local file".to_string(),
        streams,
    })
}

fn probe_with_cli(binary: &str, path: &Path) -> ProbeAttempt {
    let output = Command::new(binary)
        .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(path)
        .stdin(Stdio::null())
        .output();

    match output {
        Ok(output) if output.status.success() => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            match parse_probe_json(&stdout, path) {
                Ok(info) => ProbeAttempt::Found(info),
                Err(error) => ProbeAttempt::Unavailable(error.to_string()),
            }
        }
        Ok(output) => ProbeAttempt::Unavailable(format!("exited with {}", output.status)),
        Err(error) => ProbeAttempt::Unavailable(error.to_string()),
    }
}

fn fallback_info(path: &Path) -> VideoInfo {
    VideoInfo {
        title: file_stem(path),
        duration: Some(FALLBACK_DURATION),
        uploader: "local file".to_string(),
        streams: vec![StreamDescriptor {
            width: FALLBACK_WIDTH,
            height: FALLBACK_HEIGHT,
            frames_per_second: Some(FALLBACK_FPS),
            codec: Some("unknown".to_string()),
            container: container_of(path),
        }],
    }
}

fn container_of(path: &Path) -> Option<String> {
    path.extension().map(|ext| ext.to_string_lossy().to_lowercase())
}

fn parse_rate(rate: &str) -> Option<f64> {
    let value = match rate.split_once('/') {
        Some((numerator, denominator)) => {
            let numerator: f64 = numerator.trim().parse().ok()?;
            let denominator: f64 = denominator.trim().parse().ok()?;
            if denominator == 0.0 {
                return None;
            }
            numerator / denominator
        }
        None => rate.trim().parse().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}
