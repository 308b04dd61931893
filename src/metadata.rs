//! Video metadata types.
//!
//! [`VideoInfo`] is the snapshot produced by one "fetch info" action, either
//! from the downloader for a remote source or from the local probe chain. It
//! is replaced wholesale on every fetch and read by the advisor and the job.

use serde_json::Value;

use crate::error::GifClipError;

/// One stream (format) a source offers.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDescriptor {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frame rate, if reported.
    pub frames_per_second: Option<f64>,
    /// Codec name (e.g. `"h264"`, `"vp9"`). `None` or `"none"` for
    /// audio-only entries.
    pub codec: Option<String>,
    /// Container extension (e.g. `"mp4"`).
    pub container: Option<String>,
}

impl StreamDescriptor {
    /// `true` if the descriptor names a real video codec.
    pub fn has_video(&self) -> bool {
        match self.codec.as_deref() {
            None => false,
            Some(codec) => !codec.is_empty() && !codec.eq_ignore_ascii_case("none"),
        }
    }
}

/// Metadata for a source video.
///
/// # Example
///
/// ```
/// use gifclip::{StreamDescriptor, VideoInfo};
///
/// let info = VideoInfo {
///     title: "clip".to_string(),
///     duration: Some(42.0),
///     uploader: "someone".to_string(),
///     streams: vec![
///         StreamDescriptor {
///             width: 1280,
///             height: 720,
///             frames_per_second: Some(30.0),
///             codec: Some("h264".to_string()),
///             container: Some("mp4".to_string()),
///         },
///         StreamDescriptor {
///             width: 0,
///             height: 0,
///             frames_per_second: None,
///             codec: Some("none".to_string()),
///             container: Some("m4a".to_string()),
///         },
///     ],
/// };
///
/// assert_eq!(info.best_stream().map(|s| s.height), Some(720));
/// assert_eq!(info.suggested_end_time(), 10.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct VideoInfo {
    /// Human-readable title.
    pub title: String,
    /// Duration in seconds, when known.
    pub duration: Option<f64>,
    /// Uploader or source label.
    pub uploader: String,
    /// Streams in the order the source reported them.
    pub streams: Vec<StreamDescriptor>,
}

impl VideoInfo {
    /// The video stream with the greatest height. Entries without a real
    /// video codec are ignored.
    pub fn best_stream(&self) -> Option<&StreamDescriptor> {
        self.streams
            .iter()
            .filter(|stream| stream.has_video())
            .max_by_key(|stream| stream.height)
    }

    /// Default end of the conversion window: ten seconds, or the whole video
    /// when it is shorter.
    pub fn suggested_end_time(&self) -> f64 {
        match self.duration {
            Some(duration) if duration > 0.0 => duration.min(10.0),
            _ => 10.0,
        }
    }

    /// Duration in seconds, or zero when unknown.
    pub fn duration_or_zero(&self) -> f64 {
        self.duration.filter(|d| d.is_finite() && *d > 0.0).unwrap_or(0.0)
    }

    /// Parse the single-video JSON document printed by `yt-dlp -J`.
    ///
    /// Missing fields fall back to neutral values; only a document that is
    /// not a JSON object is an error.
    pub fn from_downloader_json(json: &str) -> Result<Self, GifClipError> {
        let document: Value = serde_json::from_str(json)?;
        if !document.is_object() {
            return Err(GifClipError::ParseError {
                tool: "downloader".to_string(),
                reason: "expected a JSON object".to_string(),
            });
        }

        let title = document["title"]
            .as_str()
            .unwrap_or("Unknown")
            .to_string();
        let uploader = document["uploader"]
            .as_str()
            .or_else(|| document["channel"].as_str())
            .unwrap_or("Unknown")
            .to_string();
        let duration = document["duration"].as_f64().filter(|d| *d > 0.0);

        let mut streams: Vec<StreamDescriptor> = document["formats"]
            .as_array()
            .map(|formats| formats.iter().filter_map(descriptor_from_format).collect())
            .unwrap_or_default();

        // Single-format extractors only describe the stream at the top level.
        if streams.is_empty() {
            streams.extend(descriptor_from_format(&document));
        }

        Ok(Self {
            title,
            duration,
            uploader,
            streams,
        })
    }
}

fn descriptor_from_format(format: &Value) -> Option<StreamDescriptor> {
    let width = dimension(&format["width"])?;
    let height = dimension(&format["height"])?;
    Some(StreamDescriptor {
        width,
        height,
        frames_per_second: format["fps"].as_f64().filter(|fps| *fps > 0.0),
        codec: format["vcodec"].as_str().map(str::to_string),
        container: format["ext"].as_str().map(str::to_string),
    })
}

fn dimension(value: &Value) -> Option<u32> {
    value
        .as_u64()
        .or_else(|| value.as_f64().map(|v| v as u64))
        .and_then(|v| u32::try_from(v).ok())
}
