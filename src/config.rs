//! Conversion parameters and job options.
//!
//! [`ConversionParams`] describes *what* to convert: the source, the time
//! window, and the output geometry. It is built with chained `with_*` calls
//! and handed to a job by value, so it cannot change once the job starts.
//!
//! [`JobOptions`] carries the operational settings that stay the same from
//! one conversion to the next: the scratch directory, external tool names,
//! the extractor timeout and the frame caps.
//!
//! # Example
//!
//! ```
//! use gifclip::{ConversionParams, Quality};
//!
//! let params = ConversionParams::remote("https://example.com/watch?v=abc")
//!     .with_time_range(12.0, 18.5)
//!     .with_resolution(400, 224)
//!     .with_fps(12)
//!     .with_quality(Quality::High)
//!     .with_output_dir("gifs");
//!
//! assert_eq!(params.palette_size, 256);
//! assert!((params.duration() - 6.5).abs() < f64::EPSILON);
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Palette sizes a conversion may request.
pub const PALETTE_SIZES: [u32; 5] = [64, 96, 128, 192, 256];

/// Lowest accepted output frame rate.
pub const MIN_FPS: u32 = 1;
/// Highest accepted output frame rate.
pub const MAX_FPS: u32 = 60;

/// Where the video comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// A file on the local file system. Never deleted by the crate.
    Local(PathBuf),
    /// A page or media URL handed to the downloader.
    Remote(String),
}

impl MediaSource {
    /// `true` for [`MediaSource::Local`].
    pub fn is_local(&self) -> bool {
        matches!(self, MediaSource::Local(_))
    }

    /// The path or URL as a display string.
    pub fn location(&self) -> String {
        match self {
            MediaSource::Local(path) => path.display().to_string(),
            MediaSource::Remote(url) => url.clone(),
        }
    }
}

impl Display for MediaSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.location())
    }
}

/// Named quality presets, each mapping to a palette size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Quality {
    /// 256 colors.
    High,
    /// 128 colors.
    #[default]
    Medium,
    /// 64 colors.
    Low,
}

impl Quality {
    /// Palette size used when converting at this quality.
    pub fn palette_size(self) -> u32 {
        match self {
            Quality::High => 256,
            Quality::Medium => 128,
            Quality::Low => 64,
        }
    }

    /// Infer a preset from a palette size: 200 or more is high, 128 or more
    /// is medium, anything smaller is low.
    ///
    /// A 192-color recommendation therefore maps to [`Quality::Medium`].
    pub fn from_palette_size(colors: u32) -> Self {
        if colors >= 200 {
            Quality::High
        } else if colors >= 128 {
            Quality::Medium
        } else {
            Quality::Low
        }
    }
}

impl Display for Quality {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let text = match self {
            Quality::High => "high",
            Quality::Medium => "medium",
            Quality::Low => "low",
        };
        f.write_str(text)
    }
}

/// Everything a single conversion needs to know.
///
/// Times are in seconds from the start of the video. Defaults: the first ten
/// seconds, 480×270 at 10 fps, 128 colors, written to `./output`, with both
/// border and watermark removal enabled.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionParams {
    /// Path or URL of the video.
    pub source: MediaSource,
    /// Start of the window, in seconds.
    pub start_time: f64,
    /// End of the window, in seconds. Must be greater than `start_time`.
    pub end_time: f64,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frame rate (1–60).
    pub fps: u32,
    /// Number of palette colors (one of [`PALETTE_SIZES`]).
    pub palette_size: u32,
    /// Directory the GIF is written to. Created if missing.
    pub output_dir: PathBuf,
    /// Trim letterbox borders.
    pub remove_borders: bool,
    /// Trim a bright corner watermark.
    pub remove_watermark: bool,
    /// Title used to name the output file. Falls back to the local file stem
    /// or `video`.
    pub title: Option<String>,
}

impl ConversionParams {
    fn with_source(source: MediaSource) -> Self {
        Self {
            source,
            start_time: 0.0,
            end_time: 10.0,
            width: 480,
            height: 270,
            fps: 10,
            palette_size: Quality::Medium.palette_size(),
            output_dir: PathBuf::from("output"),
            remove_borders: true,
            remove_watermark: true,
            title: None,
        }
    }

    /// Convert a file on the local file system.
    pub fn local<P: AsRef<Path>>(path: P) -> Self {
        Self::with_source(MediaSource::Local(path.as_ref().to_path_buf()))
    }

    /// Convert a remote video fetched through the downloader.
    pub fn remote(url: impl Into<String>) -> Self {
        Self::with_source(MediaSource::Remote(url.into()))
    }

    /// Set the time window in seconds.
    #[must_use]
    pub fn with_time_range(mut self, start_time: f64, end_time: f64) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self
    }

    /// Set the output resolution.
    #[must_use]
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the output frame rate.
    #[must_use]
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    /// Set the palette size directly.
    #[must_use]
    pub fn with_palette_size(mut self, colors: u32) -> Self {
        self.palette_size = colors;
        self
    }

    /// Set the palette size from a quality preset.
    #[must_use]
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.palette_size = quality.palette_size();
        self
    }

    /// Set the output directory.
    #[must_use]
    pub fn with_output_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.output_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Enable or disable letterbox removal.
    #[must_use]
    pub fn with_border_removal(mut self, enabled: bool) -> Self {
        self.remove_borders = enabled;
        self
    }

    /// Enable or disable watermark removal.
    #[must_use]
    pub fn with_watermark_removal(mut self, enabled: bool) -> Self {
        self.remove_watermark = enabled;
        self
    }

    /// Set the title used to name the output file.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Length of the time window in seconds.
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Number of frames the window yields at the requested rate.
    pub fn expected_frames(&self) -> u64 {
        let frames = self.duration() * f64::from(self.fps);
        if frames.is_finite() && frames > 0.0 {
            frames as u64
        } else {
            0
        }
    }

    /// `true` if either crop detector is enabled.
    pub fn smart_crop(&self) -> bool {
        self.remove_borders || self.remove_watermark
    }
}

/// Operational settings for conversions.
///
/// All fields have defaults; a default-constructed value uses `ffmpeg`,
/// `ffprobe`, and `yt-dlp` from `PATH`, a `gifclip` directory under the
/// system temp directory for scratch files, a 60 s extractor timeout, a
/// 200-frame cap on still images, and a progress report every 10 frames.
#[derive(Debug, Clone)]
pub struct JobOptions {
    pub(crate) scratch_dir: Option<PathBuf>,
    pub(crate) extractor_binary: String,
    pub(crate) probe_binary: String,
    pub(crate) downloader_binary: String,
    pub(crate) extractor_timeout: Duration,
    pub(crate) max_still_frames: usize,
    pub(crate) batch_size: u64,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl JobOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            scratch_dir: None,
            extractor_binary: "ffmpeg".to_string(),
            probe_binary: "ffprobe".to_string(),
            downloader_binary: "yt-dlp".to_string(),
            extractor_timeout: Duration::from_secs(60),
            max_still_frames: 200,
            batch_size: 10,
        }
    }

    /// Put scratch files (downloads, extracted stills) under `dir`.
    #[must_use]
    pub fn with_scratch_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.scratch_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Name or path of the command-line frame extractor.
    #[must_use]
    pub fn with_extractor_binary(mut self, binary: impl Into<String>) -> Self {
        self.extractor_binary = binary.into();
        self
    }

    /// Name or path of the command-line prober used for local files.
    #[must_use]
    pub fn with_probe_binary(mut self, binary: impl Into<String>) -> Self {
        self.probe_binary = binary.into();
        self
    }

    /// Name or path of the downloader used for remote sources.
    #[must_use]
    pub fn with_downloader_binary(mut self, binary: impl Into<String>) -> Self {
        self.downloader_binary = binary.into();
        self
    }

    /// Wall-clock limit for one extractor invocation.
    #[must_use]
    pub fn with_extractor_timeout(mut self, timeout: Duration) -> Self {
        self.extractor_timeout = timeout;
        self
    }

    /// Upper bound on still images loaded from disk. Clamped to at least 1.
    #[must_use]
    pub fn with_max_still_frames(mut self, limit: usize) -> Self {
        self.max_still_frames = limit.max(1);
        self
    }

    /// Report extraction progress every `size` frames. Clamped to at least 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Directory that holds scratch files.
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("gifclip"))
    }

    /// The extractor timeout.
    pub fn extractor_timeout(&self) -> Duration {
        self.extractor_timeout
    }

    /// The still-frame cap.
    pub fn max_still_frames(&self) -> usize {
        self.max_still_frames
    }
}
