//! # gifclip
//!
//! Turn a time range of a video into an optimized animated GIF.
//!
//! `gifclip` resolves a local file or a remote video link, extracts frames
//! over a time range at a chosen frame rate, optionally trims letterbox bars
//! and corner watermarks, and encodes the result as a looping GIF with a
//! bounded palette. Frame decoding uses FFmpeg, either in-process through
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) or through the
//! command-line tools, and falls back from one to the other.
//!
//! ## Quick Start
//!
//! ### Convert a Local Clip
//!
//! ```no_run
//! use gifclip::{ConversionJob, ConversionParams, JobOptions};
//!
//! let params = ConversionParams::local("input.mp4")
//!     .with_time_range(12.0, 18.0)
//!     .with_resolution(480, 270)
//!     .with_fps(12);
//! let output = ConversionJob::new(params, JobOptions::new()).run().into_result()?;
//! println!("wrote {}", output.display());
//! # Ok::<(), gifclip::GifClipError>(())
//! ```
//!
//! ### Pick an Output Size
//!
//! ```
//! use gifclip::recommend;
//!
//! for rec in recommend(1920, 1080, 6.0, 10) {
//!     println!("{} {}x{} ~{:.1} MB", rec.tier, rec.width, rec.height, rec.estimated_mb());
//! }
//! ```
//!
//! ### Detect Borders and Watermarks
//!
//! ```
//! use std::time::Duration;
//!
//! use gifclip::{CropPlanner, Frame};
//! use image::{Rgb, RgbImage};
//!
//! // A flat grey frame has neither bars nor a bright corner.
//! let frame = Frame::new(RgbImage::from_pixel(640, 360, Rgb([128, 128, 128])), Duration::ZERO);
//! let crop = CropPlanner::new(true, true).plan(&[frame]);
//! assert!(crop.is_empty());
//! ```
//!
//! ## Pipeline
//!
//! - **Source resolution**: local paths are used in place; links are
//!   downloaded with `yt-dlp`, trying progressively looser format selectors
//! - **Frame extraction**: in-process seek and read, then the `ffmpeg`
//!   command line, then an in-process per-frame dump
//! - **Smart crop**: black-border and bright-corner watermark detection over
//!   a few sampled frames, merged into one crop for the whole clip
//! - **Encoding**: per-frame quantization to 64–256 colors, infinite loop
//! - **Progress and cancellation**: a [`ProgressSink`] receives stage and frame
//!   events; a [`CancellationToken`] stops work at the next checkpoint
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `pixel` | In-process decoding through FFmpeg's libraries (default) |
//! | `rayon` | Quantizes frames on rayon threads |
//! | `full` | Enables all of the above |
//!
//! ## Requirements
//!
//! The `pixel` feature needs FFmpeg development libraries. Without it, the
//! `ffmpeg` and `ffprobe` binaries must be on `PATH`. Remote sources need
//! `yt-dlp`.

pub mod advisor;
pub mod border;
pub mod config;
pub mod crop;
pub mod error;
pub mod estimate;
pub mod extract;
#[cfg(feature = "pixel")]
pub mod ffmpeg;
pub mod frame;
pub mod gif;
pub mod job;
pub mod metadata;
#[cfg(feature = "pixel")]
mod pixel;
pub mod probe;
mod process;
pub mod progress;
pub mod session;
pub mod source;
mod utilities;
pub mod validation;
pub mod watermark;

pub use advisor::{
    CompressionSummary, DEFAULT_DEBOUNCE, MAX_RECOMMENDED_EDGE, MIN_RECOMMENDED_HEIGHT,
    MIN_RECOMMENDED_WIDTH, Recommendation, RecommendationDebouncer, RecommendationRequest,
    ScaleKind, Tier, recommend,
};
pub use border::{DEFAULT_BORDER_THRESHOLD, detect_black_borders};
pub use config::{
    ConversionParams, JobOptions, MAX_FPS, MIN_FPS, MediaSource, PALETTE_SIZES, Quality,
};
pub use crop::{CropPlanner, MIN_REMAINING_SPAN, limit_to_min_span};
pub use error::GifClipError;
pub use estimate::{bytes_to_megabytes, estimate_size, estimate_size_mb};
#[cfg(feature = "pixel")]
pub use extract::{PixelDump, PixelSeek};
pub use extract::{
    Attempt, CliExtractor, ExtractRequest, ExtractionStrategy, FrameExtractor, FrameStream,
    StillFrames,
};
#[cfg(feature = "pixel")]
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use frame::{CropRect, Frame};
pub use self::gif::{GifAssembler, verify_output};
pub use job::{ConversionJob, JobHandle, JobOutcome, JobState};
pub use metadata::{StreamDescriptor, VideoInfo};
pub use probe::{ProbeAttempt, Prober, parse_probe_json, probe_local};
pub use progress::{
    CancellationToken, ChannelSink, ProgressEvent, ProgressLog, ProgressSink, Stage,
};
pub use session::{ExtractorFactory, InfoTask, Session};
pub use source::{
    Downloader, FORMAT_SELECTORS, FetchError, FrameSource, MIN_DOWNLOAD_BYTES, ResolvedSource,
    YtDlp,
};
pub use utilities::{looks_like_url, sanitize_title};
pub use validation::{ValidationReport, validate_params};
pub use watermark::{DEFAULT_MARGIN_RATIO, bright_mask, detect_watermark};
