//! Frame extraction with an ordered fallback chain.
//!
//! A [`FrameExtractor`] holds a list of [`ExtractionStrategy`] values and
//! tries them in order. Each strategy answers with an [`Attempt`]: frames,
//! a skip (not applicable to this request), a failure, or a cancellation.
//! The first strategy that produces frames wins; adding or reordering
//! strategies is a change to the list, not to the control flow.
//!
//! The default chain is:
//!
//! 1. [`PixelSeek`] (`pixel` feature): seek-and-read in process, used only
//!    when a crop is requested.
//! 2. [`CliExtractor`]: run `ffmpeg` to write numbered stills to a scratch
//!    directory, then load them with [`StillFrames`].
//! 3. [`PixelDump`] (`pixel` feature): sequential in-process decode, used
//!    when the command-line tool is missing or failed.
//!
//! Frame streams are lazy, finite and not restartable.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tempfile::TempDir;

use crate::config::JobOptions;
use crate::crop::CropPlanner;
use crate::error::GifClipError;
use crate::frame::{CropRect, Frame};
use crate::process::{ToolOutcome, run_tool};
use crate::progress::CancellationToken;

/// Headroom on the extractor's frame ceiling over the expected count.
const FRAME_CEILING_FACTOR: f64 = 1.2;
/// Number of frames sampled for crop planning.
const CROP_SAMPLES: usize = 3;
/// Spacing between crop samples, in seconds.
const CROP_SAMPLE_SPACING: f64 = 2.0;

/// A lazy sequence of extracted frames.
pub type FrameStream = Box<dyn Iterator<Item = Frame>>;

/// What to extract.
#[derive(Debug, Clone)]
pub struct ExtractRequest {
    /// Media file to read.
    pub path: PathBuf,
    /// Start of the window in seconds.
    pub start: f64,
    /// End of the window in seconds.
    pub end: f64,
    /// Frames per second to sample at.
    pub fps: u32,
    /// Crop planner to run on sample frames, or `None` to keep frames whole.
    pub crop: Option<CropPlanner>,
    /// Parent directory for temporary still images.
    pub scratch_dir: PathBuf,
    /// Wall-clock limit for one command-line extractor run.
    pub timeout: Duration,
    /// Upper bound on still images loaded from disk.
    pub max_still_frames: usize,
}

impl ExtractRequest {
    /// Request frames from `path` between `start` and `end` at `fps`, with
    /// default operational settings and no cropping.
    pub fn new<P: AsRef<Path>>(path: P, start: f64, end: f64, fps: u32) -> Self {
        let defaults = JobOptions::new();
        Self {
            path: path.as_ref().to_path_buf(),
            start,
            end,
            fps: fps.max(1),
            crop: None,
            scratch_dir: defaults.scratch_dir(),
            timeout: defaults.extractor_timeout(),
            max_still_frames: defaults.max_still_frames(),
        }
    }

    /// Plan and apply a crop with `planner` when it has a detector enabled.
    #[must_use]
    pub fn with_crop(mut self, planner: CropPlanner) -> Self {
        self.crop = planner.is_enabled().then_some(planner);
        self
    }

    /// Take scratch directory, timeout and still-frame cap from `options`.
    #[must_use]
    pub fn with_options(mut self, options: &JobOptions) -> Self {
        self.scratch_dir = options.scratch_dir();
        self.timeout = options.extractor_timeout();
        self.max_still_frames = options.max_still_frames();
        self
    }

    /// Length of the window in seconds (never negative).
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// `floor(duration * fps)`: the hard cap on produced frames.
    pub fn expected_frames(&self) -> usize {
        (self.duration() * f64::from(self.fps)) as usize
    }

    fn frame_ceiling(&self) -> usize {
        (self.duration() * f64::from(self.fps) * FRAME_CEILING_FACTOR).ceil() as usize
    }
}

/// Outcome of one extraction strategy.
pub enum Attempt {
    /// The strategy produced a frame stream.
    Frames(FrameStream),
    /// The strategy does not apply to this request.
    Skipped(String),
    /// The strategy applied but failed; the next one is tried.
    Failed(String),
    /// Cancellation was observed; the chain stops.
    Cancelled,
}

/// One way of turning a media file into frames.
pub trait ExtractionStrategy: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Try to extract frames for `request`.
    fn extract(&self, request: &ExtractRequest, cancel: &CancellationToken) -> Attempt;
}

/// Ordered list of extraction strategies.
pub struct FrameExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl FrameExtractor {
    /// Use exactly `strategies`, in order.
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// The default chain for `options`.
    pub fn with_defaults(options: &JobOptions) -> Self {
        let mut strategies: Vec<Box<dyn ExtractionStrategy>> = Vec::with_capacity(3);
        #[cfg(feature = "pixel")]
        strategies.push(Box::new(PixelSeek));
        strategies.push(Box::new(CliExtractor::new(options.extractor_binary.clone())));
        #[cfg(feature = "pixel")]
        strategies.push(Box::new(PixelDump));
        Self::new(strategies)
    }

    /// Names of the strategies, in order.
    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Run the chain until a strategy produces frames.
    ///
    /// # Errors
    ///
    /// Returns [`GifClipError::Cancelled`] if cancellation is observed, and
    /// [`GifClipError::ExtractionFailed`] naming every failed strategy if
    /// none produced frames.
    pub fn extract(
        &self,
        request: &ExtractRequest,
        cancel: &CancellationToken,
    ) -> Result<FrameStream, GifClipError> {
        let mut failures = Vec::new();

        for strategy in &self.strategies {
            cancel.checkpoint()?;
            match strategy.extract(request, cancel) {
                Attempt::Frames(frames) => {
                    log::info!("extracting frames with {}", strategy.name());
                    return Ok(frames);
                }
                Attempt::Skipped(reason) => {
                    log::debug!("{} skipped: {reason}", strategy.name());
                }
                Attempt::Failed(reason) => {
                    log::warn!("{} failed: {reason}", strategy.name());
                    failures.push(format!("{}: {reason}", strategy.name()));
                }
                Attempt::Cancelled => return Err(GifClipError::Cancelled),
            }
        }

        let detail = if failures.is_empty() {
            "no extraction strategy is available".to_string()
        } else {
            failures.join("; ")
        };
        Err(GifClipError::ExtractionFailed(format!(
            "{detail}. Install the FFmpeg command-line tools or build with the \
             in-process decoder (`pixel` feature)"
        )))
    }
}

// ── Command-line extractor ─────────────────────────────────────────

/// Runs an `ffmpeg`-compatible binary to write numbered still images.
#[derive(Debug, Clone)]
pub struct CliExtractor {
    binary: String,
}

impl CliExtractor {
    /// Use `binary` (a name on `PATH` or a path).
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn command(&self, request: &ExtractRequest, output_dir: &Path) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .args(["-y", "-v", "error"])
            .arg("-ss")
            .arg(format!("{:.3}", request.start.max(0.0)))
            .arg("-i")
            .arg(&request.path)
            .arg("-t")
            .arg(format!("{:.3}", request.duration()))
            .arg("-vf")
            .arg(format!("fps={}", request.fps))
            .arg("-frames:v")
            .arg(request.frame_ceiling().max(1).to_string())
            .arg(output_dir.join("frame_%04d.png"));
        command
    }
}

impl ExtractionStrategy for CliExtractor {
    fn name(&self) -> &str {
        &self.binary
    }

    fn extract(&self, request: &ExtractRequest, cancel: &CancellationToken) -> Attempt {
        let scratch = match scratch_subdir(&request.scratch_dir, "frames_") {
            Ok(scratch) => scratch,
            Err(error) => {
                return Attempt::Failed(format!("cannot create scratch directory: {error}"));
            }
        };

        let outcome = run_tool(self.command(request, scratch.path()), request.timeout, cancel);
        match outcome {
            ToolOutcome::Success => {}
            ToolOutcome::Cancelled => return Attempt::Cancelled,
            other => return Attempt::Failed(other.describe(&self.binary)),
        }

        match StillFrames::owning(scratch, request) {
            Ok(frames) => Attempt::Frames(Box::new(frames)),
            Err(error) => Attempt::Failed(error.to_string()),
        }
    }
}

fn scratch_subdir(parent: &Path, prefix: &str) -> std::io::Result<TempDir> {
    fs::create_dir_all(parent)?;
    tempfile::Builder::new().prefix(prefix).tempdir_in(parent)
}

// ── Still images on disk ───────────────────────────────────────────

/// Lazily loads `frame_*` still images from a directory in file-name order.
///
/// At most `max_frames` files are considered. Files that cannot be decoded
/// are skipped with a warning. When a crop planner is attached, three sample
/// stills about two seconds apart are decoded up front to plan the crop,
/// which is then applied to every frame.
pub struct StillFrames {
    files: std::vec::IntoIter<(usize, PathBuf)>,
    start: f64,
    fps: u32,
    crop: CropRect,
    _scratch: Option<TempDir>,
}

impl StillFrames {
    /// Read stills from `dir`, timestamping the `i`-th as `start + i / fps`.
    ///
    /// # Errors
    ///
    /// Returns [`GifClipError::IoError`] if `dir` cannot be listed.
    pub fn open<P: AsRef<Path>>(
        dir: P,
        start: f64,
        fps: u32,
        max_frames: usize,
    ) -> Result<Self, GifClipError> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir.as_ref())?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| is_still_file(path))
            .collect();
        files.sort();
        if files.len() > max_frames {
            log::info!("keeping the first {max_frames} of {} stills", files.len());
            files.truncate(max_frames);
        }
        log::debug!("found {} stills in {}", files.len(), dir.as_ref().display());

        Ok(Self {
            files: files.into_iter().enumerate().collect::<Vec<_>>().into_iter(),
            start,
            fps: fps.max(1),
            crop: CropRect::default(),
            _scratch: None,
        })
    }

    /// Plan a crop from sample stills and apply it to every frame.
    #[must_use]
    pub fn with_crop(mut self, planner: &CropPlanner) -> Self {
        if !planner.is_enabled() {
            return self;
        }
        let paths: Vec<(usize, PathBuf)> = self.files.as_slice().to_vec();
        let stride = (CROP_SAMPLE_SPACING * f64::from(self.fps)) as usize;
        let samples: Vec<Frame> = (0..CROP_SAMPLES)
            .filter_map(|n| paths.get(n * stride.max(1)))
            .filter_map(|(index, path)| self.load(*index, path))
            .collect();
        self.crop = planner.plan(&samples);
        self
    }

    /// The crop applied to each frame.
    pub fn crop(&self) -> CropRect {
        self.crop
    }

    /// Number of stills not yet yielded.
    pub fn remaining(&self) -> usize {
        self.files.len()
    }

    fn owning(scratch: TempDir, request: &ExtractRequest) -> Result<Self, GifClipError> {
        let mut frames = Self::open(
            scratch.path(),
            request.start,
            request.fps,
            request.max_still_frames,
        )?;
        if let Some(planner) = &request.crop {
            frames = frames.with_crop(planner);
        }
        frames._scratch = Some(scratch);
        Ok(frames)
    }

    fn load(&self, index: usize, path: &Path) -> Option<Frame> {
        match image::open(path) {
            Ok(image) => {
                let timestamp = self.start.max(0.0) + index as f64 / f64::from(self.fps);
                Some(Frame::new(image.to_rgb8(), Duration::from_secs_f64(timestamp)))
            }
            Err(error) => {
                log::warn!("skipping unreadable still {}: {error}", path.display());
                None
            }
        }
    }
}

impl Iterator for StillFrames {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        loop {
            let (index, path) = self.files.next()?;
            if let Some(frame) = self.load(index, &path) {
                return Some(apply_crop(frame, &self.crop));
            }
        }
    }
}

fn apply_crop(frame: Frame, crop: &CropRect) -> Frame {
    if crop.is_empty() {
        frame
    } else {
        frame.cropped(crop)
    }
}

fn is_still_file(path: &Path) -> bool {
    let named_frame = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with("frame_"));
    let image_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .is_some_and(|ext| matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "bmp"));
    named_frame && image_extension && path.is_file()
}

// ── In-process decoder ─────────────────────────────────────────────

/// Seek-and-read extraction through the in-process decoder.
///
/// Only applies when a crop is requested: three sample frames about two
/// seconds apart feed the crop planner, then the reader re-seeks to the
/// start and steps by `1 / fps` until the end of the window, the end of the
/// stream, or `floor(duration * fps)` frames.
#[cfg(feature = "pixel")]
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelSeek;

#[cfg(feature = "pixel")]
impl ExtractionStrategy for PixelSeek {
    fn name(&self) -> &str {
        "decoder"
    }

    fn extract(&self, request: &ExtractRequest, cancel: &CancellationToken) -> Attempt {
        let Some(planner) = request.crop else {
            return Attempt::Skipped("no crop requested".to_string());
        };
        let mut reader = match crate::pixel::PixelReader::open(&request.path) {
            Ok(reader) => reader,
            Err(error) => return Attempt::Failed(error.to_string()),
        };

        let mut samples = Vec::with_capacity(CROP_SAMPLES);
        for n in 0..CROP_SAMPLES {
            if cancel.is_cancelled() {
                return Attempt::Cancelled;
            }
            let at = request.start.max(0.0) + n as f64 * CROP_SAMPLE_SPACING;
            match reader.frame_at(at) {
                Ok(Some(frame)) => samples.push(frame),
                Ok(None) => break,
                Err(error) => log::warn!("crop sample at {at:.2}s failed: {error}"),
            }
        }
        let crop = planner.plan(&samples);

        if let Err(error) = reader.seek(request.start.max(0.0)) {
            return Attempt::Failed(error.to_string());
        }

        Attempt::Frames(Box::new(SeekFrames {
            reader,
            start: request.start.max(0.0),
            end: request.end,
            step: 1.0 / f64::from(request.fps),
            produced: 0,
            limit: request.expected_frames(),
            crop,
        }))
    }
}

#[cfg(feature = "pixel")]
struct SeekFrames {
    reader: crate::pixel::PixelReader,
    start: f64,
    end: f64,
    step: f64,
    produced: usize,
    limit: usize,
    crop: CropRect,
}

#[cfg(feature = "pixel")]
impl Iterator for SeekFrames {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        if self.produced >= self.limit {
            return None;
        }
        let at = self.start + self.produced as f64 * self.step;
        if at >= self.end {
            return None;
        }
        match self.reader.frame_at(at) {
            Ok(Some(frame)) => {
                self.produced += 1;
                Some(apply_crop(frame, &self.crop))
            }
            Ok(None) => None,
            Err(error) => {
                log::warn!("decoding stopped at {at:.2}s: {error}");
                None
            }
        }
    }
}

/// Sequential in-process decode of the whole window, used as the fallback
/// when the command-line extractor is unavailable.
///
/// Frames are held in memory, capped at the still-frame limit, and cropped
/// the same way as stills loaded from disk.
#[cfg(feature = "pixel")]
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelDump;

#[cfg(feature = "pixel")]
impl ExtractionStrategy for PixelDump {
    fn name(&self) -> &str {
        "decoder dump"
    }

    fn extract(&self, request: &ExtractRequest, cancel: &CancellationToken) -> Attempt {
        let mut reader = match crate::pixel::PixelReader::open(&request.path) {
            Ok(reader) => reader,
            Err(error) => return Attempt::Failed(error.to_string()),
        };

        let start = request.start.max(0.0);
        let step = 1.0 / f64::from(request.fps);
        let limit = request.expected_frames().min(request.max_still_frames);
        let mut frames = Vec::with_capacity(limit);
        while frames.len() < limit {
            if cancel.is_cancelled() {
                return Attempt::Cancelled;
            }
            let at = start + frames.len() as f64 * step;
            if at >= request.end {
                break;
            }
            match reader.frame_at(at) {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => break,
                Err(error) if frames.is_empty() => return Attempt::Failed(error.to_string()),
                Err(error) => {
                    log::warn!("decoding stopped at {at:.2}s: {error}");
                    break;
                }
            }
        }

        let crop = match &request.crop {
            Some(planner) => {
                let stride = ((CROP_SAMPLE_SPACING * f64::from(request.fps)) as usize).max(1);
                let samples: Vec<Frame> = (0..CROP_SAMPLES)
                    .filter_map(|n| frames.get(n * stride).cloned())
                    .collect();
                planner.plan(&samples)
            }
            None => CropRect::default(),
        };

        Attempt::Frames(Box::new(
            frames.into_iter().map(move |frame| apply_crop(frame, &crop)),
        ))
    }
}
