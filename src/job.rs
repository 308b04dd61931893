//! Conversion job orchestration.
//!
//! A [`ConversionJob`] takes one [`ConversionParams`] through validation,
//! source resolution, frame extraction and GIF assembly. Run it in place with
//! [`run`](ConversionJob::run) or on a dedicated worker thread with
//! [`spawn`](ConversionJob::spawn).
//!
//! Cancellation is cooperative. The token is checked between stages, between
//! download attempts and at the start of every frame iteration; a cancelled
//! job skips assembly, so no partial GIF is ever written. Downloaded scratch
//! files are removed in every terminal state; local source files are never
//! touched.
//!
//! # Example
//!
//! ```no_run
//! use gifclip::{ConversionJob, ConversionParams, JobOptions, JobOutcome};
//!
//! let params = ConversionParams::local("input.mp4")
//!     .with_time_range(2.0, 6.0)
//!     .with_resolution(400, 224);
//! let handle = ConversionJob::new(params, JobOptions::new()).spawn()?;
//!
//! match handle.join() {
//!     JobOutcome::Completed { output, frames, .. } => {
//!         println!("{frames} frames written to {}", output.display());
//!     }
//!     JobOutcome::Cancelled => println!("cancelled"),
//!     JobOutcome::Failed { stage, error } => eprintln!("{stage} failed: {error}"),
//! }
//! # Ok::<(), gifclip::GifClipError>(())
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::config::{ConversionParams, JobOptions, MediaSource};
use crate::crop::CropPlanner;
use crate::error::GifClipError;
use crate::extract::{ExtractRequest, FrameExtractor};
use crate::frame::Frame;
use crate::gif::GifAssembler;
use crate::progress::{CancellationToken, NoOpProgress, ProgressSink, ProgressTracker, Stage};
use crate::source::{Downloader, FrameSource, ResolvedSource, YtDlp};
use crate::utilities::{file_stem, output_path};
use crate::validation::validate_params;

/// Lifecycle of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    /// Not started.
    Idle,
    /// Working.
    Running,
    /// Finished and wrote a GIF.
    Completed,
    /// Stopped on an error.
    Failed,
    /// Stopped on request.
    Cancelled,
}

impl JobState {
    /// `true` for completed, failed and cancelled.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed | JobState::Cancelled)
    }
}

impl Display for JobState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let text = match self {
            JobState::Idle => "idle",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        };
        f.write_str(text)
    }
}

/// How a conversion ended.
#[derive(Debug)]
pub enum JobOutcome {
    /// A GIF was written.
    Completed {
        /// Path of the GIF.
        output: PathBuf,
        /// Number of frames encoded.
        frames: u64,
        /// Size of the GIF in bytes.
        bytes: u64,
    },
    /// Cancellation was requested and observed. Nothing was written.
    Cancelled,
    /// The job stopped on an error.
    Failed {
        /// Stage the error happened in.
        stage: Stage,
        /// The error.
        error: GifClipError,
    },
}

impl JobOutcome {
    /// The terminal [`JobState`] this outcome corresponds to.
    pub fn state(&self) -> JobState {
        match self {
            JobOutcome::Completed { .. } => JobState::Completed,
            JobOutcome::Cancelled => JobState::Cancelled,
            JobOutcome::Failed { .. } => JobState::Failed,
        }
    }

    /// Path of the written GIF, if the job completed.
    pub fn output(&self) -> Option<&Path> {
        match self {
            JobOutcome::Completed { output, .. } => Some(output),
            _ => None,
        }
    }

    /// The error, if the job failed.
    pub fn error(&self) -> Option<&GifClipError> {
        match self {
            JobOutcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Convert to a `Result`; cancellation becomes
    /// [`GifClipError::Cancelled`].
    pub fn into_result(self) -> Result<PathBuf, GifClipError> {
        match self {
            JobOutcome::Completed { output, .. } => Ok(output),
            JobOutcome::Cancelled => Err(GifClipError::Cancelled),
            JobOutcome::Failed { error, .. } => Err(error),
        }
    }
}

/// One video-to-GIF conversion.
pub struct ConversionJob {
    params: ConversionParams,
    options: JobOptions,
    downloader: Arc<dyn Downloader>,
    extractor: Option<FrameExtractor>,
    progress: Arc<dyn ProgressSink>,
    cancel: CancellationToken,
}

impl ConversionJob {
    /// Create a job for `params`. Remote sources use `yt-dlp` as named in
    /// `options`; frames come from the default extraction chain.
    pub fn new(params: ConversionParams, options: JobOptions) -> Self {
        let downloader = Arc::new(YtDlp::new(options.downloader_binary.clone()));
        Self {
            params,
            options,
            downloader,
            extractor: None,
            progress: Arc::new(NoOpProgress),
            cancel: CancellationToken::new(),
        }
    }

    /// Use `downloader` for remote sources.
    #[must_use]
    pub fn with_downloader(mut self, downloader: Arc<dyn Downloader>) -> Self {
        self.downloader = downloader;
        self
    }

    /// Use `extractor` instead of the default extraction chain.
    #[must_use]
    pub fn with_extractor(mut self, extractor: FrameExtractor) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Report progress to `sink`.
    #[must_use]
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    /// Observe `token` for cancellation.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The token this job observes.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The parameters this job converts.
    pub fn params(&self) -> &ConversionParams {
        &self.params
    }

    /// Run the job on the current thread.
    pub fn run(self) -> JobOutcome {
        let mut tracker = ProgressTracker::new(self.progress.clone(), self.options.batch_size);
        let mut stage = Stage::Validating;

        let outcome = match self.execute(&mut tracker, &mut stage) {
            Ok((output, frames, bytes)) => {
                tracker.stage(Stage::Finished, format!("Saved {}", output.display()));
                JobOutcome::Completed {
                    output,
                    frames,
                    bytes,
                }
            }
            Err(error) if error.is_cancelled() => {
                tracker.stage(Stage::Finished, "Cancelled");
                JobOutcome::Cancelled
            }
            Err(error) => {
                tracker.stage(Stage::Finished, format!("{stage} failed: {error}"));
                JobOutcome::Failed { stage, error }
            }
        };

        match &outcome {
            JobOutcome::Completed { output, frames, .. } => {
                log::info!("conversion finished: {frames} frames in {}", output.display());
            }
            JobOutcome::Cancelled => log::info!("conversion cancelled"),
            JobOutcome::Failed { stage, error } => {
                log::warn!("conversion failed at {stage}: {error}");
            }
        }
        outcome
    }

    /// Run the job on a dedicated worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`GifClipError::IoError`] if the thread cannot be spawned.
    pub fn spawn(self) -> Result<JobHandle, GifClipError> {
        let state = Arc::new(Mutex::new(JobState::Running));
        let cancel = self.cancel.clone();
        let worker_state = Arc::clone(&state);

        let thread = thread::Builder::new()
            .name("gifclip-job".to_string())
            .spawn(move || {
                let outcome = self.run();
                if let Ok(mut state) = worker_state.lock() {
                    *state = outcome.state();
                }
                outcome
            })?;

        Ok(JobHandle {
            cancel,
            state,
            thread,
        })
    }

    fn execute(
        &self,
        tracker: &mut ProgressTracker,
        stage: &mut Stage,
    ) -> Result<(PathBuf, u64, u64), GifClipError> {
        let params = &self.params;

        tracker.stage(Stage::Validating, "Checking parameters");
        let report = validate_params(params).into_result()?;
        for warning in &report.warnings {
            log::warn!("{warning}");
        }
        self.cancel.checkpoint()?;

        *stage = if params.source.is_local() {
            Stage::Resolving
        } else {
            Stage::Downloading
        };
        tracker.stage(*stage, format!("Opening {}", params.source));
        let source = FrameSource::new(self.downloader.clone(), self.options.scratch_dir());
        let resolved = source.resolve(&params.source, &self.cancel)?;

        let result = self.convert(&resolved, tracker, stage);
        resolved.cleanup();
        result
    }

    fn convert(
        &self,
        resolved: &ResolvedSource,
        tracker: &mut ProgressTracker,
        stage: &mut Stage,
    ) -> Result<(PathBuf, u64, u64), GifClipError> {
        let params = &self.params;
        self.cancel.checkpoint()?;

        let planner = CropPlanner::new(params.remove_borders, params.remove_watermark);
        let request =
            ExtractRequest::new(&resolved.path, params.start_time, params.end_time, params.fps)
                .with_crop(planner)
                .with_options(&self.options);

        if planner.is_enabled() {
            *stage = Stage::Analyzing;
            tracker.stage(Stage::Analyzing, "Analyzing frames for borders and watermark");
        }

        let frames = {
            let default_extractor;
            let extractor = match &self.extractor {
                Some(extractor) => extractor,
                None => {
                    default_extractor = FrameExtractor::with_defaults(&self.options);
                    &default_extractor
                }
            };
            *stage = Stage::Extracting;
            tracker.stage(Stage::Extracting, "Extracting frames");
            let stream = extractor.extract(&request, &self.cancel)?;
            self.collect_frames(stream, tracker)?
        };

        *stage = Stage::Encoding;
        if frames.is_empty() {
            return Err(GifClipError::EncodingFailed(format!(
                "no frames were extracted between {:.2}s and {:.2}s; check that the start \
                 time is within the video",
                params.start_time, params.end_time
            )));
        }
        self.cancel.checkpoint()?;

        let frame_count = frames.len() as u64;
        tracker.stage(
            Stage::Encoding,
            format!(
                "Encoding {frame_count} frames at {}x{}, {} colors",
                params.width, params.height, params.palette_size
            ),
        );
        let output = output_path(&params.output_dir, &self.title());
        let assembler =
            GifAssembler::new(params.width, params.height, params.palette_size, params.fps);
        let bytes = assembler.assemble(frames, &output)?;

        Ok((output, frame_count, bytes))
    }

    /// Drain `stream`, checking for cancellation before every frame.
    fn collect_frames(
        &self,
        mut stream: Box<dyn Iterator<Item = Frame>>,
        tracker: &mut ProgressTracker,
    ) -> Result<Vec<Frame>, GifClipError> {
        tracker.reset_frames();
        let mut frames = Vec::new();
        loop {
            self.cancel.checkpoint()?;
            let Some(frame) = stream.next() else {
                break;
            };
            frames.push(frame);
            tracker.advance(Stage::Extracting);
        }
        tracker.finish_frames(Stage::Extracting);
        Ok(frames)
    }

    fn title(&self) -> String {
        match (&self.params.title, &self.params.source) {
            (Some(title), _) => title.clone(),
            (None, MediaSource::Local(path)) => file_stem(path),
            (None, MediaSource::Remote(_)) => "video".to_string(),
        }
    }
}

/// Handle to a job running on a worker thread.
pub struct JobHandle {
    cancel: CancellationToken,
    state: Arc<Mutex<JobState>>,
    thread: JoinHandle<JobOutcome>,
}

impl JobHandle {
    /// Request cancellation. Takes effect at the job's next checkpoint.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Current state of the job.
    pub fn state(&self) -> JobState {
        self.state
            .lock()
            .map(|state| *state)
            .unwrap_or(JobState::Failed)
    }

    /// `true` once the worker thread has returned.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// The token the job observes.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the job to end.
    pub fn join(self) -> JobOutcome {
        match self.thread.join() {
            Ok(outcome) => outcome,
            Err(_) => {
                if let Ok(mut state) = self.state.lock() {
                    *state = JobState::Failed;
                }
                JobOutcome::Failed {
                    stage: Stage::Finished,
                    error: GifClipError::EncodingFailed("conversion worker panicked".to_string()),
                }
            }
        }
    }
}
