//! Session state for an interactive front end.
//!
//! A [`Session`] owns what a front end would otherwise keep in globals: the
//! downloader, the job options, the most recent [`VideoInfo`] and the
//! running conversion. Metadata fetches and conversions each run on their
//! own background thread, so the caller is never blocked; results come back
//! through [`InfoTask`] and [`JobOutcome`] values.
//!
//! # Example
//!
//! ```no_run
//! use gifclip::{ConversionParams, MediaSource, Session};
//!
//! let mut session = Session::new();
//! let source = MediaSource::Remote("https://example.com/watch?v=abc".into());
//! let info = session.fetch_info(&source).wait()?;
//!
//! let params = ConversionParams::remote("https://example.com/watch?v=abc")
//!     .with_time_range(0.0, info.suggested_end_time());
//! session.start_conversion(params)?;
//! let outcome = session.wait();
//! # let _ = outcome;
//! # Ok::<(), gifclip::GifClipError>(())
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::advisor::{Recommendation, recommend};
use crate::config::{ConversionParams, JobOptions, MediaSource};
use crate::error::GifClipError;
use crate::extract::FrameExtractor;
use crate::job::{ConversionJob, JobHandle, JobOutcome, JobState};
use crate::metadata::VideoInfo;
use crate::probe::probe_local;
use crate::progress::{NoOpProgress, ProgressSink};
use crate::source::{Downloader, YtDlp};
use crate::utilities::looks_like_url;
use crate::validation::validate_params;

/// Builds the extraction chain for each new job.
pub type ExtractorFactory = Arc<dyn Fn(&JobOptions) -> FrameExtractor + Send + Sync>;

/// A metadata fetch running in the background.
pub struct InfoTask {
    receiver: Receiver<Result<VideoInfo, GifClipError>>,
}

impl InfoTask {
    /// Block until the fetch finishes.
    pub fn wait(self) -> Result<VideoInfo, GifClipError> {
        self.receiver.recv().unwrap_or_else(|_| {
            Err(GifClipError::SourceUnavailable {
                location: String::new(),
                reason: "metadata worker stopped unexpectedly".to_string(),
            })
        })
    }

    /// The result, if the fetch has finished. Returns `None` while it is
    /// still running; after the result has been taken once, later calls
    /// return `None` as well.
    pub fn try_result(&self) -> Option<Result<VideoInfo, GifClipError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

/// Explicit session object for a front end.
pub struct Session {
    downloader: Arc<dyn Downloader>,
    options: JobOptions,
    progress: Arc<dyn ProgressSink>,
    extractor_factory: Option<ExtractorFactory>,
    video_info: Arc<Mutex<Option<VideoInfo>>>,
    latest_fetch: Arc<AtomicU64>,
    job: Option<JobHandle>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A session with default options and `yt-dlp` for remote sources.
    pub fn new() -> Self {
        Self::with_options(JobOptions::new())
    }

    /// A session with `options`.
    pub fn with_options(options: JobOptions) -> Self {
        let downloader = Arc::new(YtDlp::new(options.downloader_binary.clone()));
        Self {
            downloader,
            options,
            progress: Arc::new(NoOpProgress),
            extractor_factory: None,
            video_info: Arc::new(Mutex::new(None)),
            latest_fetch: Arc::new(AtomicU64::new(0)),
            job: None,
        }
    }

    /// Use `downloader` for remote metadata and downloads.
    #[must_use]
    pub fn with_downloader(mut self, downloader: Arc<dyn Downloader>) -> Self {
        self.downloader = downloader;
        self
    }

    /// Report conversion progress to `sink`.
    #[must_use]
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    /// Build each job's extraction chain with `factory` instead of the
    /// default chain.
    #[must_use]
    pub fn with_extractor_factory(mut self, factory: ExtractorFactory) -> Self {
        self.extractor_factory = Some(factory);
        self
    }

    /// Fetch metadata for `source` on a background thread.
    ///
    /// On success the session's [`VideoInfo`] is replaced wholesale, unless
    /// a later fetch has been started in the meantime. The task still hands
    /// back its own result either way.
    pub fn fetch_info(&self, source: &MediaSource) -> InfoTask {
        let (sender, receiver) = mpsc::channel();
        let generation = self.latest_fetch.fetch_add(1, Ordering::SeqCst) + 1;
        let latest = Arc::clone(&self.latest_fetch);
        let source = source.clone();
        let downloader = Arc::clone(&self.downloader);
        let options = self.options.clone();
        let slot = Arc::clone(&self.video_info);

        let worker = thread::Builder::new()
            .name("gifclip-info".to_string())
            .spawn(move || {
                let result = match &source {
                    MediaSource::Local(path) => probe_local(path, &options),
                    MediaSource::Remote(url) if looks_like_url(url) => downloader.probe(url),
                    MediaSource::Remote(url) => {
                        Err(GifClipError::InvalidInput(format!("not a video URL: {url}")))
                    }
                };
                if let Ok(info) = &result {
                    log::info!("fetched info for {source}: {:?}", info.title);
                    if let Ok(mut slot) = slot.lock() {
                        if latest.load(Ordering::SeqCst) == generation {
                            *slot = Some(info.clone());
                        } else {
                            log::debug!("discarding info for {source}: a newer fetch started");
                        }
                    }
                }
                let _ = sender.send(result);
            });

        if let Err(error) = worker {
            log::warn!("could not start metadata worker: {error}");
        }
        InfoTask { receiver }
    }

    /// Snapshot of the most recently fetched metadata.
    pub fn video_info(&self) -> Option<VideoInfo> {
        self.video_info.lock().ok().and_then(|info| info.clone())
    }

    /// Recommendations for the current metadata's best stream, or an empty
    /// list if no metadata has been fetched.
    pub fn recommendations(&self, duration: f64, fps: u32) -> Vec<Recommendation> {
        self.video_info()
            .as_ref()
            .and_then(|info| info.best_stream().map(|s| (s.width, s.height)))
            .map(|(width, height)| recommend(width, height, duration, fps))
            .unwrap_or_default()
    }

    /// Validate `params` and start a conversion on a worker thread.
    ///
    /// A missing title is filled in from the current metadata.
    ///
    /// # Errors
    ///
    /// Returns [`GifClipError::InvalidInput`] if a conversion is already
    /// running or the parameters are invalid; no job is started in either
    /// case.
    pub fn start_conversion(&mut self, mut params: ConversionParams) -> Result<(), GifClipError> {
        if self.job_state() == JobState::Running {
            return Err(GifClipError::InvalidInput(
                "a conversion is already running".to_string(),
            ));
        }
        validate_params(&params).into_result()?;

        if params.title.is_none() && !params.source.is_local() {
            params.title = self.video_info().map(|info| info.title);
        }

        let mut job = ConversionJob::new(params, self.options.clone())
            .with_downloader(Arc::clone(&self.downloader))
            .with_progress(Arc::clone(&self.progress));
        if let Some(factory) = &self.extractor_factory {
            job = job.with_extractor(factory(&self.options));
        }

        self.job = Some(job.spawn()?);
        Ok(())
    }

    /// Request cancellation of the running conversion, if any.
    pub fn cancel(&self) {
        if let Some(job) = &self.job {
            job.cancel();
        }
    }

    /// State of the most recent conversion; [`JobState::Idle`] if none was
    /// started.
    pub fn job_state(&self) -> JobState {
        match &self.job {
            Some(job) => job.state(),
            None => JobState::Idle,
        }
    }

    /// Wait for the most recent conversion and return its outcome. `None`
    /// if no conversion was started or its outcome was already taken.
    pub fn wait(&mut self) -> Option<JobOutcome> {
        self.job.take().map(JobHandle::join)
    }
}
