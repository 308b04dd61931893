//! Progress reporting and cancellation support.
//!
//! This module provides [`ProgressSink`] for observing a conversion,
//! [`CancellationToken`] for cooperative cancellation, and [`ProgressEvent`]
//! for the individual entries of the progress stream.
//!
//! The core never talks to a UI directly: it appends events to a sink and any
//! front end (GUI, CLI, test harness) consumes them. [`ProgressLog`] keeps the
//! stream in memory and [`ChannelSink`] hands it to another thread.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use gifclip::{ConversionJob, ConversionParams, JobOptions, ProgressLog};
//!
//! let log = Arc::new(ProgressLog::new());
//! let params = ConversionParams::local("input.mp4").with_time_range(0.0, 3.0);
//! let outcome = ConversionJob::new(params, JobOptions::new())
//!     .with_progress(log.clone())
//!     .run();
//!
//! for event in log.events() {
//!     println!("[{}] {}", event.stage, event.message);
//! }
//! # let _ = outcome;
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
    mpsc::{self, Receiver, Sender},
};
use std::time::{Duration, Instant};

/// The stage a conversion is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Stage {
    /// Checking conversion parameters.
    Validating,
    /// Locating the media file (local path check or remote metadata).
    Resolving,
    /// Fetching the media file through the downloader.
    Downloading,
    /// Sampling frames to plan the crop rectangle.
    Analyzing,
    /// Producing still frames for the requested time window.
    Extracting,
    /// Resizing, quantizing, and writing the animated image.
    Encoding,
    /// The job reached a terminal state.
    Finished,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let text = match self {
            Stage::Validating => "validating parameters",
            Stage::Resolving => "resolving source",
            Stage::Downloading => "downloading video",
            Stage::Analyzing => "analyzing frames",
            Stage::Extracting => "extracting frames",
            Stage::Encoding => "encoding GIF",
            Stage::Finished => "finished",
        };
        f.write_str(text)
    }
}

/// One entry of the progress stream.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    /// Stage the job was in when the event was emitted.
    pub stage: Stage,
    /// Human-readable description, suitable for a status line.
    pub message: String,
    /// Running frame count while extracting or encoding.
    pub frames: Option<u64>,
    /// Wall-clock time since the job started.
    pub elapsed: Duration,
}

/// Receiver of progress events.
///
/// Implementations must be [`Send`] and [`Sync`] because the job runs on its
/// own worker thread.
///
/// Sinks are **infallible**: they observe but cannot halt the job. Use
/// [`CancellationToken`] for cooperative cancellation.
pub trait ProgressSink: Send + Sync {
    /// Called each time the job appends an event to the stream.
    fn on_progress(&self, event: &ProgressEvent);
}

/// A no-op sink that discards all events.
///
/// This is the default when no sink is configured.
pub(crate) struct NoOpProgress;

impl ProgressSink for NoOpProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Append-only, in-memory progress stream.
#[derive(Debug, Default)]
pub struct ProgressLog {
    events: Mutex<Vec<ProgressEvent>>,
}

impl ProgressLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every event received so far, oldest first.
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// The most recent event, if any.
    pub fn last(&self) -> Option<ProgressEvent> {
        self.events
            .lock()
            .ok()
            .and_then(|events| events.last().cloned())
    }
}

impl ProgressSink for ProgressLog {
    fn on_progress(&self, event: &ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Sink that forwards every event over an [`mpsc`] channel.
///
/// Use this to marshal progress into a UI thread: the worker sends, the UI
/// drains the [`Receiver`] on its own schedule. Events sent after the
/// receiver is dropped are silently discarded.
pub struct ChannelSink {
    sender: Mutex<Sender<ProgressEvent>>,
}

impl ChannelSink {
    /// Create a sink together with the receiving end of its channel.
    pub fn channel() -> (Self, Receiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::channel();
        (
            Self {
                sender: Mutex::new(sender),
            },
            receiver,
        )
    }
}

impl ProgressSink for ChannelSink {
    fn on_progress(&self, event: &ProgressEvent) {
        if let Ok(sender) = self.sender.lock() {
            let _ = sender.send(event.clone());
        }
    }
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clone this token and share it between threads; call
/// [`cancel`](CancellationToken::cancel) from any thread to request
/// cancellation. The job checks the token at the start of every frame
/// iteration, so at most one frame's worth of work runs after the request.
///
/// # Example
///
/// ```
/// use gifclip::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation.
    ///
    /// All clones of this token will observe the cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Return [`GifClipError::Cancelled`](crate::GifClipError::Cancelled) if
    /// cancellation has been requested.
    pub fn checkpoint(&self) -> Result<(), crate::GifClipError> {
        if self.is_cancelled() {
            Err(crate::GifClipError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Internal helper that stamps events with elapsed time and batches the
/// per-frame ones.
pub(crate) struct ProgressTracker {
    sink: Arc<dyn ProgressSink>,
    start_time: Instant,
    batch_size: u64,
    frames: u64,
    frames_since_last_report: u64,
}

impl ProgressTracker {
    pub(crate) fn new(sink: Arc<dyn ProgressSink>, batch_size: u64) -> Self {
        Self {
            sink,
            start_time: Instant::now(),
            batch_size: batch_size.max(1),
            frames: 0,
            frames_since_last_report: 0,
        }
    }

    /// Emit a stage-level event without a frame count.
    pub(crate) fn stage(&self, stage: Stage, message: impl Into<String>) {
        self.emit(stage, message.into(), None);
    }

    /// Reset the frame counter at the start of a frame-producing stage.
    pub(crate) fn reset_frames(&mut self) {
        self.frames = 0;
        self.frames_since_last_report = 0;
    }

    /// Record one processed frame and report when the batch threshold is hit.
    pub(crate) fn advance(&mut self, stage: Stage) {
        self.frames += 1;
        self.frames_since_last_report += 1;

        if self.frames_since_last_report >= self.batch_size {
            self.emit(
                stage,
                format!("{stage}... {} frames", self.frames),
                Some(self.frames),
            );
            self.frames_since_last_report = 0;
        }
    }

    /// Unconditionally report the running frame count.
    pub(crate) fn finish_frames(&mut self, stage: Stage) {
        self.emit(
            stage,
            format!("{stage}: {} frames", self.frames),
            Some(self.frames),
        );
        self.frames_since_last_report = 0;
    }

    fn emit(&self, stage: Stage, message: String, frames: Option<u64>) {
        let event = ProgressEvent {
            stage,
            message,
            frames,
            elapsed: self.start_time.elapsed(),
        };
        self.sink.on_progress(&event);
    }
}
