//! Output resolution recommendations.
//!
//! [`recommend`] proposes a short, ranked list of output geometries for a
//! source video. The largest candidate keeps the source aspect ratio with
//! its longer side capped at [`MAX_RECOMMENDED_EDGE`] pixels; four tiers
//! scale it down and pair it with a palette size. Every candidate carries an
//! estimated file size and its area relative to the source.
//!
//! [`RecommendationDebouncer`] recomputes recommendations off the caller's
//! thread when inputs change, dropping superseded requests.
//!
//! # Example
//!
//! ```
//! use gifclip::{Tier, recommend};
//!
//! let candidates = recommend(1920, 1080, 30.0, 10);
//! assert_eq!((candidates[0].width, candidates[0].height), (500, 280));
//!
//! let default = candidates.iter().find(|c| c.is_default).unwrap();
//! assert_eq!(default.tier, Tier::Recommended);
//! assert_eq!((default.width, default.height), (400, 224));
//! ```

use std::collections::HashSet;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::Quality;
use crate::estimate::{bytes_to_megabytes, estimate_size};

/// Longest edge, in pixels, of the largest recommended output.
pub const MAX_RECOMMENDED_EDGE: u32 = 500;
/// Smallest recommended width, unless the source is narrower.
pub const MIN_RECOMMENDED_WIDTH: u32 = 160;
/// Smallest recommended height, unless the source is shorter.
pub const MIN_RECOMMENDED_HEIGHT: u32 = 90;
/// Delay before a debounced recommendation request is computed.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Duration assumed when the requested one is not positive.
const FALLBACK_DURATION: f64 = 10.0;

/// Named quality tier of a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Full recommended size, 256 colors.
    Best,
    /// 80% of the full size, 192 colors. The default selection.
    Recommended,
    /// 65% of the full size, 128 colors.
    Standard,
    /// Half the full size, 96 colors.
    Small,
}

impl Tier {
    /// All tiers, largest first.
    pub const ALL: [Tier; 4] = [Tier::Best, Tier::Recommended, Tier::Standard, Tier::Small];

    /// Scale factor applied to the largest candidate.
    pub fn scale(self) -> f64 {
        match self {
            Tier::Best => 1.0,
            Tier::Recommended => 0.8,
            Tier::Standard => 0.65,
            Tier::Small => 0.5,
        }
    }

    /// Palette size paired with this tier.
    pub fn palette_size(self) -> u32 {
        match self {
            Tier::Best => 256,
            Tier::Recommended => 192,
            Tier::Standard => 128,
            Tier::Small => 96,
        }
    }

    /// Lowercase label.
    pub fn label(self) -> &'static str {
        match self {
            Tier::Best => "best",
            Tier::Recommended => "recommended",
            Tier::Standard => "standard",
            Tier::Small => "small",
        }
    }
}

impl Display for Tier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.label())
    }
}

/// One proposed output geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    /// Output width (even).
    pub width: u32,
    /// Output height (even).
    pub height: u32,
    /// Number of palette colors.
    pub palette_size: u32,
    /// Tier that produced this candidate.
    pub tier: Tier,
    /// Estimated encoded size in bytes.
    pub estimated_bytes: f64,
    /// Candidate area divided by source area.
    pub compression_ratio: f64,
    /// `true` for the candidate a front end should preselect.
    pub is_default: bool,
}

impl Recommendation {
    /// Estimated size in mebibytes.
    pub fn estimated_mb(&self) -> f64 {
        bytes_to_megabytes(self.estimated_bytes)
    }

    /// Quality preset inferred from the palette size.
    pub fn quality(&self) -> Quality {
        Quality::from_palette_size(self.palette_size)
    }
}

/// Propose output geometries for a `source_width`×`source_height` video
/// converted for `duration` seconds at `fps`.
///
/// Candidates have even dimensions, are no smaller than 160×90 (unless the
/// source is), contain no duplicate sizes and are ordered by descending
/// area. Exactly one candidate has `is_default` set: the
/// [`Tier::Recommended`] one, or the largest if that tier collapsed into
/// another. A zero-sized source yields no candidates. A non-positive
/// `duration` is treated as ten seconds.
pub fn recommend(
    source_width: u32,
    source_height: u32,
    duration: f64,
    fps: u32,
) -> Vec<Recommendation> {
    if source_width == 0 || source_height == 0 {
        return Vec::new();
    }
    let duration = if duration.is_finite() && duration > 0.0 {
        duration
    } else {
        FALLBACK_DURATION
    };

    let aspect = f64::from(source_width) / f64::from(source_height);
    let (max_width, max_height) = if source_width >= source_height {
        let width = source_width.min(MAX_RECOMMENDED_EDGE);
        (width, (f64::from(width) / aspect) as u32)
    } else {
        let height = source_height.min(MAX_RECOMMENDED_EDGE);
        ((f64::from(height) * aspect) as u32, height)
    };
    let (max_width, max_height) = (round_down_even(max_width), round_down_even(max_height));
    if max_width == 0 || max_height == 0 {
        return Vec::new();
    }
    let floor_width = MIN_RECOMMENDED_WIDTH.min(max_width);
    let floor_height = MIN_RECOMMENDED_HEIGHT.min(max_height);
    let source_area = f64::from(source_width) * f64::from(source_height);

    let mut seen = HashSet::new();
    let mut candidates: Vec<Recommendation> = Tier::ALL
        .iter()
        .filter_map(|&tier| {
            let width =
                round_down_even((f64::from(max_width) * tier.scale()) as u32).max(floor_width);
            let height =
                round_down_even((f64::from(max_height) * tier.scale()) as u32).max(floor_height);
            if !seen.insert((width, height)) {
                return None;
            }
            Some(Recommendation {
                width,
                height,
                palette_size: tier.palette_size(),
                tier,
                estimated_bytes: estimate_size(width, height, duration, fps, tier.palette_size()),
                compression_ratio: f64::from(width) * f64::from(height) / source_area,
                is_default: false,
            })
        })
        .collect();

    candidates.sort_by_key(|c| std::cmp::Reverse(u64::from(c.width) * u64::from(c.height)));

    let default_index = candidates
        .iter()
        .position(|c| c.tier == Tier::Recommended)
        .unwrap_or(0);
    if let Some(candidate) = candidates.get_mut(default_index) {
        candidate.is_default = true;
    }

    log::debug!(
        "{} recommendation(s) for {source_width}x{source_height}, {duration:.1}s @ {fps} fps",
        candidates.len()
    );
    candidates
}

fn round_down_even(value: u32) -> u32 {
    value - value % 2
}

/// How a target resolution relates to the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleKind {
    /// Smaller than the source.
    Downscale,
    /// Same area as the source.
    Original,
    /// Larger than the source.
    Upscale,
}

/// Target-versus-source size summary for display next to a resolution
/// picker.
///
/// ```
/// use gifclip::{CompressionSummary, ScaleKind};
///
/// let summary = CompressionSummary::new(480, 270, 1920, 1080).unwrap();
/// assert_eq!(summary.kind, ScaleKind::Downscale);
/// assert!((summary.percent() - 6.25).abs() < 1e-9);
/// assert!(!summary.exceeds_recommended_edge);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionSummary {
    /// Target area divided by source area.
    pub ratio: f64,
    /// Whether the target shrinks, keeps or enlarges the source.
    pub kind: ScaleKind,
    /// `true` if the target's longest edge is above
    /// [`MAX_RECOMMENDED_EDGE`].
    pub exceeds_recommended_edge: bool,
}

impl CompressionSummary {
    /// Compare a target resolution with the source. `None` if either has a
    /// zero dimension.
    pub fn new(
        target_width: u32,
        target_height: u32,
        source_width: u32,
        source_height: u32,
    ) -> Option<Self> {
        if target_width == 0 || target_height == 0 || source_width == 0 || source_height == 0 {
            return None;
        }
        let target_area = u64::from(target_width) * u64::from(target_height);
        let source_area = u64::from(source_width) * u64::from(source_height);
        let kind = match target_area.cmp(&source_area) {
            std::cmp::Ordering::Less => ScaleKind::Downscale,
            std::cmp::Ordering::Equal => ScaleKind::Original,
            std::cmp::Ordering::Greater => ScaleKind::Upscale,
        };
        Some(Self {
            ratio: target_area as f64 / source_area as f64,
            kind,
            exceeds_recommended_edge: target_width.max(target_height) > MAX_RECOMMENDED_EDGE,
        })
    }

    /// The ratio as a percentage.
    pub fn percent(&self) -> f64 {
        self.ratio * 100.0
    }
}

impl Display for CompressionSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.kind {
            ScaleKind::Downscale => write!(f, "scaled to {:.1}%", self.percent())?,
            ScaleKind::Original => f.write_str("original size")?,
            ScaleKind::Upscale => write!(f, "enlarged to {:.1}%", self.percent())?,
        }
        if self.exceeds_recommended_edge {
            write!(f, " (longest edge above {MAX_RECOMMENDED_EDGE}px)")?;
        }
        Ok(())
    }
}

/// Inputs to one recommendation computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecommendationRequest {
    /// Source width in pixels.
    pub source_width: u32,
    /// Source height in pixels.
    pub source_height: u32,
    /// Clip duration in seconds.
    pub duration: f64,
    /// Output frame rate.
    pub fps: u32,
}

/// Recomputes recommendations on a background thread, debounced.
///
/// Each [`request`](Self::request) restarts the delay; when the delay passes
/// with no newer request, the latest one is computed and handed to the
/// callback. Superseded requests are dropped, not queued. A request still
/// pending when the debouncer is dropped is discarded.
pub struct RecommendationDebouncer {
    sender: Option<Sender<RecommendationRequest>>,
    worker: Option<JoinHandle<()>>,
}

impl RecommendationDebouncer {
    /// Start a debouncer that waits `delay` after the last request.
    pub fn new<F>(delay: Duration, callback: F) -> Self
    where
        F: Fn(RecommendationRequest, Vec<Recommendation>) + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel::<RecommendationRequest>();
        let worker = thread::spawn(move || {
            while let Ok(mut pending) = receiver.recv() {
                loop {
                    match receiver.recv_timeout(delay) {
                        Ok(newer) => pending = newer,
                        Err(RecvTimeoutError::Timeout) => {
                            let candidates = recommend(
                                pending.source_width,
                                pending.source_height,
                                pending.duration,
                                pending.fps,
                            );
                            callback(pending, candidates);
                            break;
                        }
                        Err(RecvTimeoutError::Disconnected) => return,
                    }
                }
            }
        });
        Self {
            sender: Some(sender),
            worker: Some(worker),
        }
    }

    /// Start a debouncer with the default 500 ms delay.
    pub fn with_default_delay<F>(callback: F) -> Self
    where
        F: Fn(RecommendationRequest, Vec<Recommendation>) + Send + 'static,
    {
        Self::new(DEFAULT_DEBOUNCE, callback)
    }

    /// Submit new inputs, superseding any pending request.
    pub fn request(&self, request: RecommendationRequest) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(request);
        }
    }
}

impl Drop for RecommendationDebouncer {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
