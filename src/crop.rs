//! Crop planning across sampled frames.
//!
//! [`CropPlanner`] runs the border and watermark detectors on a handful of
//! frames and merges their results into one conservative rectangle: the
//! element-wise maximum, so no sampled frame is ever under-cropped. The merged
//! rectangle is then limited so at least [`MIN_REMAINING_SPAN`] pixels
//! survive on each axis.
//!
//! # Example
//!
//! ```
//! use gifclip::{CropPlanner, CropRect};
//!
//! let planner = CropPlanner::new(true, true);
//! // No frames sampled: nothing to remove.
//! assert_eq!(planner.plan(&[]), CropRect::default());
//! ```

use crate::border::{DEFAULT_BORDER_THRESHOLD, detect_black_borders};
use crate::frame::{CropRect, Frame};
use crate::watermark::{DEFAULT_MARGIN_RATIO, detect_watermark};

/// Smallest span, in pixels, that a planned crop leaves on each axis.
pub const MIN_REMAINING_SPAN: u32 = 100;

/// Which detectors feed the plan, plus their tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropPlanner {
    /// Run [`detect_black_borders`] on each frame.
    pub remove_borders: bool,
    /// Run [`detect_watermark`] on each frame.
    pub remove_watermark: bool,
    /// Luminance threshold forwarded to the border detector.
    pub border_threshold: u8,
    /// Margin ratio forwarded to the watermark detector.
    pub margin_ratio: f64,
}

impl Default for CropPlanner {
    fn default() -> Self {
        Self::new(true, true)
    }
}

impl CropPlanner {
    /// Create a planner with the default detector settings.
    pub fn new(remove_borders: bool, remove_watermark: bool) -> Self {
        Self {
            remove_borders,
            remove_watermark,
            border_threshold: DEFAULT_BORDER_THRESHOLD,
            margin_ratio: DEFAULT_MARGIN_RATIO,
        }
    }

    /// `true` if at least one detector is enabled.
    pub fn is_enabled(&self) -> bool {
        self.remove_borders || self.remove_watermark
    }

    /// Crop rectangle for a single frame: the element-wise maximum of the
    /// enabled detectors' results.
    pub fn frame_crop(&self, frame: &Frame) -> CropRect {
        let mut crop = CropRect::default();
        if self.remove_borders {
            crop = crop.max(detect_black_borders(frame, self.border_threshold));
        }
        if self.remove_watermark {
            crop = crop.max(detect_watermark(frame, self.margin_ratio));
        }
        crop
    }

    /// Merge the per-frame crops of `frames` into one size-safe rectangle.
    ///
    /// The frame dimensions used for the final limit are those of the first
    /// frame; sampled frames all come from the same stream.
    pub fn plan(&self, frames: &[Frame]) -> CropRect {
        let Some(first) = frames.first() else {
            return CropRect::default();
        };
        if !self.is_enabled() {
            return CropRect::default();
        }

        let merged = frames
            .iter()
            .map(|frame| self.frame_crop(frame))
            .fold(CropRect::default(), CropRect::max);

        let planned = limit_to_min_span(merged, first.width(), first.height());
        log::debug!(
            "planned crop from {} sample frame(s): {planned:?} (raw {merged:?})",
            frames.len()
        );
        planned
    }
}

/// Scale down both edges of any axis on which `crop` would leave fewer than
/// [`MIN_REMAINING_SPAN`] pixels.
///
/// The edges on that axis shrink proportionally so the remaining span is
/// (at least) the minimum. Axes that are already narrower than the minimum
/// are not cropped at all.
pub fn limit_to_min_span(crop: CropRect, width: u32, height: u32) -> CropRect {
    let (left, right) = limit_axis(crop.left, crop.right, width);
    let (top, bottom) = limit_axis(crop.top, crop.bottom, height);
    CropRect::new(top, bottom, left, right)
}

fn limit_axis(first: u32, second: u32, extent: u32) -> (u32, u32) {
    let total = u64::from(first) + u64::from(second);
    if total == 0 {
        return (first, second);
    }
    if u64::from(extent) >= total + u64::from(MIN_REMAINING_SPAN) {
        return (first, second);
    }

    let allowed = extent.saturating_sub(MIN_REMAINING_SPAN);
    let ratio = f64::from(allowed) / total as f64;
    (
        (f64::from(first) * ratio) as u32,
        (f64::from(second) * ratio) as u32,
    )
}
