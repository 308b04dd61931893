//! Bright corner-watermark detection.
//!
//! Platform watermarks are near-white, low-saturation overlays sitting close
//! to an edge. [`detect_watermark`] builds a mask of such pixels, cleans it
//! with a morphological close-then-open, and looks for a band of mask pixels
//! inside each edge margin.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{close, open};

use crate::frame::{CropRect, Frame, luma};

/// Default fraction of each dimension treated as the edge margin.
pub const DEFAULT_MARGIN_RATIO: f64 = 0.15;

/// Fraction of bright pixels an edge band needs before it is scanned.
const BAND_THRESHOLD: f64 = 0.01;
/// Fraction of bright pixels a single row/column needs to count as mark.
const LINE_THRESHOLD: f64 = 0.02;
/// Extra pixels removed past the detected mark.
const SAFETY_MARGIN: u32 = 5;

/// Minimum HSV value (0–255) for a pixel to count as near-white.
const WHITE_MIN_VALUE: u8 = 200;
/// Maximum HSV saturation (0–255) for a pixel to count as near-white.
const WHITE_MAX_SATURATION: u8 = 30;
/// Luminance above which a pixel is bright regardless of saturation.
const BRIGHT_LUMINANCE: u8 = 200;

/// Detect a bright rectangular mark inside the edge margins of `frame`.
///
/// Only edges whose margin band holds more than 1% bright pixels are
/// touched. For such an edge the band is scanned from its inner boundary
/// toward the frame edge; the first row/column with more than 2% bright
/// pixels marks the inner extent of the watermark, and the edge's crop is
/// its distance from the frame edge plus a 5-pixel safety margin.
///
/// `margin_ratio` is clamped to `0.0..=0.5`.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use gifclip::{Frame, detect_watermark};
/// use image::{Rgb, RgbImage};
///
/// // A white 40x20 block in the bottom-right corner of a dark frame.
/// let image = RgbImage::from_fn(320, 240, |x, y| {
///     if (270..310).contains(&x) && (210..230).contains(&y) {
///         Rgb([255, 255, 255])
///     } else {
///         Rgb([20, 40, 60])
///     }
/// });
/// let crop = detect_watermark(&Frame::new(image, Duration::ZERO), 0.15);
/// assert!(crop.bottom > 0 && crop.right > 0);
/// assert_eq!((crop.top, crop.left), (0, 0));
/// ```
pub fn detect_watermark(frame: &Frame, margin_ratio: f64) -> CropRect {
    let (width, height) = (frame.width(), frame.height());
    let margin_ratio = if margin_ratio.is_nan() {
        0.0
    } else {
        margin_ratio.clamp(0.0, 0.5)
    };
    let margin_height = (f64::from(height) * margin_ratio) as u32;
    let margin_width = (f64::from(width) * margin_ratio) as u32;

    let mask = bright_mask(frame);
    let mut crop = CropRect::default();

    if margin_height > 0 {
        if band_ratio(&mask, 0, 0, width, margin_height) > BAND_THRESHOLD {
            if let Some(row) = (0..margin_height)
                .rev()
                .find(|&y| row_ratio(&mask, y) > LINE_THRESHOLD)
            {
                crop.top = row + SAFETY_MARGIN;
            }
        }

        let band_start = height - margin_height;
        if band_ratio(&mask, 0, band_start, width, margin_height) > BAND_THRESHOLD {
            if let Some(offset) =
                (0..margin_height).find(|&i| row_ratio(&mask, band_start + i) > LINE_THRESHOLD)
            {
                crop.bottom = margin_height - offset + SAFETY_MARGIN;
            }
        }
    }

    if margin_width > 0 {
        if band_ratio(&mask, 0, 0, margin_width, height) > BAND_THRESHOLD {
            if let Some(column) = (0..margin_width)
                .rev()
                .find(|&x| column_ratio(&mask, x) > LINE_THRESHOLD)
            {
                crop.left = column + SAFETY_MARGIN;
            }
        }

        let band_start = width - margin_width;
        if band_ratio(&mask, band_start, 0, margin_width, height) > BAND_THRESHOLD {
            if let Some(offset) = (0..margin_width)
                .find(|&i| column_ratio(&mask, band_start + i) > LINE_THRESHOLD)
            {
                crop.right = margin_width - offset + SAFETY_MARGIN;
            }
        }
    }

    log::trace!("watermark scan on {width}x{height} frame: {crop:?}");
    crop
}

/// Mask of near-white or bright pixels (255 = bright), denoised with a 3×3
/// close followed by a 3×3 open.
pub fn bright_mask(frame: &Frame) -> GrayImage {
    let image = frame.image();
    let mask = GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        if is_near_white(r, g, b) || luma(r, g, b) > BRIGHT_LUMINANCE {
            Luma([255])
        } else {
            Luma([0])
        }
    });

    let closed = close(&mask, Norm::LInf, 1);
    open(&closed, Norm::LInf, 1)
}

/// HSV range test: any hue, saturation ≤ 30, value ≥ 200 (all on 0–255).
fn is_near_white(r: u8, g: u8, b: u8) -> bool {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    if max < WHITE_MIN_VALUE {
        return false;
    }
    let saturation = u32::from(max - min) * 255 / u32::from(max);
    saturation <= u32::from(WHITE_MAX_SATURATION)
}

fn band_ratio(mask: &GrayImage, x0: u32, y0: u32, width: u32, height: u32) -> f64 {
    let total = u64::from(width) * u64::from(height);
    if total == 0 {
        return 0.0;
    }
    let mut bright = 0_u64;
    for y in y0..y0 + height {
        for x in x0..x0 + width {
            if mask.get_pixel(x, y)[0] > 0 {
                bright += 1;
            }
        }
    }
    bright as f64 / total as f64
}

fn row_ratio(mask: &GrayImage, y: u32) -> f64 {
    band_ratio(mask, 0, y, mask.width(), 1)
}

fn column_ratio(mask: &GrayImage, x: u32) -> f64 {
    band_ratio(mask, x, 0, 1, mask.height())
}
