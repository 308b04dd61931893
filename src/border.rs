//! Letterbox border detection.
//!
//! [`detect_black_borders`] walks inward from each edge of a frame and counts
//! the consecutive rows or columns whose mean luminance stays at or below a
//! threshold. Each edge only inspects its own third of the frame, so a frame
//! that is dark everywhere is never consumed whole.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use gifclip::{Frame, detect_black_borders};
//! use image::{Rgb, RgbImage};
//!
//! // 40 black rows above and below a grey picture.
//! let image = RgbImage::from_fn(320, 240, |_, y| {
//!     if y < 40 || y >= 200 { Rgb([0, 0, 0]) } else { Rgb([128, 128, 128]) }
//! });
//! let crop = detect_black_borders(&Frame::new(image, Duration::ZERO), 30);
//! assert_eq!((crop.top, crop.bottom), (40, 40));
//! assert_eq!((crop.left, crop.right), (0, 0));
//! ```

use image::GrayImage;

use crate::frame::{CropRect, Frame};

/// Default luminance threshold (out of 255) at or below which a row or column
/// counts as border.
pub const DEFAULT_BORDER_THRESHOLD: u8 = 30;

/// Detect uniformly dark strips at the four edges of `frame`.
///
/// For each edge, rows (or columns) are visited from the outside in through
/// the first third of the dimension; the scan stops at the first line whose
/// mean luminance exceeds `threshold` and the edge's crop is the number of
/// dark lines seen before it.
pub fn detect_black_borders(frame: &Frame, threshold: u8) -> CropRect {
    let gray = frame.luminance();
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return CropRect::default();
    }
    let limit = f64::from(threshold);

    let mut crop = CropRect::default();

    for y in 0..height / 3 {
        if row_mean(&gray, y) > limit {
            break;
        }
        crop.top = y + 1;
    }

    for y in (height * 2 / 3 + 1..height).rev() {
        if row_mean(&gray, y) > limit {
            break;
        }
        crop.bottom = height - y;
    }

    for x in 0..width / 3 {
        if column_mean(&gray, x) > limit {
            break;
        }
        crop.left = x + 1;
    }

    for x in (width * 2 / 3 + 1..width).rev() {
        if column_mean(&gray, x) > limit {
            break;
        }
        crop.right = width - x;
    }

    log::trace!("border scan on {width}x{height} frame: {crop:?}");
    crop
}

fn row_mean(gray: &GrayImage, y: u32) -> f64 {
    let width = gray.width();
    let sum: u64 = (0..width).map(|x| u64::from(gray.get_pixel(x, y)[0])).sum();
    sum as f64 / f64::from(width)
}

fn column_mean(gray: &GrayImage, x: u32) -> f64 {
    let height = gray.height();
    let sum: u64 = (0..height).map(|y| u64::from(gray.get_pixel(x, y)[0])).sum();
    sum as f64 / f64::from(height)
}
