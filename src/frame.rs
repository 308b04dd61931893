//! Frame and crop-rectangle types.
//!
//! A [`Frame`] is an immutable 8-bit RGB pixel buffer tagged with the time it
//! was captured at. A [`CropRect`] holds the number of pixels to remove from
//! each edge before resizing.

use std::time::Duration;

use image::{GrayImage, Luma, RgbImage, imageops};

/// A decoded still frame.
///
/// Owned by whichever component produced it and handed along by value;
/// cropping produces a new frame instead of mutating this one.
#[derive(Debug, Clone)]
#[must_use]
pub struct Frame {
    image: RgbImage,
    timestamp: Duration,
}

impl Frame {
    /// Wrap an RGB image captured at `timestamp`.
    pub fn new(image: RgbImage, timestamp: Duration) -> Self {
        Self { image, timestamp }
    }

    /// The pixel buffer.
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Consume the frame and return its pixel buffer.
    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Capture time, measured from the start of the media.
    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// 8-bit BT.601 luminance plane of this frame.
    pub fn luminance(&self) -> GrayImage {
        GrayImage::from_fn(self.image.width(), self.image.height(), |x, y| {
            let [r, g, b] = self.image.get_pixel(x, y).0;
            Luma([luma(r, g, b)])
        })
    }

    /// Return a new frame with `crop` removed from each edge.
    ///
    /// Each edge is first limited to a quarter of its dimension. If the
    /// limited rectangle would still leave nothing, the frame is returned
    /// uncropped.
    pub fn cropped(&self, crop: &CropRect) -> Frame {
        let (width, height) = (self.width(), self.height());
        let crop = crop.limit_to_quarter(width, height);
        if crop.is_empty() || !crop.fits(width, height) {
            return self.clone();
        }

        let view = imageops::crop_imm(
            &self.image,
            crop.left,
            crop.top,
            width - crop.left - crop.right,
            height - crop.top - crop.bottom,
        );
        Frame::new(view.to_image(), self.timestamp)
    }
}

/// Pixel counts to remove from each edge of a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CropRect {
    /// Rows removed from the top.
    pub top: u32,
    /// Rows removed from the bottom.
    pub bottom: u32,
    /// Columns removed from the left.
    pub left: u32,
    /// Columns removed from the right.
    pub right: u32,
}

impl CropRect {
    /// Create a crop rectangle from the four edge amounts.
    pub const fn new(top: u32, bottom: u32, left: u32, right: u32) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    /// `true` when nothing is removed from any edge.
    pub fn is_empty(&self) -> bool {
        self.top == 0 && self.bottom == 0 && self.left == 0 && self.right == 0
    }

    /// Element-wise maximum of two rectangles.
    pub fn max(self, other: CropRect) -> CropRect {
        CropRect {
            top: self.top.max(other.top),
            bottom: self.bottom.max(other.bottom),
            left: self.left.max(other.left),
            right: self.right.max(other.right),
        }
    }

    /// `true` if cropping a `width`×`height` frame leaves at least one pixel
    /// on both axes.
    pub fn fits(&self, width: u32, height: u32) -> bool {
        u64::from(self.top) + u64::from(self.bottom) < u64::from(height)
            && u64::from(self.left) + u64::from(self.right) < u64::from(width)
    }

    /// Limit every edge to a quarter of the corresponding dimension.
    pub fn limit_to_quarter(&self, width: u32, height: u32) -> CropRect {
        CropRect {
            top: self.top.min(height / 4),
            bottom: self.bottom.min(height / 4),
            left: self.left.min(width / 4),
            right: self.right.min(width / 4),
        }
    }

    /// Size of the region that remains after cropping a `width`×`height`
    /// frame, or `None` if nothing would remain.
    pub fn remaining(&self, width: u32, height: u32) -> Option<(u32, u32)> {
        if self.fits(width, height) {
            Some((
                width - self.left - self.right,
                height - self.top - self.bottom,
            ))
        } else {
            None
        }
    }
}

/// BT.601 luma of an RGB pixel.
pub(crate) fn luma(r: u8, g: u8, b: u8) -> u8 {
    let value = 0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b);
    value.round().min(255.0) as u8
}
