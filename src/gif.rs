//! Animated GIF assembly.
//!
//! [`GifAssembler`] resizes every frame to the exact target resolution with a
//! Lanczos filter, reduces it to the configured palette size and writes the
//! sequence as one infinitely looping GIF. With the `rayon` feature the
//! per-frame resize and quantize steps run in parallel; frames are always
//! written in order.
//!
//! # Example
//!
//! ```no_run
//! use gifclip::{Frame, GifAssembler};
//!
//! # fn frames() -> Vec<Frame> { Vec::new() }
//! let assembler = GifAssembler::new(480, 270, 128, 10);
//! let bytes = assembler.assemble(frames(), "clip.gif")?;
//! println!("wrote {bytes} bytes");
//! # Ok::<(), gifclip::GifClipError>(())
//! ```

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use color_quant::NeuQuant;
use gif::{Encoder, Repeat};
use image::{RgbImage, imageops::FilterType};

use crate::error::GifClipError;
use crate::frame::Frame;

/// NeuQuant sampling factor: 1 is slowest and best, 30 fastest.
const QUANTIZER_SAMPLE_FACTOR: i32 = 10;
/// Speed passed to the `gif` crate's own quantizer for full palettes.
const FULL_PALETTE_SPEED: i32 = 10;
/// Largest palette a GIF frame can carry.
const MAX_PALETTE: u32 = 256;

/// Writes frames as a looping animated GIF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GifAssembler {
    width: u32,
    height: u32,
    palette_size: u32,
    fps: u32,
}

impl GifAssembler {
    /// Create an assembler for `width`×`height` output at `fps` frames per
    /// second with `palette_size` colors (clamped to 2–256).
    pub fn new(width: u32, height: u32, palette_size: u32, fps: u32) -> Self {
        Self {
            width,
            height,
            palette_size: palette_size.clamp(2, MAX_PALETTE),
            fps: fps.max(1),
        }
    }

    /// Per-frame display duration in milliseconds: `round(1000 / fps)`.
    pub fn frame_duration_ms(&self) -> u32 {
        (1000.0 / f64::from(self.fps)).round() as u32
    }

    /// Per-frame delay as stored in the file, in hundredths of a second.
    pub fn frame_delay(&self) -> u16 {
        (f64::from(self.frame_duration_ms()) / 10.0).round() as u16
    }

    /// Encode `frames` to `path` and return the size of the written file.
    ///
    /// # Errors
    ///
    /// Returns [`GifClipError::EncodingFailed`] if `frames` is empty, if the
    /// target resolution does not fit a GIF, or if the written file is
    /// missing or empty afterwards. A partially written file is removed.
    pub fn assemble<P: AsRef<Path>>(
        &self,
        frames: Vec<Frame>,
        path: P,
    ) -> Result<u64, GifClipError> {
        let path = path.as_ref();
        if frames.is_empty() {
            return Err(GifClipError::EncodingFailed(
                "no frames were extracted".to_string(),
            ));
        }
        let (width, height) = self.dimensions()?;

        log::debug!(
            "Encoding {} frames to GIF file {:?} ({}x{}, {} colors, delay={}cs)",
            frames.len(),
            path,
            self.width,
            self.height,
            self.palette_size,
            self.frame_delay(),
        );

        let prepared = self.prepare_all(frames);
        if let Err(error) = self.write(path, width, height, prepared) {
            let _ = fs::remove_file(path);
            return Err(error);
        }

        verify_output(path)
    }

    fn dimensions(&self) -> Result<(u16, u16), GifClipError> {
        match (u16::try_from(self.width), u16::try_from(self.height)) {
            (Ok(width), Ok(height)) if width > 0 && height > 0 => Ok((width, height)),
            _ => Err(GifClipError::EncodingFailed(format!(
                "invalid GIF dimensions {}x{}",
                self.width, self.height
            ))),
        }
    }

    #[cfg(feature = "rayon")]
    fn prepare_all(&self, frames: Vec<Frame>) -> Vec<gif::Frame<'static>> {
        use rayon::prelude::*;

        frames
            .into_par_iter()
            .map(|frame| self.prepare(frame))
            .collect()
    }

    #[cfg(not(feature = "rayon"))]
    fn prepare_all(&self, frames: Vec<Frame>) -> Vec<gif::Frame<'static>> {
        frames.into_iter().map(|frame| self.prepare(frame)).collect()
    }

    /// Resize one frame and convert it to a palette frame.
    fn prepare(&self, frame: Frame) -> gif::Frame<'static> {
        let (width, height) = (self.width as u16, self.height as u16);
        let image = frame.into_image();
        let resized = if image.dimensions() == (self.width, self.height) {
            image
        } else {
            image::imageops::resize(&image, self.width, self.height, FilterType::Lanczos3)
        };

        let mut gif_frame = if self.palette_size >= MAX_PALETTE {
            gif::Frame::from_rgb_speed(width, height, resized.as_raw(), FULL_PALETTE_SPEED)
        } else {
            let (indices, palette) = quantize(&resized, self.palette_size);
            gif::Frame::from_palette_pixels(width, height, indices, palette, None)
        };
        gif_frame.delay = self.frame_delay();
        gif_frame
    }

    fn write(
        &self,
        path: &Path,
        width: u16,
        height: u16,
        frames: Vec<gif::Frame<'static>>,
    ) -> Result<(), GifClipError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                GifClipError::EncodingFailed(format!("Failed to create output directory: {e}"))
            })?;
        }
        let file = File::create(path)
            .map_err(|e| GifClipError::EncodingFailed(format!("Failed to create GIF file: {e}")))?;

        let mut encoder = Encoder::new(BufWriter::new(file), width, height, &[]).map_err(|e| {
            GifClipError::EncodingFailed(format!("Failed to create GIF encoder: {e}"))
        })?;
        encoder
            .set_repeat(Repeat::Infinite)
            .map_err(|e| GifClipError::EncodingFailed(format!("Failed to set GIF repeat: {e}")))?;

        for gif_frame in &frames {
            encoder.write_frame(gif_frame).map_err(|e| {
                GifClipError::EncodingFailed(format!("Failed to write GIF frame: {e}"))
            })?;
        }

        let mut writer = encoder
            .into_inner()
            .map_err(|e| GifClipError::EncodingFailed(format!("Failed to finish GIF file: {e}")))?;
        std::io::Write::flush(&mut writer)
            .map_err(|e| GifClipError::EncodingFailed(format!("Failed to flush GIF file: {e}")))?;
        Ok(())
    }
}

/// Map `image` onto a NeuQuant palette of `colors` entries.
fn quantize(image: &RgbImage, colors: u32) -> (Vec<u8>, Vec<u8>) {
    let rgba: Vec<u8> = image
        .pixels()
        .flat_map(|pixel| [pixel[0], pixel[1], pixel[2], 255])
        .collect();
    let quantizer = NeuQuant::new(QUANTIZER_SAMPLE_FACTOR, colors as usize, &rgba);
    let indices = rgba
        .chunks_exact(4)
        .map(|pixel| quantizer.index_of(pixel) as u8)
        .collect();
    (indices, quantizer.color_map_rgb())
}

/// Check that `path` exists and is non-empty; returns its size in bytes.
///
/// # Errors
///
/// Returns [`GifClipError::EncodingFailed`] otherwise.
pub fn verify_output<P: AsRef<Path>>(path: P) -> Result<u64, GifClipError> {
    let path = path.as_ref();
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_file() && metadata.len() > 0 => Ok(metadata.len()),
        Ok(_) => Err(GifClipError::EncodingFailed(format!(
            "output file {} is empty",
            path.display()
        ))),
        Err(error) => Err(GifClipError::EncodingFailed(format!(
            "output file {} was not written: {error}",
            path.display()
        ))),
    }
}
