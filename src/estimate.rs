//! Closed-form GIF size estimate.
//!
//! The model is a calibration heuristic, not a physical law: it assumes
//! 0.8 bytes per pixel before compression, scales linearly with the palette
//! size, and keeps 40% of that after inter-frame compression. A fixed header
//! and the palette itself are added on top.

/// Empirical bytes per pixel before compression.
const BYTES_PER_PIXEL: f64 = 0.8;
/// Share of the per-frame bytes that survives inter-frame compression.
const COMPRESSION_RETENTION: f64 = 0.4;
/// Fixed container overhead in bytes.
const HEADER_BYTES: f64 = 1024.0;

/// Estimated encoded size, in bytes, of a GIF with the given parameters.
///
/// The estimate is monotonically non-decreasing in every argument. Negative
/// or non-finite durations count as zero.
///
/// # Example
///
/// ```
/// let small = gifclip::estimate_size(320, 180, 5.0, 10, 128);
/// let large = gifclip::estimate_size(480, 270, 5.0, 10, 128);
/// assert!(large > small);
/// ```
pub fn estimate_size(width: u32, height: u32, duration: f64, fps: u32, palette_size: u32) -> f64 {
    let duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
    let frames = duration * f64::from(fps);
    let color_factor = f64::from(palette_size) / 256.0;
    let bytes_per_frame = f64::from(width)
        * f64::from(height)
        * BYTES_PER_PIXEL
        * color_factor
        * COMPRESSION_RETENTION;
    let overhead = HEADER_BYTES + f64::from(palette_size) * 3.0;

    frames * bytes_per_frame + overhead
}

/// Same as [`estimate_size`], expressed in mebibytes.
pub fn estimate_size_mb(
    width: u32,
    height: u32,
    duration: f64,
    fps: u32,
    palette_size: u32,
) -> f64 {
    bytes_to_megabytes(estimate_size(width, height, duration, fps, palette_size))
}

/// Convert a byte count to mebibytes.
pub fn bytes_to_megabytes(bytes: f64) -> f64 {
    bytes / (1024.0 * 1024.0)
}
