//! Internal utility functions.
//!
//! Helpers for pixel-data copying, timestamp conversion and output naming
//! that do not belong in any single public module.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[cfg(feature = "pixel")]
use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Copy pixel data from an FFmpeg video frame into a tightly-packed buffer.
///
/// FFmpeg frames frequently carry per-row padding (stride > width × bpp).
/// The padding is stripped so the result can be passed directly to
/// [`image::RgbImage::from_raw`].
#[cfg(feature = "pixel")]
pub(crate) fn frame_to_buffer(
    video_frame: &VideoFrame,
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let row_bytes = width as usize * bytes_per_pixel;
    let data = video_frame.data(0);

    if stride == row_bytes {
        data[..row_bytes * height as usize].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + row_bytes]);
        }
        buffer
    }
}

/// Rescale a PTS value from stream time base to seconds.
#[cfg(feature = "pixel")]
pub(crate) fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    if time_base.denominator() == 0 {
        return 0.0;
    }
    pts as f64 * f64::from(time_base.numerator()) / f64::from(time_base.denominator())
}

/// Seconds to the microsecond timestamps container-level seeking expects.
#[cfg(feature = "pixel")]
pub(crate) fn seconds_to_seek_timestamp(seconds: f64) -> i64 {
    (seconds.max(0.0) * f64::from(ffmpeg_next::ffi::AV_TIME_BASE)) as i64
}

/// Seconds since the Unix epoch, used to keep output and scratch names unique.
pub(crate) fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

/// Make a title safe for use as a file name.
///
/// Keeps alphanumerics, `_`, whitespace and `-`, then collapses every run of
/// whitespace and hyphens into a single hyphen. An empty result becomes
/// `"video"`.
///
/// ```
/// assert_eq!(gifclip::sanitize_title("My  Clip: part 2!"), "My-Clip-part-2");
/// assert_eq!(gifclip::sanitize_title("???"), "video");
/// ```
pub fn sanitize_title(title: &str) -> String {
    let kept: String = title
        .trim()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();

    let mut sanitized = String::with_capacity(kept.len());
    let mut in_separator = false;
    for c in kept.chars() {
        if c == '-' || c.is_whitespace() {
            if !in_separator {
                sanitized.push('-');
                in_separator = true;
            }
        } else {
            sanitized.push(c);
            in_separator = false;
        }
    }

    let sanitized = sanitized.trim_matches('-');
    if sanitized.is_empty() {
        "video".to_string()
    } else {
        sanitized.to_string()
    }
}

/// File stem of `path`, or `"video"` when it has none.
pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string())
}

/// `<dir>/<sanitized title>_<unix timestamp>.gif`.
pub(crate) fn output_path(dir: &Path, title: &str) -> PathBuf {
    dir.join(format!("{}_{}.gif", sanitize_title(title), unix_timestamp()))
}

/// `true` for `http`/`https` URLs that name a host.
///
/// ```
/// assert!(gifclip::looks_like_url("https://example.com/watch?v=1"));
/// assert!(!gifclip::looks_like_url("https://"));
/// assert!(!gifclip::looks_like_url("clip.mp4"));
/// ```
pub fn looks_like_url(text: &str) -> bool {
    let text = text.trim();
    let rest = text
        .strip_prefix("https://")
        .or_else(|| text.strip_prefix("http://"));
    match rest {
        Some(rest) => {
            let host = rest.split(['/', '?', '#']).next().unwrap_or("");
            !host.is_empty() && !host.contains(char::is_whitespace)
        }
        None => false,
    }
}
