//! Pre-flight validation of conversion parameters.
//!
//! [`validate_params`] inspects a [`ConversionParams`] and returns a
//! [`ValidationReport`]. Errors block the conversion; warnings and info are
//! advisory and never stop a job.
//!
//! # Example
//!
//! ```
//! use gifclip::{ConversionParams, validate_params};
//!
//! let params = ConversionParams::local("input.mp4")
//!     .with_time_range(0.0, 60.0)
//!     .with_resolution(1280, 720);
//! let report = validate_params(&params);
//! assert!(report.is_valid());
//! assert!(!report.warnings.is_empty());
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::config::{ConversionParams, MAX_FPS, MIN_FPS, MediaSource, PALETTE_SIZES};
use crate::error::GifClipError;
use crate::estimate::estimate_size_mb;

/// Longest edge above which output is flagged as very large.
const VERY_LARGE_EDGE: u32 = 800;
/// Longest edge above which output is flagged as large.
const LARGE_EDGE: u32 = 500;
/// Estimated size, in MiB, above which output is flagged as very big.
const VERY_LARGE_SIZE_MB: f64 = 10.0;
/// Estimated size, in MiB, above which output is flagged as big.
const LARGE_SIZE_MB: f64 = 4.0;
/// Frame count above which the animation is flagged as long.
const MANY_FRAMES: u64 = 500;

/// Outcome of parameter validation.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Informational notices (not problems).
    pub info: Vec<String>,
    /// Non-fatal issues that may make the output large or slow to produce.
    pub warnings: Vec<String>,
    /// Fatal issues that prevent the conversion from starting.
    pub errors: Vec<String>,
}

impl ValidationReport {
    /// Returns `true` if no errors were found.
    ///
    /// Warnings do not affect this result.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Total number of entries (info + warnings + errors).
    pub fn issue_count(&self) -> usize {
        self.info.len() + self.warnings.len() + self.errors.len()
    }

    /// Convert to a `Result`, folding all errors into one
    /// [`GifClipError::InvalidInput`].
    pub fn into_result(self) -> Result<Self, GifClipError> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(GifClipError::InvalidInput(self.errors.join("; ")))
        }
    }
}

impl Display for ValidationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for item in &self.info {
            writeln!(f, "[INFO] {item}")?;
        }
        for item in &self.warnings {
            writeln!(f, "[WARN] {item}")?;
        }
        for item in &self.errors {
            writeln!(f, "[ERROR] {item}")?;
        }
        if self.issue_count() == 0 {
            writeln!(f, "No issues found.")?;
        }
        Ok(())
    }
}

/// Run validation checks on `params`.
///
/// Existence of a local source file is not checked here; a missing file is
/// reported as [`GifClipError::SourceUnavailable`] when the job resolves the
/// source.
pub fn validate_params(params: &ConversionParams) -> ValidationReport {
    let mut report = ValidationReport::default();

    // ── Source ─────────────────────────────────────────────────────
    let empty_source = match &params.source {
        MediaSource::Local(path) => path.as_os_str().is_empty(),
        MediaSource::Remote(url) => url.trim().is_empty(),
    };
    if empty_source {
        report.errors.push("No video source was given".to_string());
    }

    // ── Time range ─────────────────────────────────────────────────
    if !params.start_time.is_finite() || !params.end_time.is_finite() {
        report
            .errors
            .push("Start and end time must be finite numbers".to_string());
    } else {
        if params.start_time < 0.0 {
            report.errors.push(format!(
                "Start time must not be negative (got {:.2}s)",
                params.start_time
            ));
        }
        if params.duration() <= 0.0 {
            report.errors.push(format!(
                "End time ({:.2}s) must be after start time ({:.2}s)",
                params.end_time, params.start_time
            ));
        }
    }

    // ── Geometry ───────────────────────────────────────────────────
    if params.width == 0 || params.height == 0 {
        report.errors.push(format!(
            "Invalid output dimensions: {}×{}",
            params.width, params.height
        ));
    }

    if !(MIN_FPS..=MAX_FPS).contains(&params.fps) {
        report.errors.push(format!(
            "Frame rate must be between {MIN_FPS} and {MAX_FPS} (got {})",
            params.fps
        ));
    }

    if !PALETTE_SIZES.contains(&params.palette_size) {
        report.errors.push(format!(
            "Palette size must be one of {PALETTE_SIZES:?} (got {})",
            params.palette_size
        ));
    }

    if !report.is_valid() {
        return report;
    }

    // ── Output size ────────────────────────────────────────────────
    let longest_edge = params.width.max(params.height);
    if longest_edge > VERY_LARGE_EDGE {
        report.warnings.push(format!(
            "Resolution {}×{} is very large; the GIF may be slow to load",
            params.width, params.height
        ));
    } else if longest_edge > LARGE_EDGE {
        report.warnings.push(format!(
            "Resolution {}×{} is large; consider {LARGE_EDGE}px or less on the longest edge",
            params.width, params.height
        ));
    }

    let size_mb = estimate_size_mb(
        params.width,
        params.height,
        params.duration(),
        params.fps,
        params.palette_size,
    );
    if size_mb > VERY_LARGE_SIZE_MB {
        report.warnings.push(format!(
            "Estimated size {size_mb:.1} MB is very large; shorten the clip or lower the resolution"
        ));
    } else if size_mb > LARGE_SIZE_MB {
        report
            .warnings
            .push(format!("Estimated size {size_mb:.1} MB is large"));
    }

    let frames = params.expected_frames();
    if frames > MANY_FRAMES {
        report.warnings.push(format!(
            "{frames} frames is a lot for a GIF; lower the frame rate or shorten the clip"
        ));
    }

    report.info.push(format!(
        "{}×{} @ {} fps, {} colors, ~{frames} frames, ~{size_mb:.2} MB",
        params.width, params.height, params.fps, params.palette_size,
    ));

    report
}
