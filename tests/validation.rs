//! Conversion parameter validation tests.

use gifclip::{ConversionParams, GifClipError, MediaSource, PALETTE_SIZES, validate_params};

fn params() -> ConversionParams {
    ConversionParams::local("input.mp4")
}

#[test]
fn defaults_are_valid_and_quiet() {
    let report = validate_params(&params());
    assert!(report.is_valid(), "{report}");
    assert!(report.warnings.is_empty(), "{report}");
    assert_eq!(report.info.len(), 1);
    assert!(report.info[0].contains("480×270"));
}

#[test]
fn end_before_start_is_rejected() {
    let report = validate_params(&params().with_time_range(5.0, 3.0));
    assert!(!report.is_valid());
    assert!(report.errors.iter().any(|e| e.contains("must be after start")));

    match report.into_result() {
        Err(GifClipError::InvalidInput(message)) => assert!(message.contains("5.00s")),
        other => panic!("Expected InvalidInput, got: {other:?}"),
    }
}

#[test]
fn zero_length_window_is_rejected() {
    assert!(!validate_params(&params().with_time_range(4.0, 4.0)).is_valid());
}

#[test]
fn negative_and_non_finite_times_are_rejected() {
    assert!(!validate_params(&params().with_time_range(-1.0, 3.0)).is_valid());
    assert!(!validate_params(&params().with_time_range(0.0, f64::NAN)).is_valid());
    assert!(!validate_params(&params().with_time_range(f64::INFINITY, 3.0)).is_valid());
}

#[test]
fn frame_rate_must_be_in_range() {
    assert!(!validate_params(&params().with_fps(0)).is_valid());
    assert!(!validate_params(&params().with_fps(61)).is_valid());
    assert!(validate_params(&params().with_fps(1)).is_valid());
    assert!(validate_params(&params().with_fps(60).with_time_range(0.0, 2.0)).is_valid());
}

#[test]
fn palette_size_must_be_allowed() {
    for colors in PALETTE_SIZES {
        assert!(validate_params(&params().with_palette_size(colors)).is_valid());
    }
    for colors in [0, 2, 100, 255, 512] {
        assert!(!validate_params(&params().with_palette_size(colors)).is_valid());
    }
}

#[test]
fn zero_dimensions_are_rejected() {
    assert!(!validate_params(&params().with_resolution(0, 270)).is_valid());
    assert!(!validate_params(&params().with_resolution(480, 0)).is_valid());
}

#[test]
fn empty_sources_are_rejected() {
    let empty_path = ConversionParams::local("");
    assert!(!validate_params(&empty_path).is_valid());

    let blank_url = ConversionParams::remote("   ");
    assert!(!validate_params(&blank_url).is_valid());
}

#[test]
fn missing_local_file_is_not_a_validation_error() {
    let report = validate_params(&ConversionParams::local("no/such/dir/clip.mp4"));
    assert!(report.is_valid());
}

#[test]
fn several_errors_are_reported_together() {
    let report = validate_params(
        &params()
            .with_time_range(3.0, 1.0)
            .with_fps(0)
            .with_palette_size(7),
    );
    assert_eq!(report.errors.len(), 3, "{report}");
    assert!(report.warnings.is_empty());
}

#[test]
fn large_output_is_warned_about() {
    let report = validate_params(&params().with_resolution(1280, 720));
    assert!(report.is_valid());
    assert!(report.warnings.iter().any(|w| w.contains("very large")));
    assert!(report.warnings.iter().any(|w| w.contains("MB")));
}

#[test]
fn medium_resolution_gets_a_softer_warning() {
    let report = validate_params(&params().with_resolution(640, 360).with_time_range(0.0, 2.0));
    assert!(report.is_valid());
    assert!(report.warnings.iter().any(|w| w.contains("500px")), "{report}");
}

#[test]
fn long_clips_are_warned_about() {
    let report = validate_params(&params().with_time_range(0.0, 60.0).with_resolution(160, 90));
    assert!(report.warnings.iter().any(|w| w.contains("600 frames")), "{report}");
}

#[test]
fn report_display_lists_every_entry() {
    let report = validate_params(&params().with_fps(0));
    let text = report.to_string();
    assert!(text.contains("[ERROR]"));
    assert!(report.issue_count() >= 1);

    let clean = validate_params(&params());
    assert!(clean.to_string().contains("[INFO]"));
}

#[test]
fn remote_sources_validate_like_local_ones() {
    let params = ConversionParams::remote("https://example.com/watch?v=abc");
    assert_eq!(
        params.source,
        MediaSource::Remote("https://example.com/watch?v=abc".to_string())
    );
    assert!(validate_params(&params).is_valid());
}
