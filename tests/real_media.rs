//! Tests against real media files.
//!
//! Tests require fixture files from `tests/fixtures/generate_fixtures.sh`
//! and return early when they are missing.

use std::path::Path;

use gifclip::{
    CancellationToken, ConversionJob, ConversionParams, CropPlanner, ExtractRequest,
    FrameExtractor, JobOptions, JobOutcome, probe_local,
};

fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

fn letterboxed_path() -> &'static str {
    "tests/fixtures/letterboxed.mp4"
}

// ── Probing ────────────────────────────────────────────────────────

#[test]
fn probe_reads_fixture_geometry() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let info = probe_local(path, &JobOptions::new()).expect("Failed to probe fixture");
    assert_eq!(info.title, "sample_video");
    let stream = info.best_stream().expect("fixture has a video stream");
    assert_eq!((stream.width, stream.height), (320, 240));
    let duration = info.duration.expect("fixture duration");
    assert!((duration - 5.0).abs() < 0.5, "{duration}");
}

// ── Extraction ─────────────────────────────────────────────────────

#[test]
fn default_chain_extracts_the_window() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let scratch = tempfile::tempdir().expect("Failed to create temp dir");
    let options = JobOptions::new().with_scratch_dir(scratch.path());
    let request = ExtractRequest::new(path, 1.0, 3.0, 5).with_options(&options);

    let frames: Vec<_> = FrameExtractor::with_defaults(&options)
        .extract(&request, &CancellationToken::new())
        .expect("Failed to extract frames")
        .collect();

    assert!(!frames.is_empty());
    assert!(frames.len() <= 12, "{} frames", frames.len());
    for frame in &frames {
        assert_eq!((frame.width(), frame.height()), (320, 240));
    }
}

#[test]
fn letterbox_bars_are_trimmed_during_extraction() {
    let path = letterboxed_path();
    if !Path::new(path).exists() {
        return;
    }

    let scratch = tempfile::tempdir().expect("Failed to create temp dir");
    let options = JobOptions::new().with_scratch_dir(scratch.path());
    let request = ExtractRequest::new(path, 0.0, 4.5, 2)
        .with_crop(CropPlanner::new(true, false))
        .with_options(&options);

    let frames: Vec<_> = FrameExtractor::with_defaults(&options)
        .extract(&request, &CancellationToken::new())
        .expect("Failed to extract frames")
        .collect();

    assert!(!frames.is_empty());
    for frame in &frames {
        assert!(frame.height() <= 184, "height {}", frame.height());
    }
}

// ── Full conversion ────────────────────────────────────────────────

#[test]
fn fixture_converts_to_a_gif() {
    let path = letterboxed_path();
    if !Path::new(path).exists() {
        return;
    }

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let params = ConversionParams::local(path)
        .with_time_range(0.5, 2.5)
        .with_resolution(160, 90)
        .with_fps(5)
        .with_output_dir(dir.path().join("out"));
    let options = JobOptions::new().with_scratch_dir(dir.path().join("scratch"));

    match ConversionJob::new(params, options).run() {
        JobOutcome::Completed {
            output,
            frames,
            bytes,
        } => {
            assert!(output.starts_with(dir.path()));
            assert!(output.is_file());
            assert!(frames > 0 && frames <= 12, "{frames} frames");
            assert!(bytes > 0);
        }
        other => panic!("Expected Completed, got: {other:?}"),
    }
}
