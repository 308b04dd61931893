//! GIF assembly tests. Output is decoded back with the `gif` crate.

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use gifclip::{Frame, GifAssembler, GifClipError, verify_output};
use image::{Rgb, RgbImage};

fn gradient(width: u32, height: u32, shift: u8) -> Frame {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 4) as u8 ^ shift, (y * 4) as u8, shift])
    });
    Frame::new(image, Duration::ZERO)
}

/// Decoded `(width, height)`, frame count, and the delay of every frame.
fn decode(path: &Path) -> ((u16, u16), Vec<u16>) {
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::RGBA);
    let mut decoder = options
        .read_info(File::open(path).expect("GIF exists"))
        .expect("valid GIF header");
    let size = (decoder.width(), decoder.height());

    let mut delays = Vec::new();
    while let Some(frame) = decoder.read_next_frame().expect("valid GIF frame") {
        delays.push(frame.delay);
    }
    (size, delays)
}

// ── Encoding ───────────────────────────────────────────────────────

#[test]
fn frames_are_resized_and_timed() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("clip.gif");
    let frames = vec![gradient(64, 48, 0), gradient(64, 48, 80), gradient(64, 48, 160)];

    let bytes = GifAssembler::new(32, 18, 64, 10)
        .assemble(frames, &path)
        .expect("encoding succeeds");

    assert_eq!(bytes, std::fs::metadata(&path).unwrap().len());
    let (size, delays) = decode(&path);
    assert_eq!(size, (32, 18));
    assert_eq!(delays, vec![10, 10, 10]);
}

#[test]
fn full_palette_uses_the_builtin_quantizer() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("full.gif");

    GifAssembler::new(40, 30, 256, 15)
        .assemble(vec![gradient(40, 30, 7), gradient(40, 30, 9)], &path)
        .expect("encoding succeeds");

    let (size, delays) = decode(&path);
    assert_eq!(size, (40, 30));
    assert_eq!(delays, vec![7, 7]);
}

#[test]
fn missing_output_directory_is_created() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("nested").join("out.gif");

    GifAssembler::new(16, 16, 32, 10)
        .assemble(vec![gradient(16, 16, 1)], &path)
        .expect("encoding succeeds");
    assert!(path.is_file());
}

#[test]
fn no_frames_is_an_encoding_error() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("empty.gif");

    let result = GifAssembler::new(32, 18, 128, 10).assemble(Vec::new(), &path);
    assert!(matches!(result, Err(GifClipError::EncodingFailed(_))));
    assert!(!path.exists());
}

#[test]
fn oversized_dimensions_are_rejected() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("huge.gif");

    let result = GifAssembler::new(70_000, 10, 128, 10).assemble(vec![gradient(8, 8, 0)], &path);
    match result {
        Err(GifClipError::EncodingFailed(message)) => assert!(message.contains("70000x10")),
        other => panic!("Expected EncodingFailed, got: {other:?}"),
    }
    assert!(!path.exists());
}

// ── Timing ─────────────────────────────────────────────────────────

#[test]
fn frame_duration_rounds_to_milliseconds() {
    assert_eq!(GifAssembler::new(10, 10, 128, 10).frame_duration_ms(), 100);
    assert_eq!(GifAssembler::new(10, 10, 128, 15).frame_duration_ms(), 67);
    assert_eq!(GifAssembler::new(10, 10, 128, 24).frame_duration_ms(), 42);
    assert_eq!(GifAssembler::new(10, 10, 128, 60).frame_duration_ms(), 17);
}

#[test]
fn frame_delay_is_in_hundredths() {
    assert_eq!(GifAssembler::new(10, 10, 128, 10).frame_delay(), 10);
    assert_eq!(GifAssembler::new(10, 10, 128, 15).frame_delay(), 7);
    assert_eq!(GifAssembler::new(10, 10, 128, 1).frame_delay(), 100);
}

#[test]
fn zero_fps_is_treated_as_one() {
    assert_eq!(GifAssembler::new(10, 10, 128, 0).frame_duration_ms(), 1000);
}

// ── Verification ───────────────────────────────────────────────────

#[test]
fn verify_output_rejects_missing_and_empty_files() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    let missing = dir.path().join("missing.gif");
    assert!(matches!(
        verify_output(&missing),
        Err(GifClipError::EncodingFailed(_))
    ));

    let empty = dir.path().join("empty.gif");
    std::fs::write(&empty, b"").unwrap();
    assert!(matches!(verify_output(&empty), Err(GifClipError::EncodingFailed(_))));

    let written = dir.path().join("written.gif");
    std::fs::write(&written, b"GIF89a").unwrap();
    assert_eq!(verify_output(&written).unwrap(), 6);
}
