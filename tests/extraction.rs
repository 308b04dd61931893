//! Frame extraction tests: still-image loading and the fallback chain.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use gifclip::{
    Attempt, CancellationToken, CliExtractor, CropPlanner, CropRect, ExtractRequest,
    ExtractionStrategy, Frame, FrameExtractor, GifClipError, StillFrames,
};
use image::{Rgb, RgbImage};

fn save_still(dir: &Path, name: &str, image: &RgbImage) {
    image.save(dir.join(name)).expect("Failed to write still");
}

fn grey(width: u32, height: u32, level: u8) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([level, level, level]))
}

/// 160×120 still with 20-pixel black bars above and below.
fn letterboxed_still() -> RgbImage {
    RgbImage::from_fn(160, 120, |_, y| {
        if !(20..100).contains(&y) {
            Rgb([0, 0, 0])
        } else {
            Rgb([110, 110, 110])
        }
    })
}

fn request() -> ExtractRequest {
    ExtractRequest::new("clip.mp4", 1.0, 3.0, 10)
}

/// Strategy that answers with a fixed outcome and counts its calls.
struct Scripted {
    name: &'static str,
    outcome: fn() -> Attempt,
    calls: Arc<AtomicUsize>,
}

impl Scripted {
    fn boxed(name: &'static str, outcome: fn() -> Attempt) -> (Box<Self>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let strategy = Box::new(Self {
            name,
            outcome,
            calls: Arc::clone(&calls),
        });
        (strategy, calls)
    }
}

impl ExtractionStrategy for Scripted {
    fn name(&self) -> &str {
        self.name
    }

    fn extract(&self, _request: &ExtractRequest, _cancel: &CancellationToken) -> Attempt {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.outcome)()
    }
}

fn two_frames() -> Attempt {
    let frames = (0..2).map(|i| Frame::new(grey(8, 8, 50), Duration::from_millis(i * 100)));
    Attempt::Frames(Box::new(frames))
}

// ── StillFrames ────────────────────────────────────────────────────

#[test]
fn stills_load_in_name_order_with_timestamps() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    save_still(dir.path(), "frame_0002.png", &grey(32, 24, 200));
    save_still(dir.path(), "frame_0001.png", &grey(32, 24, 100));
    save_still(dir.path(), "frame_0003.jpg", &grey(32, 24, 50));

    let frames: Vec<Frame> = StillFrames::open(dir.path(), 2.0, 4, 100)
        .expect("directory is readable")
        .collect();

    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].image().get_pixel(0, 0).0, [100, 100, 100]);
    assert_eq!(frames[1].image().get_pixel(0, 0).0, [200, 200, 200]);
    assert_eq!(frames[0].timestamp(), Duration::from_secs(2));
    assert_eq!(frames[1].timestamp(), Duration::from_millis(2250));
    assert_eq!(frames[2].timestamp(), Duration::from_millis(2500));
}

#[test]
fn unreadable_and_unrelated_files_are_skipped() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    save_still(dir.path(), "frame_0001.png", &grey(16, 16, 90));
    fs::write(dir.path().join("frame_0002.png"), b"definitely not a png").unwrap();
    save_still(dir.path(), "frame_0003.png", &grey(16, 16, 90));
    save_still(dir.path(), "thumbnail.png", &grey(16, 16, 90));
    fs::write(dir.path().join("frame_0004.txt"), b"notes").unwrap();

    let frames: Vec<Frame> = StillFrames::open(dir.path(), 0.0, 10, 100)
        .expect("directory is readable")
        .collect();
    assert_eq!(frames.len(), 2);
}

#[test]
fn still_count_is_capped() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    for i in 1..=6 {
        save_still(dir.path(), &format!("frame_{i:04}.png"), &grey(8, 8, 60));
    }

    let mut stills = StillFrames::open(dir.path(), 0.0, 10, 4).expect("directory is readable");
    assert_eq!(stills.remaining(), 4);
    assert!(stills.next().is_some());
    assert_eq!(stills.remaining(), 3);
    assert_eq!(stills.count(), 3);
}

#[test]
fn missing_directory_is_an_io_error() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let result = StillFrames::open(dir.path().join("absent"), 0.0, 10, 10);
    assert!(matches!(result, Err(GifClipError::IoError(_))));
}

#[test]
fn crop_is_planned_from_samples_and_applied() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    for i in 1..=5 {
        save_still(dir.path(), &format!("frame_{i:04}.png"), &letterboxed_still());
    }

    let stills = StillFrames::open(dir.path(), 0.0, 1, 100)
        .expect("directory is readable")
        .with_crop(&CropPlanner::new(true, false));
    assert_eq!(stills.crop(), CropRect::new(20, 20, 0, 0));

    for frame in stills {
        assert_eq!((frame.width(), frame.height()), (160, 80));
    }
}

#[test]
fn disabled_planner_leaves_stills_whole() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    save_still(dir.path(), "frame_0001.png", &letterboxed_still());

    let stills = StillFrames::open(dir.path(), 0.0, 1, 100)
        .expect("directory is readable")
        .with_crop(&CropPlanner::new(false, false));
    assert!(stills.crop().is_empty());
}

// ── ExtractRequest ─────────────────────────────────────────────────

#[test]
fn expected_frames_is_floor_of_duration_times_fps() {
    assert_eq!(request().expected_frames(), 20);
    assert_eq!(ExtractRequest::new("a.mp4", 0.0, 1.25, 10).expected_frames(), 12);
    assert_eq!(ExtractRequest::new("a.mp4", 5.0, 3.0, 10).expected_frames(), 0);
}

#[test]
fn disabled_crop_planner_is_dropped() {
    let request = request().with_crop(CropPlanner::new(false, false));
    assert!(request.crop.is_none());

    let request = request.with_crop(CropPlanner::default());
    assert!(request.crop.is_some());
}

// ── Fallback chain ─────────────────────────────────────────────────

#[test]
fn chain_falls_through_to_the_first_producer() {
    let (skip, skip_calls) = Scripted::boxed("skip", || Attempt::Skipped("n/a".into()));
    let (fail, fail_calls) = Scripted::boxed("fail", || Attempt::Failed("broken".into()));
    let (ok, ok_calls) = Scripted::boxed("ok", two_frames);
    let (unused, unused_calls) = Scripted::boxed("unused", two_frames);
    let extractor = FrameExtractor::new(vec![skip, fail, ok, unused]);

    let frames: Vec<Frame> = extractor
        .extract(&request(), &CancellationToken::new())
        .expect("third strategy produces frames")
        .collect();

    assert_eq!(frames.len(), 2);
    assert_eq!(skip_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fail_calls.load(Ordering::SeqCst), 1);
    assert_eq!(ok_calls.load(Ordering::SeqCst), 1);
    assert_eq!(unused_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn total_failure_names_each_strategy_and_the_fix() {
    let (first, _) = Scripted::boxed("first", || Attempt::Failed("exit 1".into()));
    let (second, _) = Scripted::boxed("second", || Attempt::Failed("no stream".into()));
    let extractor = FrameExtractor::new(vec![first, second]);

    match extractor.extract(&request(), &CancellationToken::new()) {
        Err(GifClipError::ExtractionFailed(message)) => {
            assert!(message.contains("first: exit 1"), "{message}");
            assert!(message.contains("second: no stream"), "{message}");
            assert!(message.contains("Install the FFmpeg command-line tools"), "{message}");
        }
        Err(other) => panic!("Expected ExtractionFailed, got: {other}"),
        Ok(_) => panic!("Expected ExtractionFailed, got frames"),
    }
}

#[test]
fn empty_chain_reports_no_strategy() {
    let extractor = FrameExtractor::new(Vec::new());
    assert!(extractor.strategy_names().is_empty());
    match extractor.extract(&request(), &CancellationToken::new()) {
        Err(GifClipError::ExtractionFailed(message)) => {
            assert!(message.contains("no extraction strategy is available"));
        }
        _ => panic!("Expected ExtractionFailed"),
    }
}

#[test]
fn pre_cancelled_token_runs_nothing() {
    let (ok, calls) = Scripted::boxed("ok", two_frames);
    let extractor = FrameExtractor::new(vec![ok]);
    let token = CancellationToken::new();
    token.cancel();

    assert!(matches!(
        extractor.extract(&request(), &token),
        Err(GifClipError::Cancelled)
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn cancelled_attempt_stops_the_chain() {
    let (cancelled, _) = Scripted::boxed("cancelled", || Attempt::Cancelled);
    let (ok, ok_calls) = Scripted::boxed("ok", two_frames);
    let extractor = FrameExtractor::new(vec![cancelled, ok]);

    assert!(matches!(
        extractor.extract(&request(), &CancellationToken::new()),
        Err(GifClipError::Cancelled)
    ));
    assert_eq!(ok_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn strategy_names_follow_chain_order() {
    let (a, _) = Scripted::boxed("alpha", two_frames);
    let (b, _) = Scripted::boxed("beta", two_frames);
    assert_eq!(FrameExtractor::new(vec![a, b]).strategy_names(), vec!["alpha", "beta"]);
}

// ── Command-line extractor ─────────────────────────────────────────

#[test]
fn missing_binary_fails_and_leaves_no_scratch() {
    let scratch = tempfile::tempdir().expect("Failed to create temp dir");
    let mut request = request();
    request.scratch_dir = scratch.path().to_path_buf();

    let extractor = CliExtractor::new("gifclip-no-such-ffmpeg-binary");
    match extractor.extract(&request, &CancellationToken::new()) {
        Attempt::Failed(reason) => assert!(reason.contains("not found"), "{reason}"),
        _ => panic!("Expected a failed attempt"),
    }

    let leftovers: Vec<_> = fs::read_dir(scratch.path()).unwrap().collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
}
