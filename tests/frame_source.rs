//! Source resolution tests with a scripted downloader.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use gifclip::{
    CancellationToken, Downloader, FORMAT_SELECTORS, FetchError, FrameSource, GifClipError,
    MediaSource, StreamDescriptor, VideoInfo,
};

/// What the scripted downloader does on its `n`-th fetch.
#[derive(Clone, Copy)]
enum Step {
    NoFormat,
    NetworkError,
    Write(usize),
    /// Report success without writing anything.
    Silent,
    /// Leave a `.part` file behind and fail.
    Partial,
    /// Leave a `.part` file behind, then cancel the job.
    PartialThenCancel,
}

struct ScriptedDownloader {
    steps: Vec<Step>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedDownloader {
    fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

fn fill_template(template: &Path, ext: &str) -> PathBuf {
    PathBuf::from(template.to_string_lossy().replace("%(ext)s", ext))
}

impl Downloader for ScriptedDownloader {
    fn probe(&self, _url: &str) -> Result<VideoInfo, GifClipError> {
        Ok(VideoInfo {
            title: "Scripted".to_string(),
            duration: Some(42.0),
            uploader: "tests".to_string(),
            streams: vec![StreamDescriptor {
                width: 1280,
                height: 720,
                frames_per_second: Some(30.0),
                codec: Some("h264".to_string()),
                container: Some("mp4".to_string()),
            }],
        })
    }

    fn fetch(
        &self,
        _url: &str,
        selector: &str,
        template: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), FetchError> {
        let mut calls = self.calls.lock().unwrap();
        let step = self.steps.get(calls.len()).copied().unwrap_or(Step::NetworkError);
        calls.push(selector.to_string());
        match step {
            Step::NoFormat => Err(FetchError::NoMatchingFormat(selector.to_string())),
            Step::NetworkError => Err(FetchError::Other("connection reset".to_string())),
            Step::Write(bytes) => {
                fs::write(fill_template(template, "mp4"), vec![0_u8; bytes]).unwrap();
                Ok(())
            }
            Step::Silent => Ok(()),
            Step::Partial => {
                fs::write(fill_template(template, "mp4.part"), vec![0_u8; 2048]).unwrap();
                Err(FetchError::Other("interrupted".to_string()))
            }
            Step::PartialThenCancel => {
                fs::write(fill_template(template, "mp4.part"), vec![0_u8; 2048]).unwrap();
                cancel.cancel();
                Err(FetchError::Other("cancelled".to_string()))
            }
        }
    }
}

fn remote() -> MediaSource {
    MediaSource::Remote("https://example.com/watch?v=abc".to_string())
}

fn entries(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .map(|entries| entries.filter_map(|e| e.ok().map(|e| e.path())).collect())
        .unwrap_or_default()
}

// ── Remote sources ─────────────────────────────────────────────────

#[test]
fn exhausted_selectors_report_every_cause() {
    let scratch = tempfile::tempdir().expect("Failed to create temp dir");
    let downloader = ScriptedDownloader::new(vec![Step::NoFormat; 3]);
    let source = FrameSource::new(downloader.clone(), scratch.path());

    let error = source
        .resolve(&remote(), &CancellationToken::new())
        .expect_err("every selector fails");

    match &error {
        GifClipError::SourceUnavailable { location, reason } => {
            assert_eq!(location, "https://example.com/watch?v=abc");
            assert!(reason.contains("network connection"), "{reason}");
            assert!(reason.contains("valid"), "{reason}");
            assert!(reason.contains("expired"), "{reason}");
            assert!(reason.contains("region-locked"), "{reason}");
            assert!(reason.contains("requires login"), "{reason}");
        }
        other => panic!("Expected SourceUnavailable, got: {other}"),
    }
    assert_eq!(downloader.calls(), FORMAT_SELECTORS.to_vec());
}

#[test]
fn first_working_selector_wins() {
    let scratch = tempfile::tempdir().expect("Failed to create temp dir");
    let downloader =
        ScriptedDownloader::new(vec![Step::NoFormat, Step::NetworkError, Step::Write(4096)]);
    let source = FrameSource::new(downloader.clone(), scratch.path());

    let resolved = source
        .resolve(&remote(), &CancellationToken::new())
        .expect("third selector succeeds");

    assert!(resolved.downloaded);
    assert!(resolved.path.is_file());
    assert!(resolved.path.starts_with(scratch.path()));
    assert_eq!(resolved.path.extension().and_then(|e| e.to_str()), Some("mp4"));
    assert_eq!(downloader.calls().len(), 3);

    let path = resolved.path.clone();
    resolved.cleanup();
    assert!(!path.exists());
    assert!(entries(scratch.path()).is_empty(), "{:?}", entries(scratch.path()));
}

#[test]
fn files_outside_the_download_directory_are_never_taken() {
    let scratch = tempfile::tempdir().expect("Failed to create temp dir");
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock after epoch")
        .as_secs();
    // Another job's download, named the way this one would be.
    let foreign: Vec<PathBuf> = (now..=now + 2)
        .map(|ts| scratch.path().join(format!("source_{ts}.mp4")))
        .collect();
    for path in &foreign {
        fs::write(path, vec![9_u8; 4096]).expect("Failed to write file");
    }

    let downloader = ScriptedDownloader::new(vec![Step::Silent; FORMAT_SELECTORS.len()]);
    let source = FrameSource::new(downloader.clone(), scratch.path());
    let result = source.resolve(&remote(), &CancellationToken::new());

    assert!(matches!(result, Err(GifClipError::SourceUnavailable { .. })), "{result:?}");
    for path in &foreign {
        assert!(path.exists(), "{} was removed", path.display());
    }
}

#[test]
fn concurrent_downloads_use_separate_directories() {
    let scratch = tempfile::tempdir().expect("Failed to create temp dir");
    let first = FrameSource::new(ScriptedDownloader::new(vec![Step::Write(4096)]), scratch.path())
        .resolve(&remote(), &CancellationToken::new())
        .expect("first download succeeds");
    let second = FrameSource::new(ScriptedDownloader::new(vec![Step::Write(4096)]), scratch.path())
        .resolve(&remote(), &CancellationToken::new())
        .expect("second download succeeds");

    assert_ne!(first.path, second.path);
    let (first_path, second_path) = (first.path.clone(), second.path.clone());
    first.cleanup();
    assert!(!first_path.exists());
    assert!(second_path.is_file(), "cleanup must not touch another download");
    second.cleanup();
    assert!(entries(scratch.path()).is_empty(), "{:?}", entries(scratch.path()));
}

#[test]
fn partial_files_are_removed_when_every_selector_fails() {
    let scratch = tempfile::tempdir().expect("Failed to create temp dir");
    let downloader = ScriptedDownloader::new(vec![Step::Partial; FORMAT_SELECTORS.len()]);
    let source = FrameSource::new(downloader.clone(), scratch.path());

    let result = source.resolve(&remote(), &CancellationToken::new());
    assert!(matches!(result, Err(GifClipError::SourceUnavailable { .. })));
    assert_eq!(downloader.calls().len(), FORMAT_SELECTORS.len());
    assert!(entries(scratch.path()).is_empty(), "{:?}", entries(scratch.path()));
}

#[test]
fn partial_files_are_removed_when_cancelled_mid_download() {
    let scratch = tempfile::tempdir().expect("Failed to create temp dir");
    let downloader = ScriptedDownloader::new(vec![Step::PartialThenCancel, Step::Write(4096)]);
    let source = FrameSource::new(downloader.clone(), scratch.path());

    let result = source.resolve(&remote(), &CancellationToken::new());
    assert!(matches!(result, Err(GifClipError::Cancelled)), "{result:?}");
    assert_eq!(downloader.calls().len(), 1);
    assert!(entries(scratch.path()).is_empty(), "{:?}", entries(scratch.path()));
}

#[test]
fn tiny_downloads_are_discarded() {
    let scratch = tempfile::tempdir().expect("Failed to create temp dir");
    let downloader = ScriptedDownloader::new(vec![Step::Write(100); FORMAT_SELECTORS.len()]);
    let source = FrameSource::new(downloader.clone(), scratch.path());

    let result = source.resolve(&remote(), &CancellationToken::new());
    assert!(matches!(result, Err(GifClipError::SourceUnavailable { .. })));
    assert!(entries(scratch.path()).is_empty(), "{:?}", entries(scratch.path()));
}

#[test]
fn custom_selector_list_is_used() {
    let scratch = tempfile::tempdir().expect("Failed to create temp dir");
    let downloader = ScriptedDownloader::new(Vec::new());
    let source = FrameSource::new(downloader.clone(), scratch.path())
        .with_selectors(["bestvideo", "best"]);

    let error = source
        .resolve(&remote(), &CancellationToken::new())
        .expect_err("both selectors fail");
    assert!(error.to_string().contains("2 formats"), "{error}");
    assert_eq!(downloader.calls(), vec!["bestvideo", "best"]);
}

#[test]
fn cancellation_stops_before_downloading() {
    let scratch = tempfile::tempdir().expect("Failed to create temp dir");
    let downloader = ScriptedDownloader::new(vec![Step::Write(4096)]);
    let source = FrameSource::new(downloader.clone(), scratch.path());
    let token = CancellationToken::new();
    token.cancel();

    let result = source.resolve(&remote(), &token);
    assert!(matches!(result, Err(GifClipError::Cancelled)));
    assert!(downloader.calls().is_empty());
}

#[test]
fn non_url_remote_is_invalid_input() {
    let scratch = tempfile::tempdir().expect("Failed to create temp dir");
    let downloader = ScriptedDownloader::new(Vec::new());
    let source = FrameSource::new(downloader.clone(), scratch.path());

    let result = source.resolve(
        &MediaSource::Remote("not a link".to_string()),
        &CancellationToken::new(),
    );
    assert!(matches!(result, Err(GifClipError::InvalidInput(_))));
    assert!(downloader.calls().is_empty());
}

// ── Local sources ──────────────────────────────────────────────────

#[test]
fn existing_local_file_is_used_in_place() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("clip.mp4");
    fs::write(&path, b"not really a video").expect("Failed to write file");

    let source = FrameSource::new(ScriptedDownloader::new(Vec::new()), dir.path());
    let resolved = source
        .resolve(&MediaSource::Local(path.clone()), &CancellationToken::new())
        .expect("local file resolves");

    assert_eq!(resolved.path, path);
    assert!(!resolved.downloaded);

    resolved.cleanup();
    assert!(path.exists(), "local files must never be deleted");
}

#[test]
fn missing_local_file_is_unavailable() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let source = FrameSource::new(ScriptedDownloader::new(Vec::new()), dir.path());

    let result = source.resolve(
        &MediaSource::Local(dir.path().join("missing.mp4")),
        &CancellationToken::new(),
    );
    match result {
        Err(GifClipError::SourceUnavailable { reason, .. }) => {
            assert!(reason.contains("does not exist"));
        }
        other => panic!("Expected SourceUnavailable, got: {other:?}"),
    }
}
