//! Resolving a playable media file from a path or URL.
//!
//! Local paths are checked and used as-is. Remote URLs go through a
//! [`Downloader`], trying each entry of [`FORMAT_SELECTORS`] in turn until
//! one leaves a file of at least [`MIN_DOWNLOAD_BYTES`] in a private
//! `download_*` directory under the scratch directory. That directory goes
//! away with the [`ResolvedSource`], or as soon as every selector has
//! failed, so partial downloads never outlive the attempt. No selector asks the downloader to merge separate audio and
//! video streams; audio is discarded downstream anyway.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use crate::config::MediaSource;
use crate::error::GifClipError;
use crate::metadata::VideoInfo;
use crate::process::{ToolOutcome, last_line, run_tool};
use crate::progress::CancellationToken;
use crate::utilities::{looks_like_url, unix_timestamp};

/// Format selectors tried in order against the downloader.
pub const FORMAT_SELECTORS: [&str; 8] = [
    "best[ext=mp4][vcodec!=none][acodec!=none]",
    "best[vcodec!=none][acodec!=none]",
    "best[ext=flv]",
    "worst[height>=360][vcodec!=none][acodec!=none]",
    "best[vcodec!=none]",
    "bestvideo[ext=mp4]",
    "bestvideo",
    "best",
];

/// Smallest downloaded file accepted as real media.
pub const MIN_DOWNLOAD_BYTES: u64 = 1024;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Why a single fetch failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The selector matched no format the source offers.
    NoMatchingFormat(String),
    /// Network failure or any other downloader error.
    Other(String),
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FetchError::NoMatchingFormat(detail) => write!(f, "no matching format: {detail}"),
            FetchError::Other(detail) => write!(f, "{detail}"),
        }
    }
}

/// A remote video downloader.
pub trait Downloader: Send + Sync {
    /// Read metadata for `url` without downloading media.
    fn probe(&self, url: &str) -> Result<VideoInfo, GifClipError>;

    /// Download the stream chosen by `selector`.
    ///
    /// `output_template` ends in `.%(ext)s`; the downloader replaces that
    /// placeholder with the extension of the stream it writes. A fetch
    /// should stop early once `cancel` is triggered.
    fn fetch(
        &self,
        url: &str,
        selector: &str,
        output_template: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), FetchError>;
}

/// [`Downloader`] backed by the `yt-dlp` command-line tool.
#[derive(Debug, Clone)]
pub struct YtDlp {
    binary: String,
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

impl YtDlp {
    /// Use `binary` (a name on `PATH` or a path).
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .args(["--no-playlist", "--no-warnings", "--no-check-certificates"])
            .args(["--user-agent", USER_AGENT])
            .stdin(Stdio::null());
        command
    }
}

impl Downloader for YtDlp {
    fn probe(&self, url: &str) -> Result<VideoInfo, GifClipError> {
        let unavailable = |reason: String| GifClipError::SourceUnavailable {
            location: url.to_string(),
            reason,
        };
        let output = self
            .command()
            .arg("-J")
            .arg(url)
            .output()
            .map_err(|error| {
                unavailable(format!("{} could not be started: {error}", self.binary))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(unavailable(format!(
                "{} failed to read video info: {}",
                self.binary,
                last_line(&stderr)
            )));
        }
        VideoInfo::from_downloader_json(&String::from_utf8_lossy(&output.stdout))
    }

    fn fetch(
        &self,
        url: &str,
        selector: &str,
        output_template: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), FetchError> {
        let mut command = self.command();
        command
            .args(["-f", selector])
            .arg("-o")
            .arg(output_template)
            .arg(url);

        // Downloads may legitimately take a long time; only cancellation stops them.
        match run_tool(command, Duration::MAX, cancel) {
            ToolOutcome::Success => Ok(()),
            ToolOutcome::Failed { stderr, .. } => {
                let detail = last_line(&stderr).to_string();
                let no_format = stderr.contains("Requested format is not available")
                    || stderr.contains("format not available");
                if no_format {
                    Err(FetchError::NoMatchingFormat(detail))
                } else {
                    Err(FetchError::Other(detail))
                }
            }
            other => Err(FetchError::Other(other.describe(&self.binary))),
        }
    }
}

/// A media file ready for extraction.
#[derive(Debug)]
pub struct ResolvedSource {
    /// Path of the media file.
    pub path: PathBuf,
    /// `true` if the file was downloaded into scratch space.
    pub downloaded: bool,
    scratch: Option<TempDir>,
}

impl ResolvedSource {
    /// Delete the download directory if the file was downloaded. User files
    /// are never touched. Dropping a downloaded source has the same effect.
    pub fn cleanup(self) {
        let Some(scratch) = self.scratch else {
            return;
        };
        let dir = scratch.path().to_path_buf();
        match scratch.close() {
            Ok(()) => log::debug!("removed download directory {}", dir.display()),
            Err(error) => log::warn!("could not remove {}: {error}", dir.display()),
        }
    }
}

/// Turns a [`MediaSource`] into a local file.
pub struct FrameSource {
    downloader: Arc<dyn Downloader>,
    scratch_dir: PathBuf,
    selectors: Vec<String>,
}

impl FrameSource {
    /// Download remote sources with `downloader` into `scratch_dir`.
    pub fn new<P: AsRef<Path>>(downloader: Arc<dyn Downloader>, scratch_dir: P) -> Self {
        Self {
            downloader,
            scratch_dir: scratch_dir.as_ref().to_path_buf(),
            selectors: FORMAT_SELECTORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Replace the format selector list.
    #[must_use]
    pub fn with_selectors<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selectors = selectors.into_iter().map(Into::into).collect();
        self
    }

    /// Produce a local media file for `source`.
    ///
    /// # Errors
    ///
    /// - [`GifClipError::SourceUnavailable`] if a local path does not exist
    ///   or every selector failed.
    /// - [`GifClipError::InvalidInput`] if a remote source is not an
    ///   http(s) URL.
    /// - [`GifClipError::Cancelled`] if cancellation is observed between
    ///   selectors.
    pub fn resolve(
        &self,
        source: &MediaSource,
        cancel: &CancellationToken,
    ) -> Result<ResolvedSource, GifClipError> {
        match source {
            MediaSource::Local(path) => {
                if !path.is_file() {
                    return Err(GifClipError::SourceUnavailable {
                        location: path.display().to_string(),
                        reason: "file does not exist".to_string(),
                    });
                }
                Ok(ResolvedSource {
                    path: path.clone(),
                    downloaded: false,
                    scratch: None,
                })
            }
            MediaSource::Remote(url) => self.download(url, cancel),
        }
    }

    fn download(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<ResolvedSource, GifClipError> {
        if !looks_like_url(url) {
            return Err(GifClipError::InvalidInput(format!("not a video URL: {url}")));
        }
        fs::create_dir_all(&self.scratch_dir)?;
        let scratch = tempfile::Builder::new()
            .prefix("download_")
            .tempdir_in(&self.scratch_dir)?;

        let stem = format!("source_{}", unix_timestamp());
        let template = scratch.path().join(format!("{stem}.%(ext)s"));

        for (attempt, selector) in self.selectors.iter().enumerate() {
            cancel.checkpoint()?;
            log::info!(
                "download attempt {}/{} with format {selector}",
                attempt + 1,
                self.selectors.len()
            );

            match self.downloader.fetch(url, selector, &template, cancel) {
                Ok(()) => match take_download(scratch.path(), &stem) {
                    Some(path) => {
                        log::info!("downloaded {}", path.display());
                        return Ok(ResolvedSource {
                            path,
                            downloaded: true,
                            scratch: Some(scratch),
                        });
                    }
                    None => log::warn!("format {selector} produced no usable file"),
                },
                Err(error) => log::warn!("format {selector} failed: {error}"),
            }
        }

        Err(GifClipError::SourceUnavailable {
            location: url.to_string(),
            reason: format!(
                "download failed after trying {} formats. Check that your network \
                 connection works, that the link is valid and has not expired, that the \
                 video is not region-locked, and whether the video requires login",
                self.selectors.len()
            ),
        })
    }
}

/// First finished download in `dir` named `<stem>.*` that is large enough.
/// Smaller leftovers are removed.
fn take_download(dir: &Path, stem: &str) -> Option<PathBuf> {
    let prefix = format!("{stem}.");
    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| {
                    name.starts_with(&prefix) && !name.ends_with(".part") && !name.ends_with(".ytdl")
                })
        })
        .collect();
    candidates.sort();

    let mut chosen = None;
    for path in candidates {
        let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        if chosen.is_none() && size >= MIN_DOWNLOAD_BYTES {
            chosen = Some(path);
        } else if size < MIN_DOWNLOAD_BYTES {
            let _ = fs::remove_file(&path);
        }
    }
    chosen
}
