//! In-process frame reading through FFmpeg.
//!
//! [`PixelReader`] opens a media file, seeks by time and decodes frames one at
//! a time into RGB [`Frame`]s. It is the pull-based reader behind both the
//! direct seek-and-read extraction strategy and the per-frame dump fallback.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::RgbImage;

use crate::error::GifClipError;
use crate::frame::Frame;
use crate::metadata::{StreamDescriptor, VideoInfo};
use crate::utilities::{file_stem, frame_to_buffer, pts_to_seconds, seconds_to_seek_timestamp};

/// Largest forward gap decoded through instead of seeking.
const FORWARD_DECODE_WINDOW: f64 = 1.0;

/// A decoder positioned somewhere in a video stream.
pub(crate) struct PixelReader {
    path: PathBuf,
    input: Input,
    decoder: VideoDecoder,
    scaler: ScalingContext,
    stream_index: usize,
    time_base: Rational,
    width: u32,
    height: u32,
    frames_per_second: f64,
    duration: f64,
    decoded: VideoFrame,
    rgb: VideoFrame,
    position: Option<f64>,
    eof_sent: bool,
    finished: bool,
}

impl PixelReader {
    /// Open `path` and prepare a decoder for its best video stream.
    pub(crate) fn open<P: AsRef<Path>>(path: P) -> Result<Self, GifClipError> {
        let path = path.as_ref().to_path_buf();
        let open_error = |reason: String| GifClipError::SourceUnavailable {
            location: path.display().to_string(),
            reason,
        };

        ffmpeg_next::init()
            .map_err(|error| open_error(format!("FFmpeg initialisation failed: {error}")))?;
        let input =
            ffmpeg_next::format::input(&path).map_err(|error| open_error(error.to_string()))?;

        let stream = input
            .streams()
            .best(Type::Video)
            .ok_or_else(|| open_error("no video stream".to_string()))?;
        let stream_index = stream.index();
        let time_base = stream.time_base();
        let frames_per_second = rate_to_f64(stream.avg_frame_rate())
            .or_else(|| rate_to_f64(stream.rate()))
            .unwrap_or(0.0);

        let decoder_context =
            CodecContext::from_parameters(stream.parameters()).map_err(|error| {
                open_error(format!("Failed to read video codec parameters: {error}"))
            })?;
        let decoder = decoder_context
            .decoder()
            .video()
            .map_err(|error| open_error(format!("Failed to create video decoder: {error}")))?;

        let (width, height) = (decoder.width(), decoder.height());
        if width == 0 || height == 0 {
            return Err(open_error("video stream reports zero dimensions".to_string()));
        }
        let scaler = ScalingContext::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            ScalingFlags::BILINEAR,
        )?;

        let duration = if input.duration() > 0 {
            input.duration() as f64 / f64::from(ffmpeg_next::ffi::AV_TIME_BASE)
        } else {
            0.0
        };

        Ok(Self {
            path,
            input,
            decoder,
            scaler,
            stream_index,
            time_base,
            width,
            height,
            frames_per_second,
            duration,
            decoded: VideoFrame::empty(),
            rgb: VideoFrame::empty(),
            position: None,
            eof_sent: false,
            finished: false,
        })
    }

    /// Metadata for the opened file. Title is the file stem.
    pub(crate) fn info(&self) -> VideoInfo {
        let codec = self
            .decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        VideoInfo {
            title: file_stem(&self.path),
            duration: (self.duration > 0.0).then_some(self.duration),
            uploader: "local file".to_string(),
            streams: vec![StreamDescriptor {
                width: self.width,
                height: self.height,
                frames_per_second: (self.frames_per_second > 0.0)
                    .then_some(self.frames_per_second),
                codec: Some(codec),
                container: self
                    .path
                    .extension()
                    .map(|ext| ext.to_string_lossy().to_lowercase()),
            }],
        }
    }

    /// Seek so the next decoded frame is the first one at or after `seconds`.
    pub(crate) fn seek(&mut self, seconds: f64) -> Result<(), GifClipError> {
        let target = seconds_to_seek_timestamp(seconds);
        self.input.seek(target, ..target)?;
        self.decoder.flush();
        self.position = None;
        self.eof_sent = false;
        self.finished = false;

        // Seeking lands on the preceding keyframe; decode up to the target.
        while let Some(frame) = self.peek_decode()? {
            if frame >= seconds - 1e-3 {
                return Ok(());
            }
            self.position = Some(frame);
            self.decoded = VideoFrame::empty();
        }
        Ok(())
    }

    /// The first frame at or after `seconds`.
    ///
    /// Decodes forward from the current position when the target is less
    /// than a second ahead, otherwise seeks.
    pub(crate) fn frame_at(&mut self, seconds: f64) -> Result<Option<Frame>, GifClipError> {
        let close_ahead = match self.position {
            Some(position) => seconds >= position && seconds - position <= FORWARD_DECODE_WINDOW,
            None => false,
        };
        if !close_ahead {
            self.seek(seconds)?;
        }

        loop {
            let Some(timestamp) = self.pending_or_decode()? else {
                return Ok(None);
            };
            if timestamp >= seconds - 1e-3 {
                return self.take_pending().map(Some);
            }
            self.position = Some(timestamp);
            self.decoded = VideoFrame::empty();
        }
    }

    fn has_pending(&self) -> bool {
        self.decoded.width() > 0
    }

    fn pending_or_decode(&mut self) -> Result<Option<f64>, GifClipError> {
        if self.has_pending() {
            return Ok(Some(self.pending_timestamp()));
        }
        self.peek_decode()
    }

    fn pending_timestamp(&self) -> f64 {
        let pts = self.decoded.timestamp().or(self.decoded.pts()).unwrap_or(0);
        pts_to_seconds(pts, self.time_base)
    }

    /// Decode until a frame is pending; returns its timestamp in seconds.
    fn peek_decode(&mut self) -> Result<Option<f64>, GifClipError> {
        loop {
            if self.finished {
                return Ok(None);
            }
            if self.decoder.receive_frame(&mut self.decoded).is_ok() {
                return Ok(Some(self.pending_timestamp()));
            }
            if self.eof_sent {
                self.finished = true;
                self.decoded = VideoFrame::empty();
                return Ok(None);
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input) {
                Ok(()) => {
                    if packet.stream() == self.stream_index {
                        self.decoder.send_packet(&packet)?;
                    }
                }
                Err(FfmpegError::Eof) => {
                    self.decoder.send_eof()?;
                    self.eof_sent = true;
                }
                Err(_) => {
                    // Non-fatal read error; try the next packet.
                }
            }
        }
    }

    fn take_pending(&mut self) -> Result<Frame, GifClipError> {
        let timestamp = self.pending_timestamp();
        self.scaler.run(&self.decoded, &mut self.rgb)?;
        self.decoded = VideoFrame::empty();
        self.position = Some(timestamp);

        let buffer = frame_to_buffer(&self.rgb, self.width, self.height, 3);
        let image = RgbImage::from_raw(self.width, self.height, buffer).ok_or_else(|| {
            GifClipError::ExtractionFailed(
                "Failed to construct RGB image from decoded frame data".to_string(),
            )
        })?;
        Ok(Frame::new(image, Duration::from_secs_f64(timestamp.max(0.0))))
    }
}

fn rate_to_f64(rate: Rational) -> Option<f64> {
    if rate.denominator() != 0 && rate.numerator() > 0 {
        Some(f64::from(rate.numerator()) / f64::from(rate.denominator()))
    } else {
        None
    }
}
