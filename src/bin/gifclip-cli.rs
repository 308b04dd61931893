use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use gifclip::{
    CompressionSummary, ConversionJob, ConversionParams, JobOptions, JobOutcome, MediaSource,
    ProgressEvent, ProgressSink, Quality, Session, Stage, Tier, VideoInfo, looks_like_url,
    recommend, validate_params,
};

const CLI_AFTER_HELP: &str = "Examples:\n  gifclip info input.mp4 --json\n  gifclip recommend https://example.com/watch?v=abc --start 5 --end 11\n  gifclip convert input.mp4 --start 0:12 --end 0:18 --tier recommended --progress\n  gifclip completions zsh > _gifclip";

#[derive(Debug, Parser)]
#[command(
    name = "gifclip",
    version,
    about = "Turn a time range of a video into an optimized animated GIF",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Decoder log level (quiet, fatal, error, warning, info, debug).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Seconds before an external frame extractor is killed.
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Directory for downloads and temporary frames.
    #[arg(long, global = true)]
    scratch_dir: Option<PathBuf>,

    /// Downloader used for URLs (default: yt-dlp on PATH).
    #[arg(long, global = true)]
    downloader: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TierArg {
    Best,
    Recommended,
    Standard,
    Small,
}

impl From<TierArg> for Tier {
    fn from(value: TierArg) -> Self {
        match value {
            TierArg::Best => Tier::Best,
            TierArg::Recommended => Tier::Recommended,
            TierArg::Standard => Tier::Standard,
            TierArg::Small => Tier::Small,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum QualityArg {
    High,
    Medium,
    Low,
}

impl From<QualityArg> for Quality {
    fn from(value: QualityArg) -> Self {
        match value {
            QualityArg::High => Quality::High,
            QualityArg::Medium => Quality::Medium,
            QualityArg::Low => Quality::Low,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print video metadata (alias: probe).
    #[command(visible_alias = "probe")]
    Info {
        /// Local path or video URL.
        input: String,

        /// Output metadata as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// List recommended output sizes for a clip.
    Recommend {
        /// Local path or video URL.
        input: String,
        /// Clip start (seconds, MM:SS or HH:MM:SS).
        #[arg(long, default_value = "0")]
        start: String,
        /// Clip end; defaults to ten seconds after the start (or the rest of a shorter video).
        #[arg(long)]
        end: Option<String>,
        /// Output frame rate.
        #[arg(long, default_value_t = 10)]
        fps: u32,
        /// Output as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Convert a clip to an animated GIF.
    #[command(
        after_help = "Examples:\n  gifclip convert input.mp4 --start 5 --end 9 --width 480 --height 270\n  gifclip convert https://example.com/watch?v=abc --end 6 --tier small --no-watermark"
    )]
    Convert {
        /// Local path or video URL.
        input: String,
        /// Clip start (seconds, MM:SS or HH:MM:SS).
        #[arg(long, default_value = "0")]
        start: String,
        /// Clip end; defaults to ten seconds after the start (or the rest of a shorter video).
        #[arg(long)]
        end: Option<String>,
        /// Output width in pixels.
        #[arg(long, requires = "height", conflicts_with = "tier")]
        width: Option<u32>,
        /// Output height in pixels.
        #[arg(long, requires = "width", conflicts_with = "tier")]
        height: Option<u32>,
        /// Pick size and palette from a recommendation tier.
        #[arg(long, value_enum)]
        tier: Option<TierArg>,
        /// Output frame rate (1-60).
        #[arg(long, default_value_t = 10)]
        fps: u32,
        /// Palette size (64, 96, 128, 192 or 256).
        #[arg(long, conflicts_with = "quality")]
        colors: Option<u32>,
        /// Palette preset.
        #[arg(long, value_enum)]
        quality: Option<QualityArg>,
        /// Directory for the finished GIF.
        #[arg(long, default_value = "output")]
        out: PathBuf,
        /// Output title used in the file name.
        #[arg(long)]
        title: Option<String>,
        /// Keep letterbox bars.
        #[arg(long)]
        no_borders: bool,
        /// Keep corner watermarks.
        #[arg(long)]
        no_watermark: bool,
        /// Show a progress bar.
        #[arg(long)]
        progress: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_timecode(value: &str) -> Result<f64, Box<dyn std::error::Error>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("time value cannot be empty".into());
    }

    if let Ok(seconds) = trimmed.parse::<f64>() {
        return Ok(seconds);
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return Err(format!("invalid time format: {trimmed}").into());
    }

    let (hours, minutes, seconds_str) = if parts.len() == 3 {
        (parts[0].parse::<u64>()?, parts[1].parse::<u64>()?, parts[2])
    } else {
        (0_u64, parts[0].parse::<u64>()?, parts[1])
    };

    let seconds = seconds_str.parse::<f64>()?;
    Ok((hours as f64 * 3600.0) + (minutes as f64 * 60.0) + seconds)
}

fn parse_source(input: &str) -> MediaSource {
    if looks_like_url(input) {
        MediaSource::Remote(input.to_string())
    } else {
        MediaSource::Local(PathBuf::from(input))
    }
}

#[cfg(feature = "pixel")]
fn parse_log_level(value: &str) -> Option<gifclip::FfmpegLogLevel> {
    use gifclip::FfmpegLogLevel;

    match value.to_ascii_lowercase().as_str() {
        "quiet" => Some(FfmpegLogLevel::Quiet),
        "fatal" => Some(FfmpegLogLevel::Fatal),
        "error" => Some(FfmpegLogLevel::Error),
        "warning" | "warn" => Some(FfmpegLogLevel::Warning),
        "info" => Some(FfmpegLogLevel::Info),
        "debug" => Some(FfmpegLogLevel::Debug),
        _ => None,
    }
}

fn init_logging(global: &GlobalOptions) {
    let default_filter = if global.verbose {
        "gifclip=debug"
    } else {
        "gifclip=warn"
    };
    let _ = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn apply_global_options(global: &GlobalOptions) -> Result<JobOptions, Box<dyn std::error::Error>> {
    init_logging(global);

    #[cfg(feature = "pixel")]
    {
        let level = match &global.log_level {
            Some(level) => {
                parse_log_level(level).ok_or(format!("unsupported --log-level: {level}"))?
            }
            None => gifclip::FfmpegLogLevel::from_filter(if global.verbose {
                log::LevelFilter::Debug
            } else {
                log::LevelFilter::Warn
            }),
        };
        gifclip::set_ffmpeg_log_level(level);
    }

    #[cfg(not(feature = "pixel"))]
    if global.log_level.is_some() {
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            "--log-level requires building with the `pixel` feature".yellow()
        );
    }

    let mut options = JobOptions::new();
    if let Some(seconds) = global.timeout {
        options = options.with_extractor_timeout(Duration::from_secs(seconds.max(1)));
    }
    if let Some(dir) = &global.scratch_dir {
        options = options.with_scratch_dir(dir);
    }
    if let Some(binary) = &global.downloader {
        options = options.with_downloader_binary(binary);
    }
    Ok(options)
}

fn fetch_info(
    source: &MediaSource,
    options: &JobOptions,
) -> Result<VideoInfo, Box<dyn std::error::Error>> {
    let info = Session::with_options(options.clone())
        .fetch_info(source)
        .wait()?;
    Ok(info)
}

fn resolve_end(
    end: Option<&str>,
    info: Option<&VideoInfo>,
    start: f64,
) -> Result<f64, Box<dyn std::error::Error>> {
    match end {
        Some(end) => parse_timecode(end),
        None => Ok(start + info.map_or(10.0, VideoInfo::suggested_end_time)),
    }
}

/// Terminal progress: a spinner while resolving, a bar while extracting.
struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new(expected_frames: u64) -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(expected_frames);
        let style =
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        bar.enable_steady_tick(Duration::from_millis(120));
        Ok(Self { bar })
    }
}

impl ProgressSink for TerminalProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        self.bar.set_message(event.message.clone());
        if let Some(frames) = event.frames {
            if event.stage == Stage::Extracting {
                self.bar.set_position(frames);
            }
        }
        if event.stage == Stage::Finished {
            self.bar.finish_and_clear();
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let options = apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Info { input, json } => {
            let source = parse_source(&input);
            let info = fetch_info(&source, &options)?;
            let best = info.best_stream();
            if json {
                let payload = json!({
                    "title": info.title,
                    "uploader": info.uploader,
                    "duration_seconds": info.duration,
                    "best_stream": best.map(|stream| json!({
                        "width": stream.width,
                        "height": stream.height,
                        "fps": stream.frames_per_second,
                        "codec": stream.codec,
                        "container": stream.container,
                    })),
                    "stream_count": info.streams.len(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("{} {}", "Title:".bold(), info.title);
                println!("{} {}", "Uploader:".bold(), info.uploader);
                match info.duration {
                    Some(duration) => println!("{} {duration:.2}s", "Duration:".bold()),
                    None => println!("{} unknown", "Duration:".bold()),
                }
                if let Some(stream) = best {
                    println!(
                        "{} {}x{} @ {}",
                        "Video:".bold(),
                        stream.width,
                        stream.height,
                        stream
                            .frames_per_second
                            .map_or_else(|| "? fps".to_string(), |fps| format!("{fps:.2} fps")),
                    );
                } else {
                    println!("{} {}", "Video:".bold(), "no video stream".yellow());
                }
            }
        }
        Commands::Recommend {
            input,
            start,
            end,
            fps,
            json,
        } => {
            let source = parse_source(&input);
            let info = fetch_info(&source, &options)?;
            let stream = info
                .best_stream()
                .ok_or("the source has no video stream")?
                .clone();
            let start = parse_timecode(&start)?;
            let end = resolve_end(end.as_deref(), Some(&info), start)?;
            let candidates = recommend(stream.width, stream.height, end - start, fps);

            if json {
                let payload: Vec<_> = candidates
                    .iter()
                    .map(|rec| {
                        json!({
                            "tier": rec.tier.label(),
                            "width": rec.width,
                            "height": rec.height,
                            "palette_size": rec.palette_size,
                            "estimated_mb": rec.estimated_mb(),
                            "compression_ratio": rec.compression_ratio,
                            "default": rec.is_default,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!(
                    "Source {}x{}, {:.1}s @ {fps} fps",
                    stream.width,
                    stream.height,
                    end - start
                );
                for rec in &candidates {
                    let line = format!(
                        "{:<12} {:>4}x{:<4} {:>3} colors  ~{:.2} MB  ({:.0}% of source)",
                        rec.tier.label(),
                        rec.width,
                        rec.height,
                        rec.palette_size,
                        rec.estimated_mb(),
                        rec.compression_ratio * 100.0,
                    );
                    if rec.is_default {
                        println!("{} {}", "*".green().bold(), line.green());
                    } else {
                        println!("  {line}");
                    }
                }
            }
        }
        Commands::Convert {
            input,
            start,
            end,
            width,
            height,
            tier,
            fps,
            colors,
            quality,
            out,
            title,
            no_borders,
            no_watermark,
            progress,
        } => {
            let source = parse_source(&input);
            let start = parse_timecode(&start)?;

            let needs_info =
                end.is_none() || tier.is_some() || (title.is_none() && !source.is_local());
            let info = if needs_info {
                Some(fetch_info(&source, &options)?)
            } else {
                None
            };
            let end = resolve_end(end.as_deref(), info.as_ref(), start)?;

            let mut params = match &source {
                MediaSource::Local(path) => ConversionParams::local(path),
                MediaSource::Remote(url) => ConversionParams::remote(url.clone()),
            }
            .with_time_range(start, end)
            .with_fps(fps)
            .with_output_dir(&out)
            .with_border_removal(!no_borders)
            .with_watermark_removal(!no_watermark);

            if let (Some(width), Some(height)) = (width, height) {
                params = params.with_resolution(width, height);
            }

            if let Some(tier) = tier {
                let tier = Tier::from(tier);
                let stream = info
                    .as_ref()
                    .and_then(VideoInfo::best_stream)
                    .ok_or("the source has no video stream")?;
                let rec = recommend(stream.width, stream.height, end - start, fps)
                    .into_iter()
                    .find(|rec| rec.tier == tier)
                    .ok_or(format!("no {tier} recommendation for this source"))?;
                params = params
                    .with_resolution(rec.width, rec.height)
                    .with_palette_size(rec.palette_size);

                if let Some(summary) =
                    CompressionSummary::new(rec.width, rec.height, stream.width, stream.height)
                {
                    eprintln!("{} {summary}", "size:".cyan().bold());
                }
            }

            if let Some(colors) = colors {
                params = params.with_palette_size(colors);
            } else if let Some(quality) = quality {
                params = params.with_quality(quality.into());
            }

            if let Some(title) = title.or_else(|| info.as_ref().map(|info| info.title.clone())) {
                params = params.with_title(title);
            }

            let report = validate_params(&params);
            for warning in &report.warnings {
                eprintln!("{} {}", "warning:".yellow().bold(), warning.yellow());
            }
            if cli.global.verbose {
                for item in &report.info {
                    eprintln!("{} {item}", "info:".cyan().bold());
                }
            }
            report.into_result()?;

            let mut job = ConversionJob::new(params.clone(), options);
            if progress {
                let sink = TerminalProgress::new(params.expected_frames())?;
                job = job.with_progress(Arc::new(sink));
            }

            match job.run() {
                JobOutcome::Completed {
                    output,
                    frames,
                    bytes,
                } => {
                    println!(
                        "{} {} ({frames} frames, {:.2} MB)",
                        "wrote".green().bold(),
                        output.display(),
                        gifclip::bytes_to_megabytes(bytes as f64),
                    );
                }
                JobOutcome::Cancelled => return Err("conversion cancelled".into()),
                JobOutcome::Failed { stage, error } => {
                    return Err(format!("{stage} failed: {error}").into());
                }
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "gifclip", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_source, parse_timecode};
    use gifclip::MediaSource;

    #[test]
    fn parse_timecode_formats() {
        assert_eq!(parse_timecode("75").unwrap(), 75.0);
        assert_eq!(parse_timecode("01:15").unwrap(), 75.0);
        assert_eq!(parse_timecode("00:01:15.5").unwrap(), 75.5);
        assert!(parse_timecode("").is_err());
        assert!(parse_timecode("1:2:3:4").is_err());
    }

    #[test]
    fn parse_source_detects_links() {
        assert!(matches!(
            parse_source("https://example.com/watch?v=abc"),
            MediaSource::Remote(_)
        ));
        assert!(matches!(parse_source("clips/input.mp4"), MediaSource::Local(_)));
    }
}
