use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use subplace::{
    DebugFrameWriter, FfmpegLogLevel, FontRenderer, NoOpDetector, ObstructionStrategy,
    OverlayOptions, OverlayPipeline, OverlaySummary, PlacementPolicy, ProgressCallback,
    ProgressInfo, TesseractDetector, VideoCodec, VideoWriterOptions,
};

const CLI_AFTER_HELP: &str = "Examples:\n  subplace burn input.mp4 input.srt --out output.mp4 --font DejaVuSans.ttf --progress\n  subplace analyze input.mp4 input.srt --font DejaVuSans.ttf --json\n  subplace completions zsh > _subplace";

#[derive(Debug, Parser)]
#[command(
    name = "subplace",
    version,
    about = "Burn subtitles into video, moving them clear of on-screen text",
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

    /// Show a progress bar.
    #[arg(long, global = true)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long, global = true)]
    overwrite: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,
}

/// Settings shared by every command that places subtitles.
#[derive(Debug, Args, Clone)]
struct PlacementArgs {
    /// Font file used to measure and draw subtitles.
    #[arg(long)]
    font: PathBuf,

    /// JSON file with overlay options; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Default distance in pixels between the frame bottom and the subtitle.
    #[arg(long)]
    offset: Option<i32>,

    /// Obstruction strategy: threshold | overlap.
    #[arg(long)]
    strategy: Option<String>,

    /// Frames a cue is sampled for before its offset is frozen.
    #[arg(long)]
    window: Option<u32>,

    /// Font size in pixels.
    #[arg(long)]
    font_size: Option<f32>,

    /// Background box opacity, 0 to 1.
    #[arg(long)]
    opacity: Option<f32>,

    /// Text colour as #RRGGBB or r,g,b.
    #[arg(long)]
    text_color: Option<String>,

    /// Background colour as #RRGGBB or r,g,b.
    #[arg(long)]
    background_color: Option<String>,

    /// Skip text detection and always use the default offset.
    #[arg(long)]
    no_detect: bool,

    /// Tesseract executable.
    #[arg(long, default_value = "tesseract")]
    tesseract: String,

    /// Tesseract language code.
    #[arg(long, default_value = "eng")]
    lang: String,

    /// Write annotated frames for every placement decision into this directory.
    #[arg(long)]
    debug_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Burn subtitles into a video.
    #[command(
        about = "Burn subtitles into a video",
        after_help = "Examples:\n  subplace burn input.mp4 input.srt --out output.mp4 --font DejaVuSans.ttf\n  subplace burn input.mp4 input.srt --out output.mkv --font DejaVuSans.ttf --strategy overlap --debug-dir debug"
    )]
    Burn {
        /// Input video path.
        input: PathBuf,
        /// SRT subtitle file.
        subtitles: PathBuf,
        /// Output video path; the container follows the extension.
        #[arg(long)]
        out: PathBuf,
        /// Output codec: h264 | h265 | mpeg4.
        #[arg(long, default_value = "h264")]
        codec: String,
        /// Constant Rate Factor for H.264/H.265.
        #[arg(long)]
        crf: Option<u32>,
        #[command(flatten)]
        placement: PlacementArgs,
    },

    /// Report where each cue would be placed without writing video.
    #[command(
        about = "Compute subtitle placements",
        after_help = "Examples:\n  subplace analyze input.mp4 input.srt --font DejaVuSans.ttf\n  subplace analyze input.mp4 input.srt --font DejaVuSans.ttf --json"
    )]
    Analyze {
        /// Input video path.
        input: PathBuf,
        /// SRT subtitle file.
        subtitles: PathBuf,
        /// Output placements as machine-readable JSON.
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        placement: PlacementArgs,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_strategy(value: &str) -> Option<ObstructionStrategy> {
    match value.to_ascii_lowercase().as_str() {
        "threshold" | "bump" => Some(ObstructionStrategy::Threshold),
        "overlap" | "reposition" => Some(ObstructionStrategy::Overlap),
        _ => None,
    }
}

fn parse_codec(value: &str) -> Option<VideoCodec> {
    match value.to_ascii_lowercase().as_str() {
        "h264" | "avc" => Some(VideoCodec::H264),
        "h265" | "hevc" => Some(VideoCodec::H265),
        "mpeg4" => Some(VideoCodec::Mpeg4),
        _ => None,
    }
}

fn parse_color(value: &str) -> Option<[u8; 3]> {
    if let Some(hex) = value.strip_prefix('#') {
        if hex.len() != 6 {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(hex.get(range)?, 16).ok();
        return Some([channel(0..2)?, channel(2..4)?, channel(4..6)?]);
    }

    let channels: Vec<u8> = value
        .split(',')
        .map(|part| part.trim().parse().ok())
        .collect::<Option<_>>()?;
    channels.try_into().ok()
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    let default_filter = if global.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Some(level) = &global.log_level {
        let parsed: FfmpegLogLevel = level
            .parse()
            .map_err(|_| format!("unsupported --log-level: {level}"))?;
        subplace::set_ffmpeg_log_level(parsed);
    } else if global.progress {
        subplace::set_ffmpeg_log_level(FfmpegLogLevel::Error);
    }

    Ok(())
}

fn overlay_options(args: &PlacementArgs) -> Result<OverlayOptions, Box<dyn std::error::Error>> {
    let mut options = match &args.config {
        Some(path) => OverlayOptions::from_json_file(path)?,
        None => OverlayOptions::new(),
    };

    if let Some(offset) = args.offset {
        options = options.with_default_y_offset(offset);
    }
    if let Some(strategy) = &args.strategy {
        let parsed = parse_strategy(strategy).ok_or(format!("unsupported --strategy: {strategy}"))?;
        options = options.with_strategy(parsed);
    }
    if let Some(window) = args.window {
        options = options.with_sampling_window_frames(window);
    }
    if let Some(size) = args.font_size {
        options = options.with_font_size(size);
    }
    if let Some(opacity) = args.opacity {
        options = options.with_background_opacity(opacity);
    }
    if let Some(color) = &args.text_color {
        let parsed = parse_color(color).ok_or(format!("unsupported --text-color: {color}"))?;
        options = options.with_text_color(parsed);
    }
    if let Some(color) = &args.background_color {
        let parsed =
            parse_color(color).ok_or(format!("unsupported --background-color: {color}"))?;
        options = options.with_background_color(parsed);
    }

    options.validate()?;
    Ok(options)
}

fn placement_policy(
    args: &PlacementArgs,
    options: &OverlayOptions,
) -> Result<PlacementPolicy, Box<dyn std::error::Error>> {
    let policy = if args.no_detect {
        PlacementPolicy::new(NoOpDetector, options)
    } else {
        let detector = TesseractDetector::new()
            .with_executable(args.tesseract.as_str())
            .with_language(args.lang.as_str());
        if !detector.is_available() {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("{} not found, subtitles keep the default offset", args.tesseract).yellow()
            );
        }
        PlacementPolicy::new(detector, options)
    };

    Ok(match &args.debug_dir {
        Some(directory) => policy.with_observer(DebugFrameWriter::new(directory)?),
        None => policy,
    })
}

fn build_pipeline(
    global: &GlobalOptions,
    options: OverlayOptions,
) -> Result<(OverlayPipeline, Option<ProgressBar>), Box<dyn std::error::Error>> {
    let mut pipeline = OverlayPipeline::new().with_options(options);
    let progress_bar = if global.progress {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.green} {bar:40.cyan/blue} {pos}/{len} frames {msg}",
        )?;
        bar.set_style(style.progress_chars("##-"));
        pipeline = pipeline
            .with_progress(Arc::new(TerminalProgress { bar: bar.clone() }))
            .with_batch_size(10);
        Some(bar)
    } else {
        None
    };
    Ok((pipeline, progress_bar))
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Some(total) = info.total {
            self.bar.set_length(total.max(info.current));
        }
        self.bar.set_position(info.current);
    }
}

fn print_placements(summary: &OverlaySummary) {
    for placement in &summary.placements {
        let offset = match placement.y_offset {
            Some(offset) => format!("{offset:>5}px").normal(),
            None => "    -".dimmed(),
        };
        println!(
            "{:>5}  {:>9.3}s  {}  {}",
            placement.cue_index, placement.start_seconds, offset, placement.text
        );
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Burn {
            input,
            subtitles,
            out,
            codec,
            crf,
            placement,
        } => {
            ensure_writable_path(&out, cli.global.overwrite)?;

            let codec_choice = parse_codec(&codec).ok_or(format!("unsupported --codec: {codec}"))?;
            let mut writer_options = VideoWriterOptions::default().with_codec(codec_choice);
            if let Some(crf) = crf {
                writer_options = writer_options.with_crf(crf);
            }

            let options = overlay_options(&placement)?;
            let policy = placement_policy(&placement, &options)?;
            let renderer = FontRenderer::from_file(&placement.font)?;
            let (pipeline, progress_bar) = build_pipeline(&cli.global, options)?;

            let summary = pipeline.burn(
                &input,
                &subtitles,
                &out,
                policy,
                &renderer,
                &writer_options,
            )?;

            if let Some(bar) = progress_bar {
                bar.finish_with_message("done");
            }

            println!(
                "{} {}",
                "success:".green().bold(),
                format!(
                    "Wrote {} frame(s) to {} ({} detector run(s))",
                    summary.frames_processed,
                    out.display(),
                    summary.detection_runs
                )
                .green()
            );
            if cli.global.verbose {
                print_placements(&summary);
            }
        }
        Commands::Analyze {
            input,
            subtitles,
            json,
            placement,
        } => {
            let options = overlay_options(&placement)?;
            let policy = placement_policy(&placement, &options)?;
            let renderer = FontRenderer::from_file(&placement.font)?;
            let strategy = options.strategy;
            let (pipeline, progress_bar) = build_pipeline(&cli.global, options)?;

            let summary = pipeline.analyze(&input, &subtitles, policy, &renderer)?;

            if let Some(bar) = progress_bar {
                bar.finish_and_clear();
            }

            if json {
                let payload = json!({
                    "input": input.display().to_string(),
                    "strategy": strategy,
                    "frames_processed": summary.frames_processed,
                    "frames_with_subtitles": summary.frames_with_subtitles,
                    "detection_runs": summary.detection_runs,
                    "placements": summary.placements,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!(
                    "{} frame(s), {} with subtitles, {} detector run(s)",
                    summary.frames_processed, summary.frames_with_subtitles, summary.detection_runs
                );
                print_placements(&summary);
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "subplace", &mut std::io::stdout());
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
