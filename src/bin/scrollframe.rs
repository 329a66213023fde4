use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use scrollframe::{
    DecodeStrategy, ExtractOptions, FfmpegDecoder, FfmpegLogLevel, ProgressCallback, ProgressInfo,
    RunState, ScrollVideo, Surface, VideoSource, configuration, extract,
};

const CLI_AFTER_HELP: &str = "Examples:\n  scrollframe probe hero.mp4 --json\n  scrollframe extract hero.mp4 --out frames --max-frames 60 --progress\n  scrollframe render hero.mp4 --out frame.png --scroll 0.5 --width 1280 --height 720 --dpr 2\n  scrollframe completions zsh > _scrollframe";

#[derive(Debug, Parser)]
#[command(
    name = "scrollframe",
    version,
    about = "Sample videos into frames and render the frame a scroll position selects",
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
    /// Print per-frame and per-render details to stderr.
    ///
    /// Only affects this tool's own output; FFmpeg noise is set with
    /// --log-level.
    #[arg(long)]
    verbose: bool,

    /// Show a progress bar while frames are decoded.
    #[arg(long)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long)]
    overwrite: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Debug, Parser, Clone)]
struct SamplingOptions {
    /// Maximum number of frames to sample.
    #[arg(long, default_value_t = configuration::DEFAULT_MAX_FRAMES)]
    max_frames: usize,

    /// Nominal frame rate used to spread samples over the video.
    #[arg(long, default_value_t = configuration::DEFAULT_BASE_FPS)]
    base_fps: f64,

    /// Maximum raster width in pixels.
    #[arg(long, default_value_t = configuration::DEFAULT_MAX_WIDTH)]
    max_width: u32,

    /// Maximum raster height in pixels.
    #[arg(long, default_value_t = configuration::DEFAULT_MAX_HEIGHT)]
    max_height: u32,

    /// How to reach each sample: seek | sequential.
    #[arg(long, default_value = "seek")]
    strategy: String,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print video metadata.
    #[command(
        about = "Print video metadata",
        visible_alias = "info",
        after_help = "Examples:\n  scrollframe probe hero.mp4\n  scrollframe probe https://example.com/hero.mp4 --json"
    )]
    Probe {
        /// Input video path or URL.
        input: String,

        /// Output metadata as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Decode the sampled frames into an output directory.
    #[command(
        about = "Extract sampled frames",
        after_help = "Examples:\n  scrollframe extract hero.mp4 --out frames\n  scrollframe extract hero.mp4 --out frames --max-frames 120 --strategy sequential --ext jpg"
    )]
    Extract {
        /// Input video path or URL.
        input: String,
        /// Output directory for frame images.
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        sampling: SamplingOptions,
        /// Output image extension (png, jpg, jpeg, bmp, tiff).
        #[arg(long, default_value = "png")]
        ext: String,
    },

    /// Render the frame selected by a scroll position onto a surface.
    #[command(
        about = "Render one scroll position",
        after_help = "Examples:\n  scrollframe render hero.mp4 --out half.png --scroll 0.5\n  scrollframe render hero.mp4 --out retina.png --scroll 0.25 --width 390 --height 844 --dpr 3"
    )]
    Render {
        /// Input video path or URL.
        input: String,
        /// Output image path.
        #[arg(long)]
        out: PathBuf,
        /// Scroll progress, clamped to [0, 1].
        #[arg(long)]
        scroll: f64,
        /// Surface width in logical pixels.
        #[arg(long, default_value_t = 1280.0)]
        width: f64,
        /// Surface height in logical pixels.
        #[arg(long, default_value_t = 720.0)]
        height: f64,
        /// Device pixel ratio.
        #[arg(long, default_value_t = 1.0)]
        dpr: f64,
        #[command(flatten)]
        sampling: SamplingOptions,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_strategy(value: &str) -> Option<DecodeStrategy> {
    match value.to_ascii_lowercase().as_str() {
        "seek" => Some(DecodeStrategy::Seek),
        "sequential" | "seq" | "linear" => Some(DecodeStrategy::Sequential),
        _ => None,
    }
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

fn extract_options(
    global: &GlobalOptions,
    sampling: &SamplingOptions,
) -> Result<(ExtractOptions, Option<ProgressBar>), Box<dyn std::error::Error>> {
    let strategy = parse_strategy(&sampling.strategy)
        .ok_or(format!("unsupported --strategy: {}", sampling.strategy))?;

    let mut options = ExtractOptions::new()
        .with_max_frames(sampling.max_frames)
        .with_base_fps(sampling.base_fps)
        .with_bounds(sampling.max_width, sampling.max_height)
        .with_strategy(strategy);
    options.validate()?;

    let progress_bar = if global.progress {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos:>3}% {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        options = options.with_progress(Arc::new(TerminalProgress { bar: bar.clone() }));
        Some(bar)
    } else {
        None
    };

    Ok((options, progress_bar))
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(level) = &global.log_level {
        let parsed: FfmpegLogLevel = level.parse()?;
        scrollframe::set_ffmpeg_log_level(parsed);
    }
    Ok(())
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.bar.set_position(u64::from(info.percent));
        self.bar.set_message(format!("{}/{} frames", info.frames, info.budget));
    }
}

fn finish_progress(progress_bar: Option<ProgressBar>, state: RunState) {
    if let Some(bar) = progress_bar {
        match state {
            RunState::Complete => bar.finish_with_message("done"),
            _ => bar.abandon_with_message(format!("{state:?}").to_ascii_lowercase()),
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Probe { input, json } => {
            let metadata = VideoSource::probe(input.as_str())?;
            if json {
                let payload = json!({
                    "locator": input,
                    "duration_seconds": metadata.duration.as_secs_f64(),
                    "width": metadata.width,
                    "height": metadata.height,
                    "fps": metadata.frames_per_second,
                    "frame_count": metadata.frame_count,
                    "codec": metadata.codec,
                    "aspect_ratio": metadata.aspect_ratio(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Duration: {:?}", metadata.duration);
                println!(
                    "Video: {}x{} @ {:.2} fps [{}]",
                    metadata.width, metadata.height, metadata.frames_per_second, metadata.codec,
                );
                println!("Frames: ~{}", metadata.frame_count);
            }
        }
        Commands::Extract {
            input,
            out,
            sampling,
            ext,
        } => {
            if out.exists() {
                if !cli.global.overwrite {
                    return Err(format!(
                        "output directory already exists: {} (use --overwrite)",
                        out.display()
                    )
                    .into());
                }
                eprintln!(
                    "{} {}",
                    "warning:".yellow().bold(),
                    format!("writing into existing directory {}", out.display()).yellow()
                );
            }
            fs::create_dir_all(&out)?;

            let (options, progress_bar) = extract_options(&cli.global, &sampling)?;
            let decoder = FfmpegDecoder::open(input.as_str(), options.strategy())?;
            let ext_clean = ext.trim_start_matches('.').to_ascii_lowercase();

            let mut run = extract(decoder, &options);
            let mut written = 0_usize;
            for frame in run.by_ref() {
                let frame = frame?;
                let output_path = out.join(format!("frame_{written:04}.{ext_clean}"));
                frame.image().save(&output_path)?;
                if cli.global.verbose {
                    eprintln!(
                        "saved sample {} ({:.3}s) -> {}",
                        frame.sample_index(),
                        frame.timestamp().as_secs_f64(),
                        output_path.display()
                    );
                }
                written += 1;
            }

            let outcome = run.outcome();
            finish_progress(progress_bar, outcome.state);
            if outcome.skipped > 0 {
                eprintln!(
                    "{} {}",
                    "warning:".yellow().bold(),
                    format!("{} sample(s) failed to decode and were skipped", outcome.skipped).yellow()
                );
            }
            println!(
                "{} {}",
                "success:".green().bold(),
                format!("Extracted {written} frame(s) to {}", out.display()).green()
            );
        }
        Commands::Render {
            input,
            out,
            scroll,
            width,
            height,
            dpr,
            sampling,
        } => {
            ensure_writable_path(&out, cli.global.overwrite)?;
            let (options, progress_bar) = extract_options(&cli.global, &sampling)?;
            let decoder = FfmpegDecoder::open(input.as_str(), options.strategy())?;

            let mut video = ScrollVideo::new(Surface::new(width, height, dpr));
            let outcome = video.load_blocking(decoder, options)?;
            finish_progress(progress_bar, outcome.state);

            let index = video
                .set_scroll_progress(scroll)
                .ok_or("no frames could be decoded from the input")?;
            video.canvas().save(&out)?;

            if cli.global.verbose {
                let (canvas_width, canvas_height) = video.canvas().dimensions();
                eprintln!(
                    "scroll {scroll:.3} -> frame {index} of {} on a {canvas_width}x{canvas_height} canvas",
                    video.frame_count()
                );
            }
            println!("{} {}", "saved".green().bold(), out.display());
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "scrollframe", &mut std::io::stdout());
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
