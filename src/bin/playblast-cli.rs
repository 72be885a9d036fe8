use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use playblast::{
    CommandArguments, FailurePolicy, FrameOutcome, HeadlessHost, Playblast, ProgressCallback, ProgressInfo,
    RasterFormat, SYNTAX,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

const CLI_AFTER_HELP: &str = "Examples:\n  playblast-cli capture -- -f shots/out -sf 1 -ef 24\n  playblast-cli capture --raster-format rgba16f --resolution 1920x1080 --progress -- -f shots/out -sf 1001 -ef 1100 -uo\n  playblast-cli formats --json\n  playblast-cli completions zsh > _playblast-cli";

#[derive(Debug, Parser)]
#[command(
    name = "playblast-cli",
    version,
    about = "Capture viewport frame ranges to image files",
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
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the capture command against an offscreen viewport.
    #[command(
        about = "Capture a frame range",
        after_help = "Command flags (after --):\n  -f  / -filename   output path stem (required)\n  -sf / -startFrame first frame (default 0)\n  -ef / -endFrame   last frame, inclusive (default 1)\n  -is / -imageSize  output width and height\n  -uo / -useOIIO    use the external image writer"
    )]
    Capture {
        /// Raster format the offscreen renderer produces (e.g. rgba8, bgra8, rgba16f, rgb32f, rgba32f).
        #[arg(long, default_value = "rgba8")]
        raster_format: RasterFormat,

        /// Viewport size as WIDTHxHEIGHT.
        #[arg(long, value_parser = parse_resolution, default_value = "640x360")]
        resolution: (u32, u32),

        /// Stop at the first frame that could not be written.
        #[arg(long)]
        abort_on_error: bool,

        /// Show a progress bar.
        #[arg(long)]
        progress: bool,

        /// Log every render pass the capture sees (needs --verbose).
        #[arg(long)]
        trace_passes: bool,

        /// Print the capture report as JSON.
        #[arg(long)]
        json: bool,

        /// Capture command flags.
        #[arg(last = true, allow_hyphen_values = true)]
        flags: Vec<String>,
    },

    /// Print the raster format table.
    #[command(about = "List raster formats and how they are written")]
    Formats {
        /// Output as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_resolution(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {value}"))?;
    let width = width.trim().parse::<u32>().map_err(|error| error.to_string())?;
    let height = height.trim().parse::<u32>().map_err(|error| error.to_string())?;
    if width == 0 || height == 0 {
        return Err("resolution must be non-zero".to_string());
    }
    Ok((width, height))
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

struct BarProgress {
    bar: ProgressBar,
}

impl ProgressCallback for BarProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.bar.set_position(info.current);
        if let Some(time) = info.current_time {
            self.bar.set_message(format!("frame {time}"));
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    match cli.command {
        Commands::Capture {
            raster_format,
            resolution,
            abort_on_error,
            progress,
            trace_passes,
            json,
            flags,
        } => {
            let mut config = CommandArguments::parse(&flags)?
                .resolve()?
                .with_pass_tracing(trace_passes);
            if abort_on_error {
                config = config.with_failure_policy(FailurePolicy::Abort);
            }

            let progress_bar = if progress {
                let bar = ProgressBar::new(config.frame_count());
                let style = ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
                bar.set_style(style.progress_chars("##-"));
                config = config.with_progress(Arc::new(BarProgress { bar: bar.clone() }));
                Some(bar)
            } else {
                None
            };

            let mut host = HeadlessHost::new()
                .with_raster_format(raster_format)
                .with_viewport_size(resolution.0, resolution.1);
            let report = Playblast::new(config).run(&mut host)?;

            if let Some(bar) = progress_bar {
                bar.finish_with_message("done");
            }

            if json {
                let frames: Vec<_> = report
                    .frames
                    .iter()
                    .map(|record| {
                        let (status, detail) = match &record.outcome {
                            FrameOutcome::Written(path) => ("written", path.display().to_string()),
                            FrameOutcome::Failed { reason, .. } => ("failed", reason.clone()),
                            FrameOutcome::Skipped { format } => ("skipped", format.to_string()),
                            FrameOutcome::NotRendered => ("not_rendered", String::new()),
                        };
                        json!({
                            "time": record.time.value(),
                            "status": status,
                            "detail": detail,
                        })
                    })
                    .collect();
                let payload = json!({
                    "requested": report.requested,
                    "written": report.written(),
                    "failed": report.failed(),
                    "skipped": report.skipped(),
                    "frames": frames,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else if report.is_complete() {
                println!("{} {}", "success:".green().bold(), report.to_string().green());
            } else {
                println!("{} {}", "warning:".yellow().bold(), report.to_string().yellow());
            }
        }
        Commands::Formats { json } => {
            if json {
                let formats: Vec<_> = RasterFormat::ALL
                    .iter()
                    .map(|format| match format.mapping() {
                        Some(mapping) => json!({
                            "format": format.name(),
                            "extension": mapping.container.extension(),
                            "component": mapping.component.to_string(),
                            "channels": mapping.channels,
                        }),
                        None => json!({
                            "format": format.name(),
                            "extension": null,
                        }),
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&json!({ "formats": formats }))?);
            } else {
                for format in RasterFormat::ALL {
                    match format.mapping() {
                        Some(mapping) => println!(
                            "{:<20} {} {} x{}",
                            format.name(),
                            mapping.container.extension().green(),
                            mapping.component,
                            mapping.channels,
                        ),
                        None => println!("{:<20} {}", format.name(), "unsupported".dimmed()),
                    }
                }
                println!();
                println!("Command flags:");
                for flag in SYNTAX {
                    println!("  {:<4} {:<12} {:?}", flag.short, flag.long, flag.kind);
                }
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "playblast-cli", &mut std::io::stdout());
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
