// SPDX-License-Identifier: GPL-3.0-only

use clap::Parser;
use fbcam::pipeline::{self, EXIT_FATAL_STARTUP};
use fbcam::{Config, FramebufferSink, PipelineController, PipelineResult, RunOutcome, V4l2Source};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "fbcam")]
#[command(about = "Show a USB camera fullscreen on the Linux framebuffer")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    /// Video device index (/dev/videoN)
    #[arg(short, long)]
    device: Option<u32>,

    /// Framebuffer device path
    #[arg(short, long)]
    fb: Option<PathBuf>,

    /// JSON configuration file (default: ~/.config/fbcam/config.json if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Target frame rate
    #[arg(long)]
    fps: Option<u32>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> ExitCode {
    // Set RUST_LOG to control log level, e.g. RUST_LOG=fbcam=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(e) => {
            error!(error = %e, "Fatal startup failure");
            ExitCode::from(EXIT_FATAL_STARTUP)
        }
    }
}

fn resolve_config(cli: &Cli) -> PipelineResult<Config> {
    let mut config = Config::resolve(cli.config.as_deref())?;

    if let Some(device) = cli.device {
        config.device_index = device;
    }
    if let Some(fb) = &cli.fb {
        config.fb_device = fb.clone();
    }
    if let Some(fps) = cli.fps {
        config.target_fps = fps;
    }

    config.validate()?;
    Ok(config)
}

fn run(cli: Cli) -> PipelineResult<RunOutcome> {
    let config = resolve_config(&cli)?;

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(RunOutcome::Clean);
    }

    info!(
        version = env!("GIT_VERSION"),
        device_index = config.device_index,
        fb_device = %config.fb_device.display(),
        width = config.capture_width,
        height = config.capture_height,
        codec = %config.codec,
        fps = config.target_fps,
        "Starting fbcam"
    );

    let stop = Arc::new(AtomicBool::new(false));
    pipeline::install_signal_handler(Arc::clone(&stop))?;

    let source = V4l2Source::new(config.capture_config());
    let display = FramebufferSink::new(config.display_config());
    let mut controller = PipelineController::new(source, display, config.pipeline_config(), stop);

    let outcome = controller.run()?;
    info!("Shutdown complete");
    Ok(outcome)
}
