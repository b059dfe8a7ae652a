//! prism: headless driver for the spectral crystal simulation
//!
//! Runs the per-frame pipeline without a display, for inspecting the
//! dispersion pattern or feeding recorded frames to a renderer.
//!
//! Usage:
//!   prism simulate --frames 120 --output frames.json
//!   prism spectrum
//!   prism check-config --config prism.yaml

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use nalgebra::Point2;
use prism_rt::{
    spectral_bands, Engine, EngineState, FrameInput, FrameOutput, FrameScheduler, PrismConfig,
    Viewport, FRAME_DT,
};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Parser)]
#[command(name = "prism")]
#[command(version = "0.1.0")]
#[command(about = "Spectral dispersion through a rotating faceted crystal")]
#[command(long_about = "
prism runs the crystal simulation headless:
  - generates the faceted crystal
  - smooths a scripted pointer path with a damped spring
  - traces one ray per spectral band through the projected outline

Example usage:
  prism simulate --frames 120 --output frames.json
  prism spectrum
")]
struct Cli {
    /// Path to config file (defaults are used when omitted and none is found)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Set logging level (trace, debug, info, warn, error)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the frame loop with a pointer orbiting the crystal
    Simulate {
        /// Number of frames to run
        #[arg(short, long, default_value_t = 120)]
        frames: u32,
        /// Viewport width in pixels
        #[arg(long, default_value_t = 800.0)]
        width: f64,
        /// Viewport height in pixels
        #[arg(long, default_value_t = 600.0)]
        height: f64,
        /// Write every frame as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the sampled spectral bands
    Spectrum,

    /// Validate configuration file
    CheckConfig,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level_filter = if let Some(level) = cli.log_level {
        level.to_string()
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
            .to_string()
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&level_filter))
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Simulate {
            frames,
            width,
            height,
            output,
        } => simulate(config, frames, Viewport::new(width, height), output)?,
        Commands::Spectrum => print_spectrum(&config),
        Commands::CheckConfig => {
            println!("Configuration is valid");
            println!("{}", serde_yaml::to_string(&config)?);
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<PrismConfig> {
    let config = PrismConfig::load_or_default(path).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Pointer position for `frame`: a slow ellipse around the viewport centre
fn scripted_pointer(frame: u32, viewport: &Viewport) -> Point2<f64> {
    let angle = frame as f64 * 0.05;
    let c = viewport.center();
    Point2::new(
        c.x + viewport.width * 0.42 * angle.cos(),
        c.y + viewport.height * 0.42 * angle.sin(),
    )
}

fn simulate(
    config: PrismConfig,
    frames: u32,
    viewport: Viewport,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let engine = Engine::new(config);
    let start = scripted_pointer(0, &viewport);
    let mut scheduler = FrameScheduler::new(engine, EngineState::at_rest(start));

    let mut recorded: Vec<FrameOutput> = Vec::new();
    let mut total_segments = 0usize;
    let mut traced_frames = 0u32;
    let started = std::time::Instant::now();

    for frame in 0..frames {
        let input = FrameInput {
            pointer: scripted_pointer(frame, &viewport),
            viewport,
        };
        let out = scheduler.tick(&input, FRAME_DT);

        total_segments += out.segments.len();
        if !out.segments.is_empty() {
            traced_frames += 1;
        }
        if output.is_some() {
            recorded.push(out);
        }
    }

    let elapsed = started.elapsed();
    tracing::info!(
        frames,
        traced_frames,
        total_segments,
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        "Simulation finished"
    );

    if let Some(path) = output {
        let file = std::fs::File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer(std::io::BufWriter::new(file), &recorded)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), frames = recorded.len(), "Frames written");
    }

    Ok(())
}

fn print_spectrum(config: &PrismConfig) {
    let bands = spectral_bands(&config.optics.dispersion());

    println!("{:>4}  {:>8}  {:>8}  {:>8}  {:>6}", "band", "nm", "ior", "color", "weight");
    for (i, band) in bands.iter().enumerate() {
        println!(
            "{:>4}  {:>8.1}  {:>8.4}  {:>8}  {:>6.3}",
            i,
            band.wavelength_nm,
            band.refractive_index,
            band.color.to_hex(),
            band.display_weight
        );
    }
}
