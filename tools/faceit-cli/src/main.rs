//! FaceIt CLI: probe cameras, record sessions, and analyze exports.
//!
//! Usage:
//!   faceit devices             List cameras that deliver frames
//!   faceit record [OPTIONS]    Record a session until Ctrl+C or --duration
//!   faceit analyze <EXPORT>    Recompute the summary of a session export
//!   faceit info <EXPORT>       Show session export information

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use faceit_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "faceit",
    about = "Webcam session recording with emotion, gaze, and game analytics",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to the standard location)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List cameras that deliver frames
    Devices,

    /// Record a session
    Record {
        /// Camera index (probes from 0 when omitted)
        #[arg(long)]
        camera: Option<u32>,

        /// Stop after this many seconds instead of waiting for Ctrl+C
        #[arg(long)]
        duration: Option<f64>,

        /// Output directory for video, export, and summary
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep downscaled frames in memory (bounded by the frame cap)
        #[arg(long)]
        retain_frames: bool,
    },

    /// Recompute the summary of a session export
    Analyze {
        /// Path to a faceit_session_*.json export
        path: PathBuf,

        /// Write the summary here instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show session export information
    Info {
        /// Path to a faceit_session_*.json export
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {e}", path.display()))?,
        None => AppConfig::load(),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    faceit_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Devices => commands::devices::run(&config),
        Commands::Record {
            camera,
            duration,
            output,
            retain_frames,
        } => commands::record::run(config, camera, duration, output, retain_frames).await,
        Commands::Analyze { path, output } => commands::analyze::run(&config, path, output),
        Commands::Info { path } => commands::info::run(path),
    }
}
