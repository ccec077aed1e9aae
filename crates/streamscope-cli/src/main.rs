//! Streamscope CLI - Headless stream dispatcher
//!
//! Features:
//! - URL classification and strategy selection
//! - Session replay against headless collaborators
//! - Configuration inspection

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use streamscope_core::StreamConfig;

mod commands;
mod output;

/// Streamscope CLI - Stream source dispatcher
#[derive(Parser)]
#[command(name = "streamscope-cli")]
#[command(author = "Purple Squirrel Media")]
#[command(version)]
#[command(about = "Stream dispatch and metadata inspection toolkit", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify stream URLs and show the chosen strategy
    Classify {
        /// Stream URLs
        #[arg(required = true)]
        urls: Vec<String>,

        #[command(flatten)]
        runtime: RuntimeArgs,
    },

    /// Load streams in a headless session and replay their events
    Simulate {
        /// Stream URLs, loaded one after another (default stream if none)
        urls: Vec<String>,

        #[command(flatten)]
        runtime: RuntimeArgs,

        /// Reject autoplay requests
        #[arg(long)]
        block_autoplay: bool,

        /// Enable the text track bridge before loading
        #[arg(long)]
        subtitles: bool,
    },

    /// Print the effective configuration
    Config,

    /// List configured example streams
    Examples,
}

/// Capabilities of the simulated runtime
#[derive(clap::Args, Debug, Clone, Copy)]
pub struct RuntimeArgs {
    /// Runtime without the adaptive engine
    #[arg(long)]
    pub no_adaptive: bool,

    /// Runtime without the legacy-container engine
    #[arg(long)]
    pub no_legacy: bool,

    /// Media element plays adaptive manifests natively
    #[arg(long)]
    pub native_manifest: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .init();
    streamscope_core::init();

    let config = match &cli.config {
        Some(path) => StreamConfig::from_file(path)?,
        None => StreamConfig::default(),
    };

    match cli.command {
        Commands::Classify { urls, runtime } => {
            commands::classify(&urls, runtime, &cli.format)?;
        }
        Commands::Simulate {
            urls,
            runtime,
            block_autoplay,
            subtitles,
        } => {
            let options = commands::SimulateOptions {
                runtime,
                block_autoplay,
                subtitles,
            };
            commands::simulate(config, &urls, options, &cli.format).await?;
        }
        Commands::Config => commands::show_config(&config, &cli.format),
        Commands::Examples => commands::examples(&config, &cli.format),
    }

    Ok(())
}
