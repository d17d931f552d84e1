//! # roomsync
//!
//! CLI harness for the roomsync chat synchronization engine.
//!
//! ## Commands
//!
//! - `encode`: Print the display markup for typed text
//! - `demo`: Open a room on the in-process backend and exercise sends,
//!   live delivery, rollback and feed recovery
//!
//! ## Example
//!
//! ```bash
//! # Encode typed text
//! roomsync encode "**hello** *there*"
//!
//! # Run the demo with a script, one message per line
//! roomsync demo --script messages.txt
//!
//! # Verbose engine logs
//! RUST_LOG=roomsync_client=debug roomsync demo
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{demo, encode};
use config::Config;

/// CLI harness for the roomsync chat synchronization engine.
#[derive(Parser, Debug)]
#[command(name = "roomsync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: ./roomsync.toml, defaults if missing)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log engine activity at debug level
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the display markup for typed text
    Encode {
        /// Text to encode (or use --file)
        text: Option<String>,

        /// File to encode
        #[arg(long, short, conflicts_with = "text")]
        file: Option<PathBuf>,
    },

    /// Open a room on the in-process backend and run a scripted session
    Demo {
        /// Script file, one message per line
        #[arg(long, short)]
        script: Option<PathBuf>,

        /// Room to open (overrides [demo] room)
        #[arg(long)]
        room: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Encode { text, file } => {
            let text = if let Some(text) = text {
                text
            } else if let Some(path) = file {
                tokio::fs::read_to_string(&path)
                    .await
                    .context("Failed to read file")?
            } else {
                anyhow::bail!("Must specify text or --file");
            };
            encode::run(&text)?;
        }
        Commands::Demo { script, room } => {
            let mut config = Config::load_or_default(cli.config.as_deref())
                .context("Failed to load configuration")?;
            if let Some(room) = room {
                config.demo.room = room;
            }
            let script = demo::load_script(script.as_deref()).await?;
            demo::run(&config, &script).await?;
        }
    }

    Ok(())
}

/// Install the log subscriber. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
