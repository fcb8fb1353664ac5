//! filesync node
//!
//! Pushes file mutations to a peer over mutual TLS and applies the ones it
//! receives.
//!
//! # Commands
//!
//! - `serve` - Run the sync and queue listeners (and the queue poller)
//! - `send` - Deliver one instruction to the peer
//! - `apply` - Apply an operation to the local destination root
//! - `queue list` / `queue flush` - Inspect or clear the Redis delay queue

mod commands;
mod config;
mod error;
mod logging;

use clap::{Parser, Subcommand};
use commands::apply::ApplySource;
use config::{AppConfig, DEFAULT_CONFIG_FILE};
use error::CliResult;
use logging::LogFormat;
use std::path::PathBuf;
use std::process::ExitCode;

/// File sync over mutual TLS.
#[derive(Parser)]
#[command(name = "filesync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the config file
    #[arg(global = true, short, long, env = "FILESYNC_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Enable debug logging
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Override the log format from the config file
    #[arg(global = true, long, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sync and queue listeners
    Serve,

    /// Deliver one instruction (`verb:path[:newpath]`) to the peer
    Send {
        /// Instruction to send
        instruction: String,

        /// Downgrade existence checks on the peer to warnings
        #[arg(short, long)]
        force: bool,

        /// Peer address, overriding `sync.address`
        #[arg(short, long)]
        destination: Option<String>,
    },

    /// Apply an operation to the local destination root
    Apply {
        /// Instruction resolved against the source root
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        instruction: Option<String>,

        /// Wire-format JSON message to apply instead
        #[arg(long)]
        file: Option<PathBuf>,

        /// Downgrade existence checks to warnings
        #[arg(short, long)]
        force: bool,
    },

    /// Inspect or clear the delay queue
    Queue {
        #[command(subcommand)]
        action: QueueAction,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum QueueAction {
    /// List pending entries, soonest first
    List {
        /// Maximum number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Remove every pending entry
    Flush,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = AppConfig::load(&cli.config)?;

    let level = if cli.verbose {
        "debug"
    } else {
        config.log.level.as_str()
    };
    logging::init_logging(level, cli.log_format.unwrap_or(config.log.format))?;

    match cli.command {
        Commands::Serve => commands::serve::run(&config).await?,
        Commands::Send {
            instruction,
            force,
            destination,
        } => commands::send::run(&config, &instruction, force, destination).await?,
        Commands::Apply {
            instruction,
            file,
            force,
        } => {
            let source = match (&instruction, &file) {
                (_, Some(path)) => ApplySource::File(path),
                (Some(value), None) => ApplySource::Instruction { value, force },
                (None, None) => {
                    return Err(error::CliError::InvalidConfig(
                        "apply needs an instruction or --file".into(),
                    ))
                }
            };
            let outcome = commands::apply::run(&config, source)?;
            println!("{outcome:?}");
        }
        Commands::Queue { action } => match action {
            QueueAction::List { limit, format } => {
                commands::queue::list(&config, limit, &format).await?
            }
            QueueAction::Flush => commands::queue::flush(&config).await?,
        },
        Commands::Version => {
            println!("filesync v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
