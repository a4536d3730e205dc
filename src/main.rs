use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use namewatch::app::App;
use namewatch::config::Config;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "namewatch", about = "Domain lifecycle event pipeline", version)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the ingestion and aggregation loops (default).
    Run,
    /// Rewind the ingestion cursor and replay from an event id.
    ResetCursor {
        /// Event id to replay from.
        event_id: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;

    config.init_logging();

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            info!("namewatch starting");

            if let Err(e) = App::run(config).await {
                error!(error = %e, "Fatal error");
                std::process::exit(1);
            }

            info!("namewatch stopped");
        }
        Command::ResetCursor { event_id } => {
            App::reset_cursor(config, event_id)
                .await
                .context("cursor reset failed")?;
        }
    }

    Ok(())
}
