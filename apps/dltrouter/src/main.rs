//! DLT router daemon entry point.

mod app;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dltrouter_protocol::DltId;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use config::{Config, LoggingConfig};

/// Routes application records and streams files as DLT log messages
#[derive(Parser)]
#[command(name = "dltrouter")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the router until interrupted
    Serve,

    /// Stream a file as DLT messages
    Transfer {
        /// File to stream
        file: String,

        /// Delete the file after a complete transfer
        #[arg(long)]
        delete: bool,

        /// Application id of the emitted messages
        #[arg(long, default_value = "FT")]
        appid: DltId,

        /// Context id of the emitted messages
        #[arg(long, default_value = "FT")]
        ctxid: DltId,

        /// Stream from this process instead of asking a running router
        #[arg(long)]
        local: bool,
    },

    /// Print the effective configuration
    Config,
}

fn init_tracing(logging: &LoggingConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&logging.default_filter)),
        )
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.validate()?;
    init_tracing(&config.logging(cli.verbose));

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        ecu = %config.ecu_id,
        "starting dltrouter"
    );

    match cli.command {
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Transfer {
            file,
            delete,
            appid,
            ctxid,
            local: false,
        } => app::trigger(&config, &file, delete, appid, ctxid),
        Commands::Transfer {
            file,
            delete,
            appid,
            ctxid,
            local: true,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            let report = rt.block_on(app::transfer_local(&config, &file, delete, appid, ctxid))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            anyhow::ensure!(report.is_completed(), "file transfer failed");
            Ok(())
        }
        Commands::Serve => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(async move {
                let cancel = CancellationToken::new();
                let shutdown = cancel.clone();
                tokio::spawn(async move {
                    match tokio::signal::ctrl_c().await {
                        Ok(()) => {
                            tracing::info!("shutdown signal received");
                            shutdown.cancel();
                        }
                        Err(err) => tracing::warn!(error = %err, "cannot listen for shutdown signal"),
                    }
                });
                app::serve(config, cancel).await
            })?;
            tracing::info!("dltrouter shut down cleanly");
            Ok(())
        }
    }
}
