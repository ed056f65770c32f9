//! unfurl - expand every collapsed branch of a live document tree.
//!
//! Main entry point for the unfurl CLI.

mod adapters;
mod cli;
mod cmd_expand;
mod report;

use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use unfurl_config::{ConfigLoader, LoggingConfig};

use cli::{Cli, Commands};
use cmd_expand::{ExpandArgs, check_config, run_expand};

/// Initialize tracing with console and optional file output.
///
/// Log files are rotated daily under `logging.dir` (default `~/.unfurl/logs`).
fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let file_layer = if logging.file {
        let log_dir = logging.log_dir();
        std::fs::create_dir_all(&log_dir)?;

        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("unfurl")
            .filename_suffix("log")
            .max_log_files(30)
            .build(&log_dir)?;

        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        // The guard flushes buffered lines on drop; keep it for the whole run.
        static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
            std::sync::OnceLock::new();
        let _ = GUARD.set(guard);

        Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
    } else {
        None
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(file_layer)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::CheckConfig => check_config(&cli.config),
        Commands::Expand {
            url,
            endpoint,
            attach,
            timeout,
        } => {
            let config = ConfigLoader::load_or_default(&cli.config)?;
            init_tracing(&config.logging)?;
            tracing::info!("Starting unfurl v{}", env!("CARGO_PKG_VERSION"));

            let args = ExpandArgs {
                url,
                endpoint,
                attach,
                timeout,
            };
            run_expand(&config, args).await
        }
    }
}
