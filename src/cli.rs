//! CLI definitions for unfurl.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// unfurl CLI.
#[derive(Parser)]
#[command(name = "unfurl")]
#[command(about = "Expand every collapsed branch of a live document tree")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "unfurl.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Open a page and expand everything on it
    Expand {
        /// Page URL
        url: String,

        /// DevTools endpoint (overrides `browser.endpoint`)
        #[arg(long, env = "UNFURL_ENDPOINT")]
        endpoint: Option<String>,

        /// Attach to an open tab showing the URL instead of opening a new one
        #[arg(long)]
        attach: bool,

        /// Stop the run after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Load and validate the configuration file
    CheckConfig,
}
