//! CLI command implementations.

pub mod config;
pub mod get;
pub mod routes;

use clap::{Args, Subcommand};

/// Arguments for the get command.
#[derive(Args)]
pub struct GetArgs {
    /// Request path, e.g. `/packages/jquery/versions`.
    pub path: String,

    /// Fixture file to load the stores from.
    #[arg(short, long)]
    pub fixtures: Option<String>,

    /// Send the request this many times (shows cache hits).
    #[arg(short, long, default_value = "1")]
    pub repeat: usize,

    /// Decompress gzip bodies before printing.
    #[arg(long)]
    pub inflate: bool,

    /// Print response headers.
    #[arg(long)]
    pub headers: bool,

    /// Ask for cache debug headers.
    #[arg(long)]
    pub debug_cache: bool,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration.
    Show,
    /// Validate the configuration.
    Validate,
}
