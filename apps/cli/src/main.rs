//! drivedrop command line entry point.

mod app;
mod config;
mod files;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Upload files into a structured folder tree on a cloud drive.
#[derive(Parser, Debug)]
#[command(name = "drivedrop", version, about)]
pub struct Cli {
    /// Configuration file (default: ~/.config/drivedrop/config.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the id of a folder, creating missing levels.
    Resolve(PathArgs),

    /// Upload files into a folder and print the batch result as JSON.
    Upload {
        /// Target folder id; skips path resolution.
        #[arg(long, conflicts_with_all = ["model", "platform", "category", "title"])]
        folder_id: Option<String>,

        #[command(flatten)]
        path: OptionalPathArgs,

        /// Files to upload, in order.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

/// Logical path of the target folder.
#[derive(Args, Debug, Clone)]
pub struct PathArgs {
    #[arg(long)]
    pub model: String,

    #[arg(long)]
    pub platform: String,

    #[arg(long)]
    pub category: String,

    /// Optional sub-folder below the category.
    #[arg(long)]
    pub title: Option<String>,
}

/// Logical path of the target folder, unless `--folder-id` is given.
#[derive(Args, Debug, Clone, Default)]
pub struct OptionalPathArgs {
    #[arg(long, required_unless_present = "folder_id")]
    pub model: Option<String>,

    #[arg(long, required_unless_present = "folder_id")]
    pub platform: Option<String>,

    #[arg(long, required_unless_present = "folder_id")]
    pub category: Option<String>,

    /// Optional sub-folder below the category.
    #[arg(long)]
    pub title: Option<String>,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize structured logging on stderr; stdout carries results.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting drivedrop");

    let config = config::Config::load(cli.config.as_deref())?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(cli.command, config))
}
