//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Publish static sites to Pages.
#[derive(Debug, Parser)]
#[command(
    name = "sitedrop",
    author,
    version,
    about = "Publish static sites to Pages with content-addressed uploads",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upload a directory and create a deployment
    Deploy(DeployArgs),
    /// Print the manifest a deploy of the directory would produce
    Scan(ScanArgs),
}

#[derive(Debug, Args)]
pub struct DeployArgs {
    /// Site directory to publish
    pub dir: PathBuf,

    /// Pages project name
    #[arg(long)]
    pub project: String,

    /// Branch to deploy to (defaults to the project's production branch)
    #[arg(long)]
    pub branch: Option<String>,

    /// Upload every file without asking which ones are already stored
    #[arg(long)]
    pub skip_caching: bool,

    /// JSON file with limits, upload and retry settings
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Response header applied to every path, as "Key: value" (repeatable)
    #[arg(long = "header", value_name = "KEY: VALUE")]
    pub headers: Vec<String>,

    /// Account that owns the project
    #[arg(long, env = "CF_ACCOUNT_ID")]
    pub account_id: String,

    /// Account API token
    #[arg(long, env = "CF_API_TOKEN", hide_env_values = true)]
    pub api_token: String,

    /// Pre-issued upload token (issued on demand when absent)
    #[arg(long, env = "CF_UPLOAD_TOKEN", hide_env_values = true)]
    pub upload_token: Option<String>,

    /// API base URL override
    #[arg(long, env = "SITEDROP_API_URL")]
    pub api_url: Option<String>,
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Site directory to scan
    pub dir: PathBuf,

    /// JSON file with limits, upload and retry settings
    #[arg(long)]
    pub config: Option<PathBuf>,
}
