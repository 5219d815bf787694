//! CLI Argument Parsing
//!
//! CLIの引数解析

use clap::{Parser, Subcommand};

/// コンテナイメージのビルドとサービスの起動を行うCLI
#[derive(Parser, Debug, Clone)]
#[command(name = "finchat-bootstrap")]
#[command(about = "Build and launch the FinChat service container", long_about = None)]
pub struct Args {
    /// Config file path (defaults are used when omitted)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Resolve dependencies and assemble the image
    Build(BuildArgs),
    /// Start the process manager
    Serve(ServeArgs),
    /// Print the build descriptor without building
    Render,
}

#[derive(clap::Args, Debug, Clone)]
pub struct BuildArgs {
    /// Build context directory
    #[arg(long, default_value = ".")]
    pub context: String,

    /// Output directory for the image
    #[arg(short, long, default_value = "./build/image")]
    pub output: String,

    /// Resolve against a local JSON catalog instead of the configured index
    #[arg(long)]
    pub offline_index: Option<String>,

    /// Dry run mode - resolve and validate without writing the image
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    /// Bind address (e.g. 0.0.0.0:8085)
    #[arg(long)]
    pub bind: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Application object as MODULE:ATTRIBUTE
    #[arg(long)]
    pub entrypoint: Option<String>,

    /// Application source tree
    #[arg(long)]
    pub app_root: Option<String>,

    /// Base URL requests are forwarded to
    #[arg(long)]
    pub upstream_url: Option<String>,

    /// Runtime worker threads
    #[arg(long)]
    pub workers: Option<usize>,

    /// Do not require the module source under the app root
    #[arg(long)]
    pub skip_module_check: bool,
}
