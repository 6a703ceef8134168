mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use layerkit_lib::platform::BuildPlatform;

use output::OutputFormat;

/// layerkit - Build-plan normalization and layer lowering
#[derive(Parser)]
#[command(name = "layerkit")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
  format: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Remove empty layers and unreachable steps from a plan
  Normalize {
    /// Path to the build plan JSON
    plan: PathBuf,
  },

  /// Lower a plan into an operation graph
  Lower {
    /// Path to the build plan JSON
    plan: PathBuf,

    /// Target platform (e.g. linux/amd64, linux/arm64/v8). Defaults to the host.
    #[arg(short, long)]
    platform: Option<BuildPlatform>,

    /// Lower the plan as given, without normalizing it first
    #[arg(long)]
    raw: bool,
  },

  /// Show the detected build platform
  Info,
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "info" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Normalize { plan } => cmd::cmd_normalize(&plan, cli.verbose, cli.format),
    Commands::Lower { plan, platform, raw } => cmd::cmd_lower(&plan, platform, raw, cli.verbose, cli.format),
    Commands::Info => cmd::cmd_info(cli.format),
  }
}
