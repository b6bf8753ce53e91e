//! Main CLI application structure

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use super::output::{Output, OutputFormat};
use super::{format, profile_cmd};

#[derive(Parser)]
#[command(name = "sable")]
#[command(author, version, about = "Code formatter with a pluggable formatting pipeline")]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Format arguments for the default invocation, `sable FILES...`
    #[command(flatten)]
    pub format_args: format::FormatArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Format files (the default when no subcommand is named)
    Format(format::FormatArgs),

    /// Manage configuration profiles
    #[command(subcommand)]
    Profile(profile_cmd::ProfileCommands),
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output = Output::new(cli.format);

    match cli.command {
        Some(Commands::Format(args)) => format::run(&output, args),
        Some(Commands::Profile(cmd)) => profile_cmd::run(cmd, &output),
        None => format::run(&output, cli.format_args),
    }
}

/// Logs go to stderr so formatted output on stdout stays clean
fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,sable_fmt={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
