//! Command dispatch logic for repo-pulse

use super::cache::{CacheCommand, process_cache};
use super::{CollectArgs, InitArgs, init_config, process_collect};
use crate::{Host, Result};
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "repo-pulse", version, author)]
#[command(about = "Summarize recent merge and commit activity across repositories")]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(subcommand)]
    command: PulseSubcommand,
}

#[derive(Subcommand, Debug)]
enum PulseSubcommand {
    /// Collect recent activity and render a digest
    Collect(Box<CollectArgs>),

    /// Inspect or clear cached runs
    #[command(subcommand)]
    Cache(CacheCommand),

    /// Generate a default configuration file
    Init(InitArgs),
}

/// Dispatch command-line arguments to the appropriate handler
///
/// This function parses the command-line arguments and executes the
/// corresponding subcommand. It's designed to be called from main.rs with the
/// program arguments.
///
/// # Errors
///
/// Returns an error if command parsing fails or if the executed command fails
pub async fn run<I, T, H>(host: &mut H, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    H: Host,
{
    let cli = Cli::parse_from(args);

    match &cli.command {
        PulseSubcommand::Collect(collect_args) => process_collect(host, collect_args).await,
        PulseSubcommand::Cache(cache_command) => process_cache(host, cache_command),
        PulseSubcommand::Init(init_args) => init_config(host, init_args),
    }
}
