//! The collect command: gather activity across repositories and render a
//! digest.

use super::Host;
use super::ProgressReporter;
use super::common::{ColorMode, LogLevel, init_logging, resolve_cache_dir};
use super::config::Config;
use crate::Result;
use crate::activity::{ActivitySource, Collector, RepoSpec, RetryPolicy, RunCache};
use crate::activity::github::GithubSource;
use crate::digest::{Summarizer, TextDigest};
use camino::Utf8PathBuf;
use chrono::{Days, Utc};
use clap::Parser;
use core::time::Duration;
use ohno::{IntoAppError, app_err};
use std::fs;
use std::io::Write;
use std::sync::Arc;

const LOG_TARGET: &str = "   collect";

#[derive(Parser, Debug)]
pub struct CollectArgs {
    /// Repositories to collect, as `owner/repo` or full URLs.
    /// Overrides the repositories listed in the configuration file.
    #[arg(value_name = "REPO")]
    pub repos: Vec<String>,

    /// GitHub personal access token
    #[arg(long, value_name = "TOKEN", env = "GITHUB_TOKEN")]
    pub github_token: Option<String>,

    /// Path to configuration file (default is `pulse.toml`)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// How many days back to collect, overriding the configuration file
    #[arg(long, value_name = "DAYS")]
    pub days: Option<u32>,

    /// Directory where completed runs are cached
    #[arg(long, value_name = "PATH")]
    pub cache_dir: Option<Utf8PathBuf>,

    /// Ignore cached data and fetch everything fresh
    #[arg(long)]
    pub ignore_cached: bool,

    /// Write the digest to a file instead of the terminal
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<Utf8PathBuf>,

    /// Control when to use colored output
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: ColorMode,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "none", global = true)]
    pub log_level: LogLevel,
}

pub async fn process_collect<H: Host>(host: &mut H, args: &CollectArgs) -> Result<()> {
    init_logging(args.log_level);

    let config = Config::load(args.config.as_ref())?;

    let names = if args.repos.is_empty() { &config.repositories } else { &args.repos };
    if names.is_empty() {
        return Err(app_err!(
            "no repositories to collect: list them on the command line or in the configuration file"
        ));
    }

    let repos = names.iter().map(|name| RepoSpec::parse(name)).collect::<Result<Vec<_>>>()?;

    let window_days = args.days.unwrap_or(config.window_days);
    let since = Utc::now()
        .checked_sub_days(Days::new(window_days.into()))
        .ok_or_else(|| app_err!("window of {window_days} days is out of range"))?;
    let window_start = since.date_naive();

    let cache = RunCache::new(resolve_cache_dir(args.cache_dir.as_ref())?, config.cache_ttl)?;

    let cached = if args.ignore_cached { None } else { cache.lookup(&repos, window_start) };
    let activity = if let Some(activity) = cached {
        log::info!(target: LOG_TARGET, "using cached results for {} repositories", repos.len());
        activity
    } else {
        let source = GithubSource::new(args.github_token.as_deref(), None, config.strict_forbidden)?;

        match source.quota().await {
            Ok(quota) => {
                log::info!(target: LOG_TARGET, "{} API requests remaining, quota resets {}", quota.remaining, quota.reset_at);
            }
            Err(e) => log::debug!(target: LOG_TARGET, "couldn't read quota: {e}"),
        }

        // Progress output would interleave badly with log lines, so it stays
        // hidden whenever logging is enabled.
        let delay = if args.log_level == LogLevel::None {
            Duration::from_millis(300)
        } else {
            Duration::from_secs(365 * 24 * 3600)
        };
        let progress = ProgressReporter::new(delay, args.color.use_colors());

        let policy = RetryPolicy {
            max_retries: config.max_retries,
            initial_delay: config.initial_delay,
        };
        let collector = Collector::new(source, policy, config.batch_size, Arc::new(progress));

        let activity = collector.collect(&repos, since).await;

        if let Err(e) = cache.store(&repos, window_start, &activity) {
            log::warn!(target: LOG_TARGET, "couldn't cache results: {e:#}");
        }

        activity
    };

    let digest = TextDigest.summarize(window_start, &activity)?;

    if let Some(path) = &args.output {
        fs::write(path, digest).into_app_err_with(|| format!("writing digest to {path}"))?;
    } else {
        let _ = write!(host.output(), "{digest}");
    }

    Ok(())
}
