//! The cache command: inspect or clear stored runs.

use super::Host;
use super::common::{LogLevel, init_logging, resolve_cache_dir};
use crate::Result;
use crate::activity::{DEFAULT_TTL, RunCache};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use std::io::Write;

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Show cache entry counts, ages, and sizes
    Stats(CacheArgs),
    /// Remove all cached runs
    Clear(CacheArgs),
}

#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Directory where completed runs are cached
    #[arg(long, value_name = "PATH")]
    pub cache_dir: Option<Utf8PathBuf>,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "none", global = true)]
    pub log_level: LogLevel,
}

pub fn process_cache<H: Host>(host: &mut H, command: &CacheCommand) -> Result<()> {
    match command {
        CacheCommand::Stats(args) => {
            init_logging(args.log_level);
            let cache = RunCache::new(resolve_cache_dir(args.cache_dir.as_ref())?, DEFAULT_TTL)?;
            let stats = cache.stats()?;

            let _ = writeln!(host.output(), "{} cached run(s), {} bytes total", stats.count(), stats.total_bytes());
            for entry in &stats.entries {
                let _ = writeln!(host.output(), "  {} ({}s old, {} bytes)", entry.name, entry.age_seconds, entry.size_bytes);
            }
        }
        CacheCommand::Clear(args) => {
            init_logging(args.log_level);
            let cache = RunCache::new(resolve_cache_dir(args.cache_dir.as_ref())?, DEFAULT_TTL)?;
            let removed = cache.clear()?;
            let _ = writeln!(host.output(), "Removed {removed} cached run(s)");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{RepoSpec, RunActivity};
    use crate::commands::host::TestHost;
    use chrono::NaiveDate;
    use std::path::Path;

    fn cache_args(dir: &Path) -> CacheArgs {
        CacheArgs {
            cache_dir: Some(Utf8PathBuf::try_from(dir.to_path_buf()).unwrap()),
            log_level: LogLevel::None,
        }
    }

    fn store_one_run(dir: &Path) {
        let cache = RunCache::new(dir, DEFAULT_TTL).unwrap();
        let repos = vec![RepoSpec::parse("a/one").unwrap()];
        let window = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        cache.store(&repos, window, &RunActivity::new()).unwrap();
    }

    #[test]
    fn stats_reports_stored_runs() {
        let tmp = tempfile::tempdir().unwrap();
        store_one_run(tmp.path());

        let mut host = TestHost::new();
        process_cache(&mut host, &CacheCommand::Stats(cache_args(tmp.path()))).unwrap();

        let printed = String::from_utf8(host.output_buf).unwrap();
        assert!(printed.starts_with("1 cached run(s)"));
        assert!(printed.contains(".json"));
    }

    #[test]
    fn stats_on_an_empty_cache() {
        let tmp = tempfile::tempdir().unwrap();

        let mut host = TestHost::new();
        process_cache(&mut host, &CacheCommand::Stats(cache_args(tmp.path()))).unwrap();

        let printed = String::from_utf8(host.output_buf).unwrap();
        assert!(printed.starts_with("0 cached run(s), 0 bytes total"));
    }

    #[test]
    fn clear_removes_stored_runs() {
        let tmp = tempfile::tempdir().unwrap();
        store_one_run(tmp.path());

        let mut host = TestHost::new();
        process_cache(&mut host, &CacheCommand::Clear(cache_args(tmp.path()))).unwrap();
        process_cache(&mut host, &CacheCommand::Stats(cache_args(tmp.path()))).unwrap();

        let printed = String::from_utf8(host.output_buf).unwrap();
        assert!(printed.contains("Removed 1 cached run(s)"));
        assert!(printed.contains("0 cached run(s)"));
    }
}
