//! File-backed cache of completed collection runs.
//!
//! A run is keyed by the set of repositories and the window start date, so a
//! re-run over the same inputs within the TTL is answered from disk instead
//! of hitting the provider again. Entries are self-describing JSON envelopes;
//! anything expired or unreadable is evicted on sight.

use super::aggregate::RunActivity;
use super::path_utils::sanitize_path_component;
use super::repo_spec::RepoSpec;
use crate::Result;
use chrono::{DateTime, NaiveDate, Utc};
use core::time::Duration;
use ohno::IntoAppError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

const LOG_TARGET: &str = "     cache";

/// How long a completed run stays reusable.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// Longest joined repository list embedded verbatim in an entry name.
/// Larger repository sets are keyed by a digest instead, keeping entry
/// names within filesystem name limits.
const MAX_VERBATIM_KEY_CHARS: usize = 100;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    created_at: DateTime<Utc>,
    repositories: Vec<String>,
    window_start: NaiveDate,
    payload: RunActivity,
}

/// Statistics for one cache entry.
#[derive(Debug, Clone)]
pub struct CacheEntryStats {
    pub name: String,
    pub age_seconds: i64,
    pub size_bytes: u64,
}

/// Statistics for the whole cache directory.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub entries: Vec<CacheEntryStats>,
}

impl CacheStats {
    #[must_use]
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.size_bytes).sum()
    }
}

/// Disk cache of completed collection runs.
#[derive(Debug)]
pub struct RunCache {
    dir: PathBuf,
    ttl: Duration,
    now: DateTime<Utc>,
}

impl RunCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).into_app_err_with(|| format!("creating cache directory {}", dir.display()))?;

        Ok(Self {
            dir,
            ttl,
            now: Utc::now(),
        })
    }

    /// Look up a previous run over the same repositories and window. Expired
    /// and unreadable entries are removed and reported as misses.
    #[must_use]
    pub fn lookup(&self, repositories: &[RepoSpec], window_start: NaiveDate) -> Option<RunActivity> {
        let path = self.entry_path(repositories, window_start);
        let bytes = fs::read(&path).ok()?;

        let Ok(envelope) = serde_json::from_slice::<Envelope>(&bytes) else {
            log::debug!(target: LOG_TARGET, "evicting unreadable entry {}", path.display());
            remove_entry(&path);
            return None;
        };

        // A timestamp from the future (clock adjustment) counts as fresh.
        let age = self.now.signed_duration_since(envelope.created_at);
        if age.to_std().is_ok_and(|age| age > self.ttl) {
            log::debug!(target: LOG_TARGET, "evicting expired entry {}", path.display());
            remove_entry(&path);
            return None;
        }

        log::debug!(
            target: LOG_TARGET,
            "hit for {} ({} repositories, window {})",
            path.display(),
            envelope.repositories.len(),
            envelope.window_start
        );
        Some(envelope.payload)
    }

    /// Persist a completed run. The entry is written to a temporary file and
    /// renamed into place so a crash never leaves a partial entry behind.
    pub fn store(&self, repositories: &[RepoSpec], window_start: NaiveDate, payload: &RunActivity) -> Result<()> {
        let envelope = Envelope {
            created_at: self.now,
            repositories: repositories.iter().map(RepoSpec::full_name).collect(),
            window_start,
            payload: payload.clone(),
        };

        let path = self.entry_path(repositories, window_start);
        let tmp = path.with_extension("json.tmp");

        let bytes = serde_json::to_vec(&envelope).into_app_err("serializing cache entry")?;
        fs::write(&tmp, bytes).into_app_err_with(|| format!("writing cache entry {}", tmp.display()))?;
        fs::rename(&tmp, &path).into_app_err_with(|| format!("finalizing cache entry {}", path.display()))?;

        log::debug!(target: LOG_TARGET, "stored {}", path.display());
        Ok(())
    }

    /// Remove every entry from the cache directory.
    pub fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for entry in self.entries()? {
            fs::remove_file(&entry).into_app_err_with(|| format!("removing cache entry {}", entry.display()))?;
            removed += 1;
        }

        Ok(removed)
    }

    /// Collect statistics over the current cache contents.
    pub fn stats(&self) -> Result<CacheStats> {
        let mut entries = Vec::new();
        for path in self.entries()? {
            let metadata =
                fs::metadata(&path).into_app_err_with(|| format!("inspecting cache entry {}", path.display()))?;
            let created_at: DateTime<Utc> = metadata.modified().into_app_err("reading entry timestamp")?.into();

            entries.push(CacheEntryStats {
                name: path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default(),
                age_seconds: self.now.signed_duration_since(created_at).num_seconds(),
                size_bytes: metadata.len(),
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(CacheStats { entries })
    }

    fn entries(&self) -> Result<Vec<PathBuf>> {
        let dir = fs::read_dir(&self.dir)
            .into_app_err_with(|| format!("reading cache directory {}", self.dir.display()))?;

        let mut paths = Vec::new();
        for entry in dir {
            let path = entry.into_app_err("reading cache directory entry")?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }

        Ok(paths)
    }

    /// Entry path for a run. The key is order-insensitive over repositories.
    fn entry_path(&self, repositories: &[RepoSpec], window_start: NaiveDate) -> PathBuf {
        let mut names: Vec<_> = repositories.iter().map(RepoSpec::full_name).collect();
        names.sort();
        let joined = names.join("+");

        let key = if joined.len() > MAX_VERBATIM_KEY_CHARS {
            format!("{window_start}+{:x}", Sha256::digest(joined.as_bytes()))
        } else {
            sanitize_path_component(&format!("{window_start}+{joined}"))
        };

        self.dir.join(format!("{key}.json"))
    }
}

fn remove_entry(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        log::debug!(target: LOG_TARGET, "couldn't remove {}: {e}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::aggregate::RepoActivity;

    fn specs(names: &[&str]) -> Vec<RepoSpec> {
        names.iter().map(|n| RepoSpec::parse(n).unwrap()).collect()
    }

    fn sample_activity(names: &[&str]) -> RunActivity {
        names.iter().map(|n| ((*n).to_string(), RepoActivity::default())).collect()
    }

    fn window() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn stores_and_recovers_a_run() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RunCache::new(dir.path(), DEFAULT_TTL).unwrap();

        let repos = specs(&["a/one", "b/two"]);
        let activity = sample_activity(&["a/one", "b/two"]);

        assert!(cache.lookup(&repos, window()).is_none());
        cache.store(&repos, window(), &activity).unwrap();
        assert_eq!(cache.lookup(&repos, window()).unwrap(), activity);
    }

    #[test]
    fn key_ignores_repository_order() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RunCache::new(dir.path(), DEFAULT_TTL).unwrap();

        let activity = sample_activity(&["a/one", "b/two"]);
        cache.store(&specs(&["b/two", "a/one"]), window(), &activity).unwrap();

        assert!(cache.lookup(&specs(&["a/one", "b/two"]), window()).is_some());
    }

    #[test]
    fn different_inputs_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RunCache::new(dir.path(), DEFAULT_TTL).unwrap();

        cache.store(&specs(&["a/one"]), window(), &sample_activity(&["a/one"])).unwrap();

        assert!(cache.lookup(&specs(&["a/two"]), window()).is_none());
        assert!(cache.lookup(&specs(&["a/one", "b/two"]), window()).is_none());

        let other_window = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        assert!(cache.lookup(&specs(&["a/one"]), other_window).is_none());
    }

    #[test]
    fn expired_entries_are_evicted() {
        let dir = tempfile::tempdir().unwrap();
        let repos = specs(&["a/one"]);

        let writer = RunCache::new(dir.path(), DEFAULT_TTL).unwrap();
        writer.store(&repos, window(), &sample_activity(&["a/one"])).unwrap();

        let mut reader = RunCache::new(dir.path(), DEFAULT_TTL).unwrap();
        reader.now = Utc::now() + chrono::Duration::hours(1);

        assert!(reader.lookup(&repos, window()).is_none());
        // The expired entry was removed, not just skipped.
        assert_eq!(reader.stats().unwrap().count(), 0);
    }

    #[test]
    fn future_timestamps_count_as_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let repos = specs(&["a/one"]);

        let mut writer = RunCache::new(dir.path(), DEFAULT_TTL).unwrap();
        writer.now = Utc::now() + chrono::Duration::hours(2);
        writer.store(&repos, window(), &sample_activity(&["a/one"])).unwrap();

        let reader = RunCache::new(dir.path(), DEFAULT_TTL).unwrap();
        assert!(reader.lookup(&repos, window()).is_some());
    }

    #[test]
    fn corrupt_entries_are_evicted() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RunCache::new(dir.path(), DEFAULT_TTL).unwrap();
        let repos = specs(&["a/one"]);

        cache.store(&repos, window(), &sample_activity(&["a/one"])).unwrap();

        let path = cache.entry_path(&repos, window());
        fs::write(&path, b"not json").unwrap();

        assert!(cache.lookup(&repos, window()).is_none());
        assert_eq!(cache.stats().unwrap().count(), 0);
    }

    #[test]
    fn clear_removes_all_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RunCache::new(dir.path(), DEFAULT_TTL).unwrap();

        cache.store(&specs(&["a/one"]), window(), &sample_activity(&["a/one"])).unwrap();
        cache.store(&specs(&["b/two"]), window(), &sample_activity(&["b/two"])).unwrap();

        assert_eq!(cache.clear().unwrap(), 2);
        assert_eq!(cache.stats().unwrap().count(), 0);
        assert!(cache.lookup(&specs(&["a/one"]), window()).is_none());
    }

    #[test]
    fn large_repository_sets_get_bounded_entry_names() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RunCache::new(dir.path(), DEFAULT_TTL).unwrap();

        let names: Vec<String> = (0..40).map(|n| format!("organization-name/repository-number-{n}")).collect();
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let repos = specs(&name_refs);

        let path = cache.entry_path(&repos, window());
        let file_name = path.file_name().unwrap().to_string_lossy();
        assert!(file_name.len() < 255, "entry name too long: {} bytes", file_name.len());

        let activity = sample_activity(&name_refs);
        cache.store(&repos, window(), &activity).unwrap();
        assert_eq!(cache.lookup(&repos, window()).unwrap(), activity);

        // The digested key is still order-insensitive.
        let mut reversed = repos;
        reversed.reverse();
        assert!(cache.lookup(&reversed, window()).is_some());
    }

    #[test]
    fn stats_report_entry_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RunCache::new(dir.path(), DEFAULT_TTL).unwrap();

        cache.store(&specs(&["a/one"]), window(), &sample_activity(&["a/one"])).unwrap();

        let stats = cache.stats().unwrap();
        assert_eq!(stats.count(), 1);
        assert!(stats.total_bytes() > 0);
        assert!(stats.entries[0].name.ends_with(".json"));
    }
}
