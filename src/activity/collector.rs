//! Concurrent, failure-isolated collection across repositories.
//!
//! Repositories are fetched in fixed-size batches. Within a batch every
//! repository proceeds concurrently; the next batch starts only once the
//! whole batch has settled. A repository whose fetch ultimately fails is
//! reported as empty activity rather than failing the run.

use super::aggregate::{self, MergedPull, RepoActivity, RunActivity};
use super::error::ApiError;
use super::progress::Progress;
use super::repo_spec::RepoSpec;
use super::retry::{RetryPolicy, retry};
use super::source::ActivitySource;
use chrono::{DateTime, Utc};
use core::fmt::{Debug, Formatter};
use futures_util::future::join_all;
use std::sync::Arc;

const LOG_TARGET: &str = " collector";

/// How many repositories are fetched concurrently.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Orchestrates activity collection over a set of repositories.
pub struct Collector<S> {
    source: S,
    policy: RetryPolicy,
    batch_size: usize,
    progress: Arc<dyn Progress>,
}

impl<S> Debug for Collector<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Collector")
            .field("policy", &self.policy)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl<S: ActivitySource> Collector<S> {
    pub fn new(source: S, policy: RetryPolicy, batch_size: usize, progress: Arc<dyn Progress>) -> Self {
        Self {
            source,
            policy,
            // A zero batch size would make no forward progress.
            batch_size: batch_size.max(1),
            progress,
        }
    }

    /// Collect activity since `since` for every repository.
    ///
    /// Always returns one entry per repository; failures degrade to empty
    /// activity for the repository they hit.
    pub async fn collect(&self, repositories: &[RepoSpec], since: DateTime<Utc>) -> RunActivity {
        let total = repositories.len();
        let mut activity = RunActivity::with_capacity(total);
        let mut processed = 0;

        self.progress.set_phase("Collecting");
        self.progress.update(0, total as u64, String::new());

        for batch in repositories.chunks(self.batch_size) {
            let results = join_all(batch.iter().map(|repo| self.fetch_repo(repo, since))).await;

            processed += batch.len();
            for (name, repo_activity) in results {
                let _ = activity.insert(name, repo_activity);
            }

            log::info!(target: LOG_TARGET, "processed {processed}/{total} repositories");
            self.progress
                .update(processed as u64, total as u64, format!("{processed}/{total} repositories"));
        }

        self.progress.done();
        activity
    }

    /// Fetch one repository, degrading any failure to empty activity.
    async fn fetch_repo(&self, repo: &RepoSpec, since: DateTime<Utc>) -> (String, RepoActivity) {
        let activity = match self.try_fetch_repo(repo, since).await {
            Ok(activity) => {
                log::debug!(
                    target: LOG_TARGET,
                    "{repo}: {} merged requests, {} direct commits",
                    activity.merged.len(),
                    activity.commits.len()
                );
                activity
            }
            Err(e) => {
                log::warn!(target: LOG_TARGET, "skipping {repo}: {e}");
                self.progress.println(&format!("warning: couldn't collect {repo}: {e}"));
                RepoActivity::default()
            }
        };

        (repo.full_name(), activity)
    }

    async fn try_fetch_repo(&self, repo: &RepoSpec, since: DateTime<Utc>) -> Result<RepoActivity, ApiError> {
        let summaries = retry(self.policy, || self.source.merged_requests(repo, since)).await?;

        let mut merged = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let stats = retry(self.policy, || self.source.request_stats(repo, summary.number)).await?;
            let commits = retry(self.policy, || self.source.request_commits(repo, summary.number)).await?;
            merged.push(MergedPull { summary, stats, commits });
        }

        let direct = retry(self.policy, || self.source.commits_since(repo, since)).await?;
        Ok(aggregate::aggregate(merged, direct))
    }
}
