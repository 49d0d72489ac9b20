//! Resilient collection of repository activity.
//!
//! The pipeline turns a set of repositories and a time window into a
//! [`RunActivity`] map: a [`Collector`] fetches merged change requests and
//! direct commits through an [`ActivitySource`], wrapping every remote call
//! in rate-limit-aware [`retry`], then [`aggregate`](aggregate()) shapes the
//! raw data into the per-repository model. Completed runs are memoized on
//! disk by [`RunCache`].

mod aggregate;
mod cache;
mod collector;
mod error;
mod path_utils;
mod progress;
mod repo_spec;
mod retry;
mod source;

pub mod github;

pub use aggregate::{ChangeTotals, CommitInfo, CommitRef, MergedPull, MergedRequest, RepoActivity, RunActivity, aggregate};
pub use cache::{CacheEntryStats, CacheStats, DEFAULT_TTL, RunCache};
pub use collector::{Collector, DEFAULT_BATCH_SIZE};
pub use error::ApiError;
pub use progress::{NoProgress, Progress};
pub use repo_spec::RepoSpec;
pub use retry::{RetryPolicy, retry};
pub use source::{ActivitySource, PullStats, PullSummary, Quota, RawCommit};
