//! Abstract seam over a source-control provider.
//!
//! The collection pipeline only ever talks to an [`ActivitySource`]; the
//! concrete GitHub implementation lives in [`super::github`] and tests use
//! scripted in-memory sources.

use super::error::ApiError;
use super::repo_spec::RepoSpec;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A change request the provider reports as merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullSummary {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub merged_at: DateTime<Utc>,

    /// Synthetic merge-commit identifier created by the provider, if any.
    pub merge_commit_sha: Option<String>,
}

/// One commit with per-commit line/file statistics.
///
/// Statistics are zero for listings that don't carry them (e.g. the commits
/// contributing to a change request).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCommit {
    pub sha: String,
    pub message: String,
    pub additions: u64,
    pub deletions: u64,
    pub changed_files: u64,
}

/// Line/file-change statistics of a whole change request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullStats {
    pub additions: u64,
    pub deletions: u64,
    pub changed_files: u64,
}

/// Remaining-quota information reported by the provider.
#[derive(Debug, Clone, Copy)]
pub struct Quota {
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
}

/// Operations the collection pipeline needs from a source-control provider.
///
/// Every operation classifies its failures into [`ApiError`] so the retry
/// engine can act on the classification alone.
pub trait ActivitySource: Sync {
    /// List change requests merged at or after `since`.
    async fn merged_requests(&self, repo: &RepoSpec, since: DateTime<Utc>) -> Result<Vec<PullSummary>, ApiError>;

    /// List the commits contributing to one change request.
    async fn request_commits(&self, repo: &RepoSpec, number: u64) -> Result<Vec<RawCommit>, ApiError>;

    /// Fetch the line/file-change statistics of one change request.
    async fn request_stats(&self, repo: &RepoSpec, number: u64) -> Result<PullStats, ApiError>;

    /// List a repository's commits at or after `since`, with per-commit
    /// statistics.
    async fn commits_since(&self, repo: &RepoSpec, since: DateTime<Utc>) -> Result<Vec<RawCommit>, ApiError>;

    /// Fetch current quota information.
    async fn quota(&self) -> Result<Quota, ApiError>;
}
