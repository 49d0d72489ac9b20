//! Turning raw provider data into the per-repository activity model.
//!
//! The aggregator deduplicates direct commits against the commits already
//! represented by merged change requests, drops synthetic merge commits,
//! caps the direct-commit list, and folds per-item statistics into totals.

use super::source::{PullStats, PullSummary, RawCommit};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Prefix of the synthetic commit message the provider generates when
/// merging a change request through its UI.
const MERGE_COMMIT_MARKER: &str = "Merge pull request";

/// Most direct commits retained per repository.
const MAX_DIRECT_COMMITS: usize = 50;

/// Longest change-request description retained, in characters.
const MAX_DESCRIPTION_CHARS: usize = 500;

/// Length of a shortened commit identifier.
const SHORT_SHA_LEN: usize = 7;

/// Running totals of line and file changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeTotals {
    pub additions: u64,
    pub deletions: u64,
    pub changed_files: u64,
}

impl ChangeTotals {
    fn absorb(&mut self, additions: u64, deletions: u64, changed_files: u64) {
        self.additions += additions;
        self.deletions += deletions;
        self.changed_files += changed_files;
    }
}

/// A direct commit as it appears in the digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Shortened commit identifier.
    pub sha: String,

    /// First line of the commit message.
    pub summary: String,

    pub additions: u64,
    pub deletions: u64,
    pub changed_files: u64,
}

/// A commit contributing to a merged change request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRef {
    /// Shortened commit identifier.
    pub sha: String,

    /// First line of the commit message.
    pub summary: String,
}

/// A merged change request as it appears in the digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedRequest {
    pub number: u64,
    pub title: String,

    /// Description truncated to [`MAX_DESCRIPTION_CHARS`] characters; empty
    /// when the request had none.
    pub description: String,

    pub merged_at: DateTime<Utc>,
    pub merge_commit_sha: Option<String>,
    pub commits: Vec<CommitRef>,
    pub additions: u64,
    pub deletions: u64,
    pub changed_files: u64,
}

/// A merged change request with its raw statistics and contributing commits,
/// as assembled by the collector before aggregation.
#[derive(Debug, Clone)]
pub struct MergedPull {
    pub summary: PullSummary,
    pub stats: PullStats,
    pub commits: Vec<RawCommit>,
}

/// Everything collected for one repository over the window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoActivity {
    pub merged: Vec<MergedRequest>,
    pub commits: Vec<CommitInfo>,
    pub totals: ChangeTotals,
}

/// Collected activity for a whole run, keyed by `owner/repo`.
pub type RunActivity = HashMap<String, RepoActivity>;

/// Build one repository's activity from its merged change requests and its
/// direct-commit listing.
///
/// Direct commits whose identifiers already appear among a merged request's
/// contributing commits or merge commit are dropped, as are synthetic merge
/// commits. At most [`MAX_DIRECT_COMMITS`] direct commits survive, in the
/// order the provider listed them.
#[must_use]
pub fn aggregate(merged: Vec<MergedPull>, direct: Vec<RawCommit>) -> RepoActivity {
    let mut represented: HashSet<String> = HashSet::new();
    for pull in &merged {
        if let Some(sha) = &pull.summary.merge_commit_sha {
            let _ = represented.insert(sha.clone());
        }
        for commit in &pull.commits {
            let _ = represented.insert(commit.sha.clone());
        }
    }

    let mut totals = ChangeTotals::default();

    let merged = merged
        .into_iter()
        .map(|pull| {
            totals.absorb(pull.stats.additions, pull.stats.deletions, pull.stats.changed_files);

            MergedRequest {
                number: pull.summary.number,
                title: pull.summary.title,
                description: truncate_chars(pull.summary.body.unwrap_or_default(), MAX_DESCRIPTION_CHARS),
                merged_at: pull.summary.merged_at,
                merge_commit_sha: pull.summary.merge_commit_sha,
                commits: pull
                    .commits
                    .into_iter()
                    .map(|c| CommitRef {
                        summary: first_line(&c.message),
                        sha: short_sha(c.sha),
                    })
                    .collect(),
                additions: pull.stats.additions,
                deletions: pull.stats.deletions,
                changed_files: pull.stats.changed_files,
            }
        })
        .collect();

    let commits: Vec<_> = direct
        .into_iter()
        .filter(|c| !represented.contains(&c.sha))
        .filter(|c| !c.message.starts_with(MERGE_COMMIT_MARKER))
        .take(MAX_DIRECT_COMMITS)
        .map(|c| {
            totals.absorb(c.additions, c.deletions, c.changed_files);

            CommitInfo {
                summary: first_line(&c.message),
                sha: short_sha(c.sha),
                additions: c.additions,
                deletions: c.deletions,
                changed_files: c.changed_files,
            }
        })
        .collect();

    RepoActivity { merged, commits, totals }
}

fn first_line(message: &str) -> String {
    message.lines().next().unwrap_or_default().to_string()
}

fn short_sha(mut sha: String) -> String {
    sha.truncate(
        sha.char_indices()
            .nth(SHORT_SHA_LEN)
            .map_or(sha.len(), |(index, _)| index),
    );
    sha
}

/// Truncate to at most `max_chars` characters, never splitting a character.
fn truncate_chars(mut text: String, max_chars: usize) -> String {
    if let Some((index, _)) = text.char_indices().nth(max_chars) {
        text.truncate(index);
    }
    text
}
