//! Rendering collected activity into a readable report.

use crate::Result;
use crate::activity::{RepoActivity, RunActivity};
use chrono::NaiveDate;
use core::fmt::Write;

/// Renders a collected run into a report.
pub trait Summarizer {
    fn summarize(&self, window_start: NaiveDate, activity: &RunActivity) -> Result<String>;
}

/// Plain-text digest, deterministic over its input: repositories appear in
/// name order, items in the order they were collected.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDigest;

impl Summarizer for TextDigest {
    fn summarize(&self, window_start: NaiveDate, activity: &RunActivity) -> Result<String> {
        let mut names: Vec<_> = activity.keys().collect();
        names.sort();

        let mut out = String::new();
        let _ = writeln!(out, "Activity since {window_start}");
        let _ = writeln!(out, "{}", "=".repeat(40));

        for name in names {
            let repo = &activity[name];
            let _ = writeln!(out);
            let _ = writeln!(out, "{name}");

            if repo.merged.is_empty() && repo.commits.is_empty() {
                let _ = writeln!(out, "  no activity");
                continue;
            }

            render_repo(&mut out, repo);
        }

        Ok(out)
    }
}

fn render_repo(out: &mut String, repo: &RepoActivity) {
    let _ = writeln!(
        out,
        "  {} merged, {} direct commits, +{} -{} across {} files",
        repo.merged.len(),
        repo.commits.len(),
        repo.totals.additions,
        repo.totals.deletions,
        repo.totals.changed_files
    );

    for merged in &repo.merged {
        let _ = writeln!(
            out,
            "  #{} {} (merged {}, +{} -{})",
            merged.number,
            merged.title,
            merged.merged_at.format("%Y-%m-%d"),
            merged.additions,
            merged.deletions
        );

        if !merged.description.is_empty() {
            for line in merged.description.lines() {
                let _ = writeln!(out, "      {line}");
            }
        }

        for commit in &merged.commits {
            let _ = writeln!(out, "      {} {}", commit.sha, commit.summary);
        }
    }

    for commit in &repo.commits {
        let _ = writeln!(out, "  {} {} (+{} -{})", commit.sha, commit.summary, commit.additions, commit.deletions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{ChangeTotals, CommitInfo, CommitRef, MergedRequest, RepoActivity};
    use chrono::Utc;

    fn window() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn busy_repo() -> RepoActivity {
        RepoActivity {
            merged: vec![MergedRequest {
                number: 12,
                title: "add widget".to_string(),
                description: "does widget things".to_string(),
                merged_at: Utc::now(),
                merge_commit_sha: Some("m".to_string()),
                commits: vec![CommitRef {
                    sha: "abc1234".to_string(),
                    summary: "widget work".to_string(),
                }],
                additions: 10,
                deletions: 2,
                changed_files: 3,
            }],
            commits: vec![CommitInfo {
                sha: "def5678".to_string(),
                summary: "direct fix".to_string(),
                additions: 1,
                deletions: 1,
                changed_files: 1,
            }],
            totals: ChangeTotals {
                additions: 11,
                deletions: 3,
                changed_files: 4,
            },
        }
    }

    #[test]
    fn repositories_appear_in_name_order() {
        let activity = RunActivity::from([
            ("z/last".to_string(), RepoActivity::default()),
            ("a/first".to_string(), RepoActivity::default()),
        ]);

        let text = TextDigest.summarize(window(), &activity).unwrap();
        let first = text.find("a/first").unwrap();
        let last = text.find("z/last").unwrap();
        assert!(first < last);
    }

    #[test]
    fn quiet_repositories_are_marked() {
        let activity = RunActivity::from([("a/quiet".to_string(), RepoActivity::default())]);

        let text = TextDigest.summarize(window(), &activity).unwrap();
        assert!(text.contains("no activity"));
    }

    #[test]
    fn active_repositories_list_their_items() {
        let activity = RunActivity::from([("a/busy".to_string(), busy_repo())]);

        let text = TextDigest.summarize(window(), &activity).unwrap();
        assert!(text.contains("#12 add widget"));
        assert!(text.contains("does widget things"));
        assert!(text.contains("abc1234 widget work"));
        assert!(text.contains("def5678 direct fix (+1 -1)"));
        assert!(text.contains("1 merged, 1 direct commits, +11 -3 across 4 files"));
    }

    #[test]
    fn header_names_the_window() {
        let text = TextDigest.summarize(window(), &RunActivity::new()).unwrap();
        assert!(text.starts_with("Activity since 2025-06-01"));
    }
}
