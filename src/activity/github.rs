//! GitHub REST implementation of [`ActivitySource`].
//!
//! This is the only module that sees HTTP status codes, headers, and wire
//! DTOs. Every failure leaves here already classified as an [`ApiError`].

use super::error::ApiError;
use super::repo_spec::RepoSpec;
use super::source::{ActivitySource, PullStats, PullSummary, Quota, RawCommit};
use crate::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use core::time::Duration;
use ohno::{IntoAppError, app_err};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, LINK, RETRY_AFTER};
use serde::Deserialize;
use serde::de::DeserializeOwned;

const LOG_TARGET: &str = "    github";

pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("repo-pulse/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";

const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

/// Items requested per page.
const PAGE_SIZE: usize = 100;

/// Most pages followed for any one listing.
const MAX_PAGES: usize = 10;

/// Most commits per repository enriched with per-commit statistics.
const MAX_COMMIT_DETAILS: usize = 50;

/// GitHub-backed activity source.
#[derive(Debug)]
pub struct GithubSource {
    http: reqwest::Client,
    base_url: String,
    strict_forbidden: bool,
}

impl GithubSource {
    /// Create a source talking to `base_url` (the public API when `None`),
    /// optionally authenticated with a bearer token.
    ///
    /// `strict_forbidden` controls how a 403 without any throttling signal is
    /// classified: as a terminal permission failure when `true`, as an
    /// unsignalled rate limit when `false`.
    pub fn new(token: Option<&str>, base_url: Option<&str>, strict_forbidden: bool) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        let _ = headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));

        if let Some(token) = token {
            let mut auth = HeaderValue::from_str(&format!("Bearer {token}")).into_app_err("building auth header")?;
            auth.set_sensitive(true);
            let _ = headers.insert(AUTHORIZATION, auth);
        }

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .into_app_err("building HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/').to_string(),
            strict_forbidden,
        })
    }

    /// Fetch one page, returning the decoded body and whether the provider
    /// advertises a next page.
    async fn get_page<T: DeserializeOwned>(&self, url: &str) -> Result<(T, bool), ApiError> {
        log::debug!(target: LOG_TARGET, "GET {url}");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::Transient(app_err!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.classify_response(status.as_u16(), response.headers()));
        }

        let has_next = has_next_page(response.headers());
        let body = response
            .json()
            .await
            .map_err(|e| ApiError::Transient(app_err!("decoding response from {url}: {e}")))?;

        Ok((body, has_next))
    }

    /// Fetch every page of a listing, up to [`MAX_PAGES`].
    ///
    /// `make_url` receives a 1-based page number.
    async fn get_all_pages<T: DeserializeOwned>(
        &self,
        make_url: impl Fn(usize) -> String,
    ) -> Result<Vec<T>, ApiError> {
        let mut items = Vec::new();

        for page in 1..=MAX_PAGES {
            let (mut page_items, has_next): (Vec<T>, _) = self.get_page(&make_url(page)).await?;
            items.append(&mut page_items);

            if !has_next {
                return Ok(items);
            }
        }

        log::debug!(target: LOG_TARGET, "stopping after {MAX_PAGES} pages");
        Ok(items)
    }

    fn classify_response(&self, status: u16, headers: &HeaderMap) -> ApiError {
        classify_failure(
            status,
            parse_reset(headers),
            parse_retry_after(headers),
            quota_exhausted(headers),
            self.strict_forbidden,
        )
    }

    fn repo_url(&self, repo: &RepoSpec, tail: &str) -> String {
        format!("{}/repos/{}/{}/{tail}", self.base_url, repo.owner(), repo.repo())
    }
}

/// Map a failed response onto an [`ApiError`].
///
/// A 403 is a rate limit whenever it carries any throttling signal (a
/// cooldown header or an exhausted quota); a bare 403 is a permission
/// failure under `strict_forbidden` and an unsignalled rate limit otherwise.
fn classify_failure(
    status: u16,
    reset_at: Option<DateTime<Utc>>,
    retry_after: Option<Duration>,
    quota_exhausted: bool,
    strict_forbidden: bool,
) -> ApiError {
    match status {
        401 => ApiError::Unauthorized,
        404 => ApiError::NotFound,
        429 => ApiError::RateLimited { reset_at, retry_after },
        403 if retry_after.is_some() || quota_exhausted => ApiError::RateLimited { reset_at, retry_after },
        403 if strict_forbidden => ApiError::PermissionDenied,
        403 => ApiError::RateLimited {
            reset_at: None,
            retry_after: None,
        },
        _ => ApiError::Transient(app_err!("unexpected response status {status}")),
    }
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Quota reset time from `x-ratelimit-reset` (epoch seconds).
fn parse_reset(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    let epoch = header_str(headers, RATE_LIMIT_RESET)?.parse::<i64>().ok()?;
    DateTime::from_timestamp(epoch, 0)
}

/// Cooldown from `retry-after`, which GitHub sends in whole seconds.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let seconds = headers.get(RETRY_AFTER)?.to_str().ok()?.parse::<u64>().ok()?;
    Some(Duration::from_secs(seconds))
}

fn quota_exhausted(headers: &HeaderMap) -> bool {
    header_str(headers, RATE_LIMIT_REMAINING).is_some_and(|v| v == "0")
}

/// Cut a commit listing at the per-repository statistics budget.
///
/// Commits past the budget are dropped outright; a commit without real
/// statistics must never reach the aggregate.
fn cap_to_detail_budget(mut items: Vec<CommitItem>) -> Vec<CommitItem> {
    if items.len() > MAX_COMMIT_DETAILS {
        log::debug!(
            target: LOG_TARGET,
            "dropping {} commits past the statistics budget",
            items.len() - MAX_COMMIT_DETAILS
        );
        items.truncate(MAX_COMMIT_DETAILS);
    }
    items
}

/// Whether the `link` header advertises a next page.
fn has_next_page(headers: &HeaderMap) -> bool {
    headers
        .get(LINK)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|link| link.split(',').any(|part| part.contains("rel=\"next\"")))
}

#[derive(Debug, Deserialize)]
struct PullItem {
    number: u64,
    title: String,
    body: Option<String>,
    merged_at: Option<DateTime<Utc>>,
    merge_commit_sha: Option<String>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct PullDetail {
    additions: u64,
    deletions: u64,
    changed_files: u64,
}

#[derive(Debug, Deserialize)]
struct CommitMeta {
    message: String,
}

#[derive(Debug, Deserialize)]
struct CommitItem {
    sha: String,
    commit: CommitMeta,
}

#[derive(Debug, Default, Deserialize)]
struct CommitStats {
    additions: u64,
    deletions: u64,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    sha: String,
    commit: CommitMeta,

    #[serde(default)]
    stats: CommitStats,

    #[serde(default)]
    files: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RateLimitCore {
    remaining: u64,
    reset: i64,
}

#[derive(Debug, Deserialize)]
struct RateLimitResources {
    core: RateLimitCore,
}

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    resources: RateLimitResources,
}

impl ActivitySource for GithubSource {
    /// List change requests merged at or after `since`.
    ///
    /// Pages through closed requests in most-recently-updated order and
    /// stops as soon as a page item was last updated before `since`, since
    /// nothing older can have been merged within the window.
    async fn merged_requests(&self, repo: &RepoSpec, since: DateTime<Utc>) -> Result<Vec<PullSummary>, ApiError> {
        let mut merged = Vec::new();

        for page in 1..=MAX_PAGES {
            let url = self.repo_url(
                repo,
                &format!("pulls?state=closed&sort=updated&direction=desc&per_page={PAGE_SIZE}&page={page}"),
            );
            let (items, has_next): (Vec<PullItem>, _) = self.get_page(&url).await?;

            for item in items {
                if item.updated_at < since {
                    return Ok(merged);
                }

                if let Some(merged_at) = item.merged_at {
                    if merged_at >= since {
                        merged.push(PullSummary {
                            number: item.number,
                            title: item.title,
                            body: item.body,
                            merged_at,
                            merge_commit_sha: item.merge_commit_sha,
                        });
                    }
                }
            }

            if !has_next {
                break;
            }
        }

        Ok(merged)
    }

    async fn request_commits(&self, repo: &RepoSpec, number: u64) -> Result<Vec<RawCommit>, ApiError> {
        let items: Vec<CommitItem> = self
            .get_all_pages(|page| {
                self.repo_url(repo, &format!("pulls/{number}/commits?per_page={PAGE_SIZE}&page={page}"))
            })
            .await?;

        // The listing carries no per-commit statistics.
        Ok(items
            .into_iter()
            .map(|item| RawCommit {
                sha: item.sha,
                message: item.commit.message,
                additions: 0,
                deletions: 0,
                changed_files: 0,
            })
            .collect())
    }

    async fn request_stats(&self, repo: &RepoSpec, number: u64) -> Result<PullStats, ApiError> {
        let url = self.repo_url(repo, &format!("pulls/{number}"));
        let (detail, _): (PullDetail, _) = self.get_page(&url).await?;

        Ok(PullStats {
            additions: detail.additions,
            deletions: detail.deletions,
            changed_files: detail.changed_files,
        })
    }

    /// List commits at or after `since` with per-commit statistics.
    ///
    /// The listing is cut at [`MAX_COMMIT_DETAILS`] commits; everything
    /// returned carries fetched statistics, never placeholder zeros.
    async fn commits_since(&self, repo: &RepoSpec, since: DateTime<Utc>) -> Result<Vec<RawCommit>, ApiError> {
        let since = since.to_rfc3339_opts(SecondsFormat::Secs, true);
        let items: Vec<CommitItem> = self
            .get_all_pages(|page| {
                self.repo_url(repo, &format!("commits?since={since}&per_page={PAGE_SIZE}&page={page}"))
            })
            .await?;

        let items = cap_to_detail_budget(items);

        let mut commits = Vec::with_capacity(items.len());
        for item in items {
            let url = self.repo_url(repo, &format!("commits/{}", item.sha));
            let (detail, _): (CommitDetail, _) = self.get_page(&url).await?;

            commits.push(RawCommit {
                sha: detail.sha,
                message: detail.commit.message,
                additions: detail.stats.additions,
                deletions: detail.stats.deletions,
                changed_files: detail.files.len() as u64,
            });
        }

        Ok(commits)
    }

    async fn quota(&self) -> Result<Quota, ApiError> {
        let url = format!("{}/rate_limit", self.base_url);
        let (body, _): (RateLimitBody, _) = self.get_page(&url).await?;

        Ok(Quota {
            remaining: body.resources.core.remaining,
            reset_at: DateTime::from_timestamp(body.resources.core.reset, 0).unwrap_or_else(Utc::now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            let _ = map.insert(
                reqwest::header::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn classifies_auth_and_missing_resources() {
        assert!(matches!(classify_failure(401, None, None, false, true), ApiError::Unauthorized));
        assert!(matches!(classify_failure(404, None, None, false, true), ApiError::NotFound));
    }

    #[test]
    fn classifies_429_as_rate_limited() {
        let err = classify_failure(429, None, Some(Duration::from_secs(30)), false, true);
        assert!(matches!(
            err,
            ApiError::RateLimited {
                retry_after: Some(d),
                ..
            } if d == Duration::from_secs(30)
        ));
    }

    #[test]
    fn classifies_403_with_throttling_signal_as_rate_limited() {
        let err = classify_failure(403, None, Some(Duration::from_secs(10)), false, true);
        assert!(matches!(err, ApiError::RateLimited { .. }));

        let err = classify_failure(403, Some(Utc::now()), None, true, true);
        assert!(matches!(err, ApiError::RateLimited { reset_at: Some(_), .. }));
    }

    #[test]
    fn classifies_bare_403_by_strictness() {
        assert!(matches!(classify_failure(403, None, None, false, true), ApiError::PermissionDenied));
        assert!(matches!(
            classify_failure(403, None, None, false, false),
            ApiError::RateLimited {
                reset_at: None,
                retry_after: None
            }
        ));
    }

    #[test]
    fn classifies_server_errors_as_transient() {
        for status in [500, 502, 503] {
            assert!(matches!(classify_failure(status, None, None, false, true), ApiError::Transient(_)));
        }
    }

    #[test]
    fn parses_rate_limit_headers() {
        let map = headers(&[
            ("x-ratelimit-remaining", "0"),
            ("x-ratelimit-reset", "1704067200"),
            ("retry-after", "42"),
        ]);

        assert!(quota_exhausted(&map));
        assert_eq!(parse_reset(&map), DateTime::from_timestamp(1_704_067_200, 0));
        assert_eq!(parse_retry_after(&map), Some(Duration::from_secs(42)));
    }

    #[test]
    fn tolerates_missing_or_garbled_headers() {
        let map = headers(&[("x-ratelimit-reset", "soon"), ("retry-after", "later")]);

        assert!(!quota_exhausted(&map));
        assert!(parse_reset(&map).is_none());
        assert!(parse_retry_after(&map).is_none());
    }

    #[test]
    fn detects_next_page_links() {
        let map = headers(&[(
            "link",
            "<https://api.github.com/x?page=2>; rel=\"next\", <https://api.github.com/x?page=5>; rel=\"last\"",
        )]);
        assert!(has_next_page(&map));

        let map = headers(&[("link", "<https://api.github.com/x?page=1>; rel=\"prev\"")]);
        assert!(!has_next_page(&map));

        assert!(!has_next_page(&HeaderMap::new()));
    }

    #[test]
    fn commit_listings_are_cut_at_the_statistics_budget() {
        let items: Vec<_> = (0..MAX_COMMIT_DETAILS + 10)
            .map(|n| CommitItem {
                sha: format!("{n:012}"),
                commit: CommitMeta {
                    message: format!("commit {n}"),
                },
            })
            .collect();

        // Listed order is preserved and the tail is dropped entirely, so no
        // commit can ever surface with placeholder zero statistics.
        let capped = cap_to_detail_budget(items);
        assert_eq!(capped.len(), MAX_COMMIT_DETAILS);
        assert_eq!(capped[0].sha, "000000000000");
        assert_eq!(capped[MAX_COMMIT_DETAILS - 1].commit.message, format!("commit {}", MAX_COMMIT_DETAILS - 1));
    }

    #[test]
    fn short_commit_listings_pass_through() {
        let items = vec![CommitItem {
            sha: "abc".to_string(),
            commit: CommitMeta {
                message: "fix".to_string(),
            },
        }];

        assert_eq!(cap_to_detail_budget(items).len(), 1);
    }

    #[test]
    fn deserializes_pull_items() {
        let json = r#"{
            "number": 42,
            "title": "add widget",
            "body": null,
            "merged_at": "2025-06-01T12:00:00Z",
            "merge_commit_sha": "abc123",
            "updated_at": "2025-06-01T12:00:00Z"
        }"#;

        let item: PullItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.number, 42);
        assert!(item.body.is_none());
        assert!(item.merged_at.is_some());
    }

    #[test]
    fn deserializes_commit_details_without_stats() {
        let json = r#"{"sha": "abc123", "commit": {"message": "fix"}}"#;

        let detail: CommitDetail = serde_json::from_str(json).unwrap();
        assert_eq!(detail.stats.additions, 0);
        assert!(detail.files.is_empty());
    }

    #[test]
    fn deserializes_rate_limit_body() {
        let json = r#"{"resources": {"core": {"limit": 5000, "remaining": 4999, "reset": 1704067200, "used": 1}}}"#;

        let body: RateLimitBody = serde_json::from_str(json).unwrap();
        assert_eq!(body.resources.core.remaining, 4999);
    }
}
