//! Bounded retry with exponential backoff and rate-limit awareness.
//!
//! Wraps a single fallible remote operation. Terminal errors propagate
//! immediately, transient errors consume the retry budget, and rate-limit
//! signals are absorbed by waiting without consuming the budget.

use super::error::ApiError;
use chrono::{DateTime, Utc};
use core::time::Duration;

const LOG_TARGET: &str = "     retry";

/// Extra wait added on top of a provider-declared reset time, absorbing
/// small clock skew between this machine and the provider.
const RATE_LIMIT_MARGIN: Duration = Duration::from_secs(1);

/// Upper bound on a single rate-limit wait.
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(3600);

/// Retry configuration for a single remote operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed on top of the original attempt.
    pub max_retries: u32,

    /// Delay before the first retry; doubles on each subsequent retry.
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Policy for call sites that want rate-limit awareness but no retry
    /// budget for transient failures.
    #[must_use]
    pub const fn no_retries() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::from_millis(500),
        }
    }

    /// Backoff delay before retry `attempt` (1-indexed).
    fn backoff_delay(self, attempt: u32) -> Duration {
        // Cap the exponent so pathological policies can't overflow the shift.
        self.initial_delay.saturating_mul(1u32 << (attempt - 1).min(16))
    }
}

/// Execute `op` under `policy`, returning its first success or the last
/// observed error once the budget is exhausted.
///
/// At most `policy.max_retries + 1` attempts are made. Terminal
/// classifications propagate immediately. A rate-limit signal never consumes
/// a retry slot: the engine sleeps until the provider's declared reset time
/// (plus a safety margin) or for its declared cooldown, then re-issues the
/// same attempt. A rate-limit signal carrying neither a reset time nor a
/// cooldown degrades to transient handling.
pub async fn retry<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut failures = 0u32;

    loop {
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if err.is_terminal() {
            return Err(err);
        }

        if let ApiError::RateLimited { reset_at, retry_after } = &err {
            if let Some(wait) = rate_limit_wait(*reset_at, *retry_after) {
                log::warn!(
                    target: LOG_TARGET,
                    "rate limited, waiting {}s before re-issuing attempt {}",
                    wait.as_secs(),
                    failures + 1
                );
                tokio::time::sleep(wait).await;
                continue;
            }
            // Neither a reset time nor a cooldown: nothing to wait on, so
            // fall through to transient handling.
        }

        failures += 1;
        if failures > policy.max_retries {
            return Err(err);
        }

        let delay = policy.backoff_delay(failures);
        log::warn!(
            target: LOG_TARGET,
            "attempt {failures} failed ({err}), retrying in {}ms",
            delay.as_millis()
        );
        tokio::time::sleep(delay).await;
    }
}

/// How long to wait out a rate limit. `None` when the signal carries neither
/// a reset timestamp nor a cooldown.
fn rate_limit_wait(reset_at: Option<DateTime<Utc>>, retry_after: Option<Duration>) -> Option<Duration> {
    let wait = match (reset_at, retry_after) {
        (Some(reset), _) => {
            // A reset time in the past clamps to zero; the margin still applies.
            let until_reset = (reset - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            until_reset + RATE_LIMIT_MARGIN
        }
        (None, Some(cooldown)) => cooldown,
        (None, None) => return None,
    };

    Some(wait.min(MAX_RATE_LIMIT_WAIT))
}
