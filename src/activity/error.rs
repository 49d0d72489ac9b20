use chrono::{DateTime, Utc};
use core::fmt::{Display, Formatter};
use core::time::Duration;

/// Classification of a failed remote operation.
///
/// Classification happens once, at the HTTP boundary; everything downstream
/// (retry engine, orchestrator) matches on this enum and never on raw
/// transport shapes like status codes or headers.
#[derive(Debug)]
pub enum ApiError {
    /// The requested resource does not exist (404). Terminal, never retried.
    NotFound,

    /// Missing or invalid credentials (401). Terminal, never retried.
    Unauthorized,

    /// Authenticated but not allowed (403 without a throttling signal).
    /// Terminal, never retried.
    PermissionDenied,

    /// The provider asked us to back off. Not counted against the retry
    /// budget; the retry engine waits until `reset_at` (or for
    /// `retry_after`) and re-issues the attempt.
    RateLimited {
        /// Provider-declared quota reset time, if known.
        reset_at: Option<DateTime<Utc>>,

        /// Provider-declared cooldown, if known.
        retry_after: Option<Duration>,
    },

    /// A failure that may succeed on a later attempt (5xx, transport errors).
    Transient(ohno::AppError),
}

impl ApiError {
    /// Returns `true` for classifications that retrying cannot resolve.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::NotFound | Self::Unauthorized | Self::PermissionDenied)
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "resource not found"),
            Self::Unauthorized => write!(f, "unauthorized: missing or invalid credentials"),
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::RateLimited { reset_at: Some(reset), .. } => write!(f, "rate limited until {reset}"),
            Self::RateLimited { .. } => write!(f, "rate limited"),
            Self::Transient(e) => write!(f, "transient failure: {e:#}"),
        }
    }
}

impl core::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use ohno::app_err;

    #[test]
    fn terminal_classifications() {
        assert!(ApiError::NotFound.is_terminal());
        assert!(ApiError::Unauthorized.is_terminal());
        assert!(ApiError::PermissionDenied.is_terminal());
    }

    #[test]
    fn non_terminal_classifications() {
        assert!(
            !ApiError::RateLimited {
                reset_at: None,
                retry_after: None
            }
            .is_terminal()
        );
        assert!(!ApiError::Transient(app_err!("boom")).is_terminal());
    }

    #[test]
    fn display_includes_reset_time() {
        let reset = DateTime::from_timestamp(1_704_067_200, 0).unwrap();
        let err = ApiError::RateLimited {
            reset_at: Some(reset),
            retry_after: None,
        };
        assert!(err.to_string().contains("2024"));
    }

    #[test]
    fn display_without_reset_time() {
        let err = ApiError::RateLimited {
            reset_at: None,
            retry_after: Some(Duration::from_secs(30)),
        };
        assert_eq!(err.to_string(), "rate limited");
    }
}
