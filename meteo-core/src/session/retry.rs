//! Retry budget for the HTTP session.
//!
//! The retrying itself is done by [`RetryTransientMiddleware`]: connection
//! errors, timeouts, 5xx, 408 and 429 are transient, everything else goes back
//! to the caller on the first attempt.

use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{Jitter, RetryTransientMiddleware, policies::ExponentialBackoff};
use std::time::Duration;

use crate::config::CacheConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub retries: u32,
    /// Delay in seconds before the first retry; doubles for every further one.
    pub backoff_factor: f64,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(cfg: &CacheConfig) -> Self {
        Self {
            retries: cfg.retries,
            backoff_factor: cfg.backoff_factor,
            max_backoff: Duration::try_from_secs_f64(cfg.max_backoff_secs).unwrap_or(Duration::ZERO),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Delay before the first retry, never above the cap.
    pub fn first_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.backoff_factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// `first_delay * 2^(n-1)` before retry n, capped at `max_backoff`.
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::builder()
            .retry_bounds(self.first_delay(), self.max_backoff)
            .jitter(Jitter::None)
            .build_with_max_retries(self.retries)
    }

    /// Put the retry middleware in front of `client`.
    pub fn wrap(&self, client: reqwest::Client) -> ClientWithMiddleware {
        ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(self.backoff()))
            .build()
    }
}

/// Whether the middleware would have retried `error`, i.e. whether the whole
/// budget was spent before it surfaced.
pub fn is_transient(error: &reqwest_middleware::Error) -> bool {
    match error {
        reqwest_middleware::Error::Reqwest(e) => is_transient_transport(e),
        reqwest_middleware::Error::Middleware(e) => e.chain().any(|cause| {
            cause
                .downcast_ref::<reqwest_middleware::Error>()
                .is_some_and(is_transient)
                || cause.downcast_ref::<reqwest::Error>().is_some_and(is_transient_transport)
        }),
    }
}

fn is_transient_transport(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect()
}

/// Statuses the middleware retries; seeing one means retries ran out.
pub fn is_transient_status(status: reqwest::StatusCode) -> bool {
    status.is_server_error()
        || status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn policy_follows_cache_config() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.retries, 5);
        assert_eq!(policy.max_attempts(), 6);
        assert_eq!(policy.first_delay(), Duration::from_millis(200));
        assert_eq!(policy.max_backoff, Duration::from_secs(30));
    }

    #[test]
    fn first_delay_never_exceeds_cap() {
        let policy = RetryPolicy {
            retries: 3,
            backoff_factor: 10.0,
            max_backoff: Duration::from_secs(2),
        };
        assert_eq!(policy.first_delay(), Duration::from_secs(2));

        let disabled = RetryPolicy { retries: 0, backoff_factor: 0.0, max_backoff: Duration::ZERO };
        assert_eq!(disabled.first_delay(), Duration::ZERO);
        assert_eq!(disabled.max_attempts(), 1);
    }

    #[test]
    fn attempts_saturate() {
        let policy = RetryPolicy { retries: u32::MAX, ..RetryPolicy::default() };
        assert_eq!(policy.max_attempts(), u32::MAX);
    }

    #[test]
    fn only_transient_statuses_are_retried() {
        for status in [
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::GATEWAY_TIMEOUT,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::REQUEST_TIMEOUT,
        ] {
            assert!(is_transient_status(status), "{status}");
        }

        for status in [StatusCode::OK, StatusCode::BAD_REQUEST, StatusCode::NOT_FOUND, StatusCode::FORBIDDEN] {
            assert!(!is_transient_status(status), "{status}");
        }
    }

    #[test]
    fn middleware_errors_without_transport_cause_are_fatal() {
        let err = reqwest_middleware::Error::Middleware(anyhow::anyhow!("policy rejected request"));
        assert!(!is_transient(&err));
    }
}
