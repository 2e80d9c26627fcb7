//! Shared HTTP send loop for the provider clients

use std::time::Duration;

use reqwest::{RequestBuilder, Response};
use tracing::{debug, warn};

use super::LlmError;

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Default wait when a 429 carries no retry-after header
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Check if an HTTP status code is retryable
pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 500 | 502 | 503 | 504 | 529)
}

/// Exponential delay before retry `attempt` (1-based), saturating for large counts
fn backoff_ms(attempt: u32) -> u64 {
    INITIAL_BACKOFF_MS.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

/// Send a JSON request, retrying transient failures up to `max_retries` times
///
/// `build` is called once per attempt since a sent `RequestBuilder` is consumed.
/// Rate limits are never retried here; they surface as `LlmError::RateLimited`.
pub(crate) async fn send_with_retries<F>(
    provider: &str,
    build: F,
    max_retries: u32,
    timeout: Duration,
) -> Result<Response, LlmError>
where
    F: Fn() -> RequestBuilder,
{
    debug!(%provider, max_retries, "send_with_retries: called");
    let mut last_error = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let backoff = backoff_ms(attempt);
            warn!(%provider, attempt, backoff_ms = backoff, "send_with_retries: retrying after transient error");
            tokio::time::sleep(Duration::from_millis(backoff)).await;
        }

        let response = match build().send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                debug!(%provider, attempt, "send_with_retries: request timed out");
                last_error = Some(LlmError::Timeout(timeout));
                continue;
            }
            Err(e) => {
                debug!(%provider, attempt, error = %e, "send_with_retries: network error");
                last_error = Some(LlmError::Network(e));
                continue;
            }
        };

        let status = response.status().as_u16();

        if status == 429 {
            debug!(%provider, "send_with_retries: rate limited (429)");
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);

            return Err(LlmError::RateLimited {
                provider: provider.to_string(),
                retry_after: Duration::from_secs(retry_after),
            });
        }

        if is_retryable_status(status) && attempt < max_retries {
            let text = response.text().await.unwrap_or_default();
            debug!(%provider, attempt, status, "send_with_retries: retryable error");
            last_error = Some(LlmError::Api {
                provider: provider.to_string(),
                status,
                message: text,
            });
            continue;
        }

        if !response.status().is_success() {
            debug!(%provider, %status, "send_with_retries: API error");
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                provider: provider.to_string(),
                status,
                message: text,
            });
        }

        debug!(%provider, "send_with_retries: success");
        return Ok(response);
    }

    Err(last_error.unwrap_or_else(|| LlmError::InvalidResponse("Max retries exceeded".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(503));
        assert!(is_retryable_status(529));
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(401));
        // 429 is reported as RateLimited rather than retried
        assert!(!is_retryable_status(429));
    }

    #[test]
    fn test_backoff_doubles_and_saturates() {
        assert_eq!(backoff_ms(1), 1000);
        assert_eq!(backoff_ms(2), 2000);
        assert_eq!(backoff_ms(4), 8000);
        assert_eq!(backoff_ms(60), u64::MAX);
        assert_eq!(backoff_ms(u32::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn test_unreachable_host_reports_network_error() {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(500))
            .build()
            .unwrap();

        let result = send_with_retries(
            "test",
            || http.post("http://127.0.0.1:9/v1/messages").json(&serde_json::json!({})),
            0,
            Duration::from_millis(500),
        )
        .await;

        let err = result.unwrap_err();
        assert!(err.is_retryable());
    }
}
