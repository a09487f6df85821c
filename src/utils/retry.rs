// Retry logic with Google retryDelay hint support
// Author: kelexine (https://github.com/kelexine)

use crate::error::{CacheError, Result};
use backoff::{backoff::Backoff, ExponentialBackoff};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Parse Google's retryDelay duration string (e.g., "0.457639761s", "40s")
/// Returns duration in milliseconds, capped at 60 seconds
pub fn parse_retry_delay(error_json: &str) -> Option<Duration> {
    let parsed: Value = serde_json::from_str(error_json).ok()?;

    // Navigate: error.details[] -> find RetryInfo -> retryDelay
    let details = parsed.get("error")?.get("details")?.as_array()?;

    for detail in details {
        if detail.get("@type")?.as_str()? == "type.googleapis.com/google.rpc.RetryInfo" {
            if let Some(retry_delay) = detail.get("retryDelay").and_then(|v| v.as_str()) {
                return parse_duration_string(retry_delay);
            }
        }
    }

    None
}

/// Parse duration strings like "0.457639761s", "40s", "1.5s"
/// Returns duration, capped at 60 seconds
fn parse_duration_string(duration_str: &str) -> Option<Duration> {
    let seconds_str = duration_str.strip_suffix('s')?;
    let seconds: f64 = seconds_str.parse().ok()?;

    let capped_seconds = seconds.min(60.0);

    let millis = (capped_seconds * 1000.0) as u64;
    Some(Duration::from_millis(millis))
}

/// Create exponential backoff configuration for retries
pub fn create_backoff() -> ExponentialBackoff {
    ExponentialBackoff {
        current_interval: Duration::from_millis(500),     // Start at 500ms
        initial_interval: Duration::from_millis(500),
        randomization_factor: 0.3,                         // Add jitter
        multiplier: 2.0,                                  // Double each time
        max_interval: Duration::from_secs(30),            // Cap at 30s
        max_elapsed_time: Some(Duration::from_secs(120)), // Give up after 2 minutes
        ..Default::default()
    }
}

/// Determine if an HTTP status code is retryable
pub fn is_retryable(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Execute a remote call with transport-level retry.
/// - Only retryable errors are repeated, at most `max_retries` extra times
/// - Uses Google's retryDelay hint if the error body carries one
/// - Falls back to exponential backoff
pub async fn with_retry<F, Fut, T>(
    operation_name: &str,
    max_retries: u32,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut backoff = create_backoff();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", operation_name, attempt);
                }
                return Ok(result);
            }
            Err(error) => {
                if !error.is_retryable() || attempt > max_retries {
                    return Err(error);
                }

                let hint = match &error {
                    CacheError::RemoteUnavailable { message, .. } => parse_retry_delay(message),
                    _ => None,
                };

                let delay = match hint {
                    Some(google_delay) => {
                        debug!(
                            "{} failed (attempt {}), Google suggests waiting {}ms",
                            operation_name,
                            attempt,
                            google_delay.as_millis()
                        );
                        google_delay
                    }
                    None => {
                        let backoff_delay = backoff.next_backoff().unwrap_or(Duration::from_secs(30));
                        warn!(
                            "{} failed: {} (attempt {}), retrying after {}ms",
                            operation_name,
                            error,
                            attempt,
                            backoff_delay.as_millis()
                        );
                        backoff_delay
                    }
                };

                tokio::time::sleep(delay).await;
            }
        }
    }
}
