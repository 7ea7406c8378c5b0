//! Bounded exponential-backoff retry for outbound backend calls

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::error::{Error, Result};

/// Run `f` with bounded exponential backoff
///
/// The call is attempted `max_retries + 1` times; after a failed attempt `n`
/// (zero-based) the wrapper sleeps `base_delay_ms * 2^n`. Rate-limit-looking
/// errors get a distinct log line but are retried like everything else.
/// Exhaustion surfaces the last observed error as a transient-backend error.
pub async fn with_retry<T, F, Fut>(operation: &str, config: &RetryConfig, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error: Option<Error> = None;

    for attempt in 0..=config.max_retries {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if e.is_rate_limit() {
                    warn!(operation, attempt, "backend rate limited: {}", e);
                } else {
                    debug!(operation, attempt, "backend call failed: {}", e);
                }
                last_error = Some(e);

                if attempt < config.max_retries {
                    let delay = config.base_delay_ms * 2u64.pow(attempt);
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
            }
        }
    }

    let attempts = config.max_retries + 1;
    let message = last_error
        .map(|e| e.to_string())
        .unwrap_or_else(|| "unknown error".to_string());
    warn!(operation, attempts, "backend call exhausted retries");
    Err(Error::TransientBackend { attempts, message })
}
