use crate::core::rate::RateError;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Delay before the attempt following failed attempt `attempt` (0-based):
/// `base_delay * 2^attempt`.
pub fn backoff_delay(base_delay: Duration, attempt: u32) -> Duration {
    base_delay.saturating_mul(2u32.saturating_pow(attempt))
}

/// Runs an async operation up to `attempts` times with exponential backoff
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `attempts`: Total number of runs, including the first one
/// - `base_delay`: Delay after the first failure; doubled after each further failure
///
/// # Returns
/// Either the successful result or the last error. Errors that are not
/// retryable are returned immediately.
pub async fn with_backoff<F, Fut, T>(
    mut operation: F,
    attempts: usize,
    base_delay: Duration,
) -> Result<T, RateError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RateError>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) => {
                if attempt + 1 >= attempts {
                    return Err(err);
                }
                let delay = backoff_delay(base_delay, attempt as u32);
                debug!(
                    "Attempt {}/{} failed: {}. Retrying in {:?}...",
                    attempt + 1,
                    attempts,
                    err,
                    delay
                );
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
        }
    }
}
