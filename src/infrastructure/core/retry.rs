//! Exponential-backoff retry for transient bridge failures, wrapped around
//! every bridge call before it reaches the [`super::circuit_breaker::CircuitBreaker`]
//! so that an exhausted retry sequence counts as a single circuit-breaker
//! failure rather than several.

use std::time::Duration;

use tracing::warn;

use crate::domain::errors::ErrorKind;
use crate::infrastructure::observability::metrics::Metrics;

/// Base delay before the first retry; doubles on each subsequent attempt.
const BASE_DELAY: Duration = Duration::from_secs(1);

/// Total attempts including the first, non-retried call.
const MAX_ATTEMPTS: u32 = 3;

/// Runs `f` up to [`MAX_ATTEMPTS`] times, retrying only on
/// [`ErrorKind::is_retryable`] errors, doubling the delay between attempts
/// starting from [`BASE_DELAY`]. Any non-retryable error, or the final
/// exhausted attempt, is returned immediately.
pub async fn retry_with_backoff<F, Fut, T>(operation_name: &str, f: F) -> Result<T, ErrorKind>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, ErrorKind>>,
{
    retry_with_backoff_metered(operation_name, None, f).await
}

/// Same as [`retry_with_backoff`], additionally recording one
/// `bridge_retries_total` increment per retried attempt when `metrics` is
/// supplied.
pub async fn retry_with_backoff_metered<F, Fut, T>(
    operation_name: &str,
    metrics: Option<&Metrics>,
    mut f: F,
) -> Result<T, ErrorKind>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, ErrorKind>>,
{
    let mut delay = BASE_DELAY;
    let mut last_err = None;

    for attempt in 1..=MAX_ATTEMPTS {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < MAX_ATTEMPTS => {
                warn!(operation = operation_name, attempt, error = %e, "retrying after transient failure");
                if let Some(m) = metrics {
                    m.inc_bridge_retry(operation_name);
                }
                tokio::time::sleep(delay).await;
                delay *= 2;
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err.expect("loop always runs at least once"))
}
