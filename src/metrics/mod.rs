use crate::metrics::errors::ErrorCounter;
use std::time::Duration;

pub mod database;
pub mod errors;
pub mod gauge;
pub mod no_operation;
pub mod volume;

/// Runs one list operation against the upstream API, bounded by `timeout`.
///
/// The future is dropped on every exit path, which aborts an in-flight request once the
/// deadline passes. Any failure, the timeout included, is counted under `resource`, logged
/// and reported as `None` so that the caller can skip this cycle.
pub(crate) async fn list_within<T, F>(
    resource: &'static str,
    errors: &ErrorCounter,
    timeout: Duration,
    list: F,
) -> Option<Vec<T>>
where
    F: Future<Output = anyhow::Result<Vec<T>>>,
{
    let result = match tokio::time::timeout(timeout, list).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!(
            "request timed out after {}ms",
            timeout.as_millis()
        )),
    };

    match result {
        Ok(items) => Some(items),
        Err(e) => {
            errors.inc(resource);
            tracing::warn!(resource, error = %format!("{:#}", e), "Failed to list {}s", resource);
            None
        }
    }
}
