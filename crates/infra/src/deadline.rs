//! Per-operation deadlines for store calls.

use std::future::Future;
use std::time::Duration;

use warden_core::{ServiceError, ServiceResult};

/// Run `operation` under `limit`.
///
/// On expiry the inner future is dropped, which rolls back any open `sqlx`
/// transaction it owns, and the caller gets an internal error.
pub async fn with_deadline<T, F>(limit: Duration, operation: &'static str, fut: F) -> ServiceResult<T>
where
    F: Future<Output = ServiceResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, timeout_ms = limit.as_millis() as u64, "deadline exceeded");
            Err(ServiceError::internal(format!("{operation} exceeded its deadline of {limit:?}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::ErrorKind;

    #[tokio::test]
    async fn completes_within_deadline() {
        let out = with_deadline(Duration::from_secs(1), "fast", async { Ok::<_, ServiceError>(7) }).await;
        assert_eq!(out.unwrap(), 7);
    }

    #[tokio::test]
    async fn inner_errors_pass_through() {
        let out: ServiceResult<()> =
            with_deadline(Duration::from_secs(1), "lookup", async { Err(ServiceError::not_found("role")) }).await;
        assert_eq!(out.unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn slow_operation_becomes_internal_error() {
        let out: ServiceResult<()> = with_deadline(Duration::from_millis(10), "slow", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert_eq!(out.unwrap_err().kind(), ErrorKind::Internal);
    }
}
