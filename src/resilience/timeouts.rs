//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound how long a client may take to send its request
//! - Cancel the read cleanly when the deadline passes
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - No deadline configured means no timer is armed at all
//! - Timed-out requests get no response; the connection is closed

use std::future::Future;
use std::time::Duration;

/// The deadline passed before the operation completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("timed out after {0:?}")]
pub struct Elapsed(pub Duration);

/// Run `fut`, failing with [`Elapsed`] if `limit` is set and passes first.
pub async fn with_timeout<F>(limit: Option<Duration>, fut: F) -> Result<F::Output, Elapsed>
where
    F: Future,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| Elapsed(limit)),
        None => Ok(fut.await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_limit_waits_for_completion() {
        let value = with_timeout(None, async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            7
        })
        .await;
        assert_eq!(value, Ok(7));
    }

    #[tokio::test]
    async fn limit_cancels_slow_futures() {
        let limit = Duration::from_millis(10);
        let result = with_timeout(Some(limit), std::future::pending::<()>()).await;
        assert_eq!(result, Err(Elapsed(limit)));
    }
}
