use std::future::Future;
use std::time::Duration;

use bfs_types::result::make_error_msg;
use bfs_types::status_code::RPCCode;
use bfs_types::Result;

/// Run an outbound call under a deadline.
///
/// Elapsing the deadline drops the call and surfaces `RPC::Timeout`; the
/// caller is never left waiting past `timeout`.
pub async fn with_deadline<T, F>(timeout: Duration, op: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(op, ?timeout, "outbound call exceeded its deadline");
            make_error_msg(RPCCode::TIMEOUT, format!("{} timed out after {:?}", op, timeout))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bfs_types::status_code::{ErrorKind, StatusCode};

    #[tokio::test]
    async fn test_completes_within_deadline() {
        let v = with_deadline(Duration::from_secs(1), "fast", async { Ok(7u32) })
            .await
            .unwrap();
        assert_eq!(v, 7);
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let err = with_deadline(Duration::from_secs(1), "fails", async {
            make_error_msg::<u32>(StatusCode::INVALID_ARG, "bad")
        })
        .await
        .unwrap_err();
        assert_eq!(err.code(), StatusCode::INVALID_ARG);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_surfaces_timeout_kind() {
        let err = with_deadline(Duration::from_millis(50), "slow", async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }
}
