//! Per-call deadlines for the external collaborators.

use std::future::Future;
use std::time::Duration;

use crate::error::{ImageError, ImageResult};

/// Run a blob/record store call; elapsing `limit` is `StoreUnavailable`.
pub async fn store_call<T, F>(limit: Duration, what: &str, call: F) -> ImageResult<T>
where
    F: Future<Output = ImageResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ImageError::StoreUnavailable(format!(
            "{} timed out after {:?}",
            what, limit
        ))),
    }
}

/// Run an embedder call; elapsing `limit` is `EmbedderUnavailable`.
pub async fn embedder_call<T, F>(limit: Duration, what: &str, call: F) -> ImageResult<T>
where
    F: Future<Output = ImageResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ImageError::EmbedderUnavailable(format!(
            "{} timed out after {:?}",
            what, limit
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_store_call_times_out() {
        let result: ImageResult<()> = store_call(Duration::from_secs(1), "list", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(ImageError::StoreUnavailable(msg)) if msg.contains("list")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_embedder_call_times_out() {
        let result: ImageResult<()> = embedder_call(Duration::from_millis(10), "embed", async {
            std::future::pending().await
        })
        .await;

        assert!(matches!(result, Err(ImageError::EmbedderUnavailable(_))));
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let result: ImageResult<()> = store_call(Duration::from_secs(1), "insert", async {
            Err(ImageError::InvalidImage("nope".into()))
        })
        .await;

        assert!(matches!(result, Err(ImageError::InvalidImage(_))));
    }
}
