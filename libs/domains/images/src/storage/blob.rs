use async_trait::async_trait;
use std::collections::HashSet;

use crate::error::ImageResult;

/// Keyed byte storage for uploaded images; keys are filenames
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key`. Uploading a key that already exists is not an error.
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> ImageResult<()>;

    /// Every key currently present
    async fn list(&self) -> ImageResult<HashSet<String>>;

    /// Remove the given keys; keys that are already absent are ignored
    async fn remove(&self, keys: &[String]) -> ImageResult<()>;

    /// Public locator for `key`; does not check existence
    fn public_url(&self, key: &str) -> String;

    /// Readiness probe
    async fn ping(&self) -> ImageResult<()>;
}
