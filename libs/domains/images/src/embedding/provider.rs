use async_trait::async_trait;

use crate::error::ImageResult;

/// Trait for the vision-language model that maps images and text into one vector space
///
/// Returned vectors have length [`dimension`](EmbeddingProvider::dimension) and are
/// not assumed to be normalized.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Length of every vector this provider returns
    fn dimension(&self) -> usize;

    /// Embed encoded image bytes (PNG, JPEG, ...)
    async fn embed_image(&self, bytes: &[u8]) -> ImageResult<Vec<f32>>;

    /// Embed a natural-language query
    async fn embed_text(&self, text: &str) -> ImageResult<Vec<f32>>;
}
