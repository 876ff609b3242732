use async_trait::async_trait;

use crate::error::ImageResult;
use crate::models::{ImageRecord, NewImageRecord, RecordFilter};

/// Durable metadata table of image records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a row and return it with its assigned id
    async fn insert(&self, record: NewImageRecord) -> ImageResult<ImageRecord>;

    /// Rows matching `filter`, in table order
    async fn select(&self, filter: RecordFilter) -> ImageResult<Vec<ImageRecord>>;

    /// Delete rows matching `filter`; returns how many were removed
    async fn delete(&self, filter: RecordFilter) -> ImageResult<u64>;

    /// Readiness probe
    async fn ping(&self) -> ImageResult<()>;
}
