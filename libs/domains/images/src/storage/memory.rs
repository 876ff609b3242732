use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

use super::{BlobStore, RecordStore};
use crate::error::ImageResult;
use crate::models::{ImageId, ImageRecord, NewImageRecord, RecordFilter};

#[derive(Debug, Clone)]
struct StoredBlob {
    bytes: Vec<u8>,
    content_type: String,
}

/// Process-local blob store for development and tests
#[derive(Clone)]
pub struct InMemoryBlobStore {
    public_base: String,
    blobs: Arc<RwLock<HashMap<String, StoredBlob>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::with_public_base("http://localhost/storage/images")
    }

    pub fn with_public_base(public_base: impl Into<String>) -> Self {
        Self {
            public_base: public_base.into(),
            blobs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Bytes and content type stored under `key`
    pub async fn get(&self, key: &str) -> Option<(Vec<u8>, String)> {
        let blobs = self.blobs.read().await;
        blobs
            .get(key)
            .map(|b| (b.bytes.clone(), b.content_type.clone()))
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> ImageResult<()> {
        let mut blobs = self.blobs.write().await;
        blobs.entry(key.to_string()).or_insert_with(|| StoredBlob {
            bytes,
            content_type: content_type.to_string(),
        });
        Ok(())
    }

    async fn list(&self) -> ImageResult<HashSet<String>> {
        let blobs = self.blobs.read().await;
        Ok(blobs.keys().cloned().collect())
    }

    async fn remove(&self, keys: &[String]) -> ImageResult<()> {
        let mut blobs = self.blobs.write().await;
        for key in keys {
            blobs.remove(key);
        }
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "{}/{}",
            self.public_base.trim_end_matches('/'),
            urlencoding::encode(key)
        )
    }

    async fn ping(&self) -> ImageResult<()> {
        Ok(())
    }
}

/// Process-local record table with sequential integer ids.
///
/// Filename uniqueness is not enforced, so tests can stage duplicate rows.
#[derive(Clone)]
pub struct InMemoryRecordStore {
    records: Arc<RwLock<Vec<ImageRecord>>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn insert(&self, record: NewImageRecord) -> ImageResult<ImageRecord> {
        let id = ImageId::Int(self.next_id.fetch_add(1, Ordering::SeqCst));
        let stored = ImageRecord {
            id,
            filename: record.filename,
            url: record.url,
            embedding: Some(record.embedding.into()),
        };

        self.records.write().await.push(stored.clone());

        tracing::debug!(id = %stored.id, filename = %stored.filename, "Inserted record");
        Ok(stored)
    }

    async fn select(&self, filter: RecordFilter) -> ImageResult<Vec<ImageRecord>> {
        let records = self.records.read().await;
        Ok(records.iter().filter(|r| filter.matches(r)).cloned().collect())
    }

    async fn delete(&self, filter: RecordFilter) -> ImageResult<u64> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| !filter.matches(r));
        Ok((before - records.len()) as u64)
    }

    async fn ping(&self) -> ImageResult<()> {
        Ok(())
    }
}
