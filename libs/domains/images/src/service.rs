use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument};

use crate::deadline::{embedder_call, store_call};
use crate::embedding::EmbeddingProvider;
use crate::error::{ImageError, ImageResult};
use crate::index::normalize;
use crate::locks::KeyedLocks;
use crate::models::{
    ImageId, NewImageRecord, RecordFilter, SearchEntry, SearchHit, UploadOutcome,
};
use crate::reconciler::Reconciler;
use crate::state::{SearchState, SharedSearchState};
use crate::storage::{BlobStore, RecordStore};

pub const MISSING_DELETE_PARAMS: &str = "Missing id or filename";

/// Tunables for [`ImageService`]
#[derive(Debug, Clone)]
pub struct ImageServiceConfig {
    /// Embedding length D
    pub dimension: usize,
    pub store_timeout: Duration,
    pub embed_timeout: Duration,
}

impl Default for ImageServiceConfig {
    fn default() -> Self {
        Self {
            dimension: 512,
            store_timeout: Duration::from_secs(30),
            embed_timeout: Duration::from_secs(60),
        }
    }
}

/// Image service: upload, search, list and delete over the two durable stores
///
/// Every mutation and every read rebuilds the search state from the stores
/// before acting, then publishes it atomically.
pub struct ImageService<B: BlobStore, R: RecordStore> {
    blobs: B,
    records: R,
    embedder: Arc<dyn EmbeddingProvider>,
    config: ImageServiceConfig,
    state: SharedSearchState,
    filename_locks: KeyedLocks,
}

impl<B: BlobStore, R: RecordStore> ImageService<B, R> {
    pub fn new(
        blobs: B,
        records: R,
        embedder: Arc<dyn EmbeddingProvider>,
        config: ImageServiceConfig,
    ) -> ImageResult<Self> {
        if embedder.dimension() != config.dimension {
            return Err(ImageError::Config(format!(
                "embedder produces {} dimensions, service configured for {}",
                embedder.dimension(),
                config.dimension
            )));
        }

        Ok(Self {
            blobs,
            records,
            embedder,
            state: SharedSearchState::new(config.dimension),
            config,
            filename_locks: KeyedLocks::new(),
        })
    }

    pub fn config(&self) -> &ImageServiceConfig {
        &self.config
    }

    /// Last published search state, without touching the stores
    pub fn current_state(&self) -> Arc<SearchState> {
        self.state.load()
    }

    /// Reconcile both stores, rebuild the index and publish it.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> ImageResult<Arc<SearchState>> {
        let snapshot = Reconciler::new(
            &self.blobs,
            &self.records,
            self.config.dimension,
            self.config.store_timeout,
        )
        .reconcile()
        .await?;

        let state = SearchState::from_snapshot(self.config.dimension, snapshot)?;
        debug!(entries = state.len(), "Publishing search state");
        Ok(self.state.publish(state))
    }

    // ===== Mutations =====

    /// Store an image and its embedding.
    ///
    /// Re-uploading a filename keeps the existing blob and record and reports
    /// [`UploadOutcome::AlreadyExists`]. Same-filename uploads are serialized.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload(
        &self,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> ImageResult<UploadOutcome> {
        if filename.trim().is_empty() {
            return Err(ImageError::MissingParameter("Missing filename".to_string()));
        }

        let bytes = decode_check(bytes).await?;
        let embedding = self.embed_image(&bytes).await?;

        let _guard = self.filename_locks.lock(filename).await;

        let existing_blobs = self.store(self.blobs.list(), "blob list").await?;
        if existing_blobs.contains(filename) {
            debug!("Blob already present, skipping upload");
        } else {
            self.store(self.blobs.upload(filename, bytes, content_type), "blob upload")
                .await?;
        }
        let url = self.blobs.public_url(filename);

        let existing = self
            .store(
                self.records.select(RecordFilter::by_filename(filename)),
                "record select",
            )
            .await?;
        if let Some(record) = existing.into_iter().next() {
            info!(id = %record.id, "File already exists");
            return Ok(UploadOutcome::AlreadyExists { id: record.id });
        }

        let record = self
            .store(
                self.records.insert(NewImageRecord {
                    filename: filename.to_string(),
                    url,
                    embedding,
                }),
                "record insert",
            )
            .await?;

        self.refresh().await?;

        info!(id = %record.id, "Image uploaded");
        Ok(UploadOutcome::Created { id: record.id })
    }

    /// Remove an image's blob and its records by id.
    ///
    /// An already-missing blob is not an error. Returns the number of records removed.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Option<ImageId>, filename: Option<&str>) -> ImageResult<u64> {
        let (id, filename) = match (id, filename) {
            (Some(id), Some(filename)) if !id.is_blank() && !filename.trim().is_empty() => {
                (id, filename)
            }
            _ => return Err(ImageError::MissingParameter(MISSING_DELETE_PARAMS.to_string())),
        };

        let _guard = self.filename_locks.lock(filename).await;

        self.store(self.blobs.remove(&[filename.to_string()]), "blob remove")
            .await?;
        let removed = self
            .store(self.records.delete(RecordFilter::by_id(id)), "record delete")
            .await?;

        self.refresh().await?;

        info!(removed, "Image deleted");
        Ok(removed)
    }

    // ===== Queries =====

    /// Top `top_k` active images for a text query, best first.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, top_k: usize) -> ImageResult<Vec<SearchHit>> {
        let query_vector = self.embed_text(query).await?;
        let state = self.refresh().await?;
        state.search(&query_vector, top_k)
    }

    /// With a query: like [`search`](Self::search) but only positive similarities.
    /// Without one (or with a blank one): every active image once, first-seen
    /// filename wins, `top_k` ignored.
    #[instrument(skip(self))]
    pub async fn list(&self, query: Option<&str>, top_k: usize) -> ImageResult<Vec<SearchEntry>> {
        match query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(query) => {
                let hits = self.search(query, top_k).await?;
                Ok(hits
                    .into_iter()
                    .filter(|hit| hit.score > 0.0)
                    .map(|hit| hit.entry)
                    .collect())
            }
            None => {
                let state = self.refresh().await?;
                let mut seen = HashSet::new();
                Ok(state
                    .entries()
                    .iter()
                    .filter(|entry| seen.insert(entry.filename.clone()))
                    .cloned()
                    .collect())
            }
        }
    }

    // ===== Readiness =====

    pub async fn ping_blob_store(&self) -> ImageResult<()> {
        self.store(self.blobs.ping(), "blob ping").await
    }

    pub async fn ping_record_store(&self) -> ImageResult<()> {
        self.store(self.records.ping(), "record ping").await
    }

    // ===== Helpers =====

    async fn store<T>(
        &self,
        call: impl Future<Output = ImageResult<T>>,
        what: &str,
    ) -> ImageResult<T> {
        store_call(self.config.store_timeout, what, call).await
    }

    async fn embed_image(&self, bytes: &[u8]) -> ImageResult<Vec<f32>> {
        let vector = embedder_call(
            self.config.embed_timeout,
            "image embedding",
            self.embedder.embed_image(bytes),
        )
        .await?;
        self.checked_unit(vector)
    }

    async fn embed_text(&self, text: &str) -> ImageResult<Vec<f32>> {
        let vector = embedder_call(
            self.config.embed_timeout,
            "text embedding",
            self.embedder.embed_text(text),
        )
        .await?;
        self.checked_unit(vector)
    }

    fn checked_unit(&self, mut vector: Vec<f32>) -> ImageResult<Vec<f32>> {
        if vector.len() != self.config.dimension {
            return Err(ImageError::EmbedderUnavailable(format!(
                "expected {} dimensions, got {}",
                self.config.dimension,
                vector.len()
            )));
        }
        normalize(&mut vector);
        Ok(vector)
    }
}

/// Decode on the blocking pool; hands the bytes back when they are a valid image.
async fn decode_check(bytes: Vec<u8>) -> ImageResult<Vec<u8>> {
    tokio::task::spawn_blocking(move || {
        image::load_from_memory(&bytes)?;
        Ok(bytes)
    })
    .await
    .map_err(|e| ImageError::Internal(format!("image decode task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::MockEmbeddingProvider;
    use crate::storage::{InMemoryBlobStore, InMemoryRecordStore, MockBlobStore, MockRecordStore};
    use test_utils::TestDataBuilder;
    use test_utils::assertions::assert_sorted_desc;

    const D: usize = 4;

    fn config() -> ImageServiceConfig {
        ImageServiceConfig {
            dimension: D,
            store_timeout: Duration::from_secs(2),
            embed_timeout: Duration::from_secs(2),
        }
    }

    /// Embeds every image as `e_0` scaled by its byte length, and text by keyword.
    fn keyword_embedder() -> Arc<dyn EmbeddingProvider> {
        let mut embedder = MockEmbeddingProvider::new();
        embedder.expect_dimension().return_const(D);
        embedder
            .expect_embed_image()
            .returning(|bytes| Ok(TestDataBuilder::axis_vector(D, bytes.len() % D, 2.0)));
        embedder.expect_embed_text().returning(|text| {
            Ok(match text {
                "zero" => TestDataBuilder::axis_vector(D, 0, 1.0),
                "one" => TestDataBuilder::axis_vector(D, 1, 1.0),
                "anti-zero" => TestDataBuilder::axis_vector(D, 0, -1.0),
                _ => vec![0.5; D],
            })
        });
        Arc::new(embedder)
    }

    fn in_memory_service() -> (
        ImageService<InMemoryBlobStore, InMemoryRecordStore>,
        InMemoryBlobStore,
        InMemoryRecordStore,
    ) {
        let blobs = InMemoryBlobStore::new();
        let records = InMemoryRecordStore::new();
        let service = ImageService::new(
            blobs.clone(),
            records.clone(),
            keyword_embedder(),
            config(),
        )
        .unwrap();
        (service, blobs, records)
    }

    fn png(salt: u64) -> Vec<u8> {
        TestDataBuilder::new(1).png_bytes(2, 2, salt)
    }

    #[tokio::test]
    async fn test_new_rejects_dimension_mismatch() {
        let mut embedder = MockEmbeddingProvider::new();
        embedder.expect_dimension().return_const(8usize);

        let result = ImageService::new(
            InMemoryBlobStore::new(),
            InMemoryRecordStore::new(),
            Arc::new(embedder),
            config(),
        );
        assert!(matches!(result, Err(ImageError::Config(_))));
    }

    #[tokio::test]
    async fn test_upload_creates_blob_record_and_refreshes() {
        let (service, blobs, records) = in_memory_service();

        let outcome = service.upload("cat.png", "image/png", png(0)).await.unwrap();

        assert_eq!(outcome, UploadOutcome::Created { id: ImageId::Int(1) });
        assert_eq!(blobs.get("cat.png").await.unwrap().1, "image/png");
        assert_eq!(records.len().await, 1);
        assert_eq!(service.current_state().len(), 1);

        let stored = records.select(RecordFilter::by_filename("cat.png")).await.unwrap();
        let vector = stored[0].embedding.as_ref().unwrap().to_vector().unwrap();
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6, "stored embedding is normalized");
        assert_eq!(stored[0].url, blobs.public_url("cat.png"));
    }

    #[tokio::test]
    async fn test_second_upload_same_filename_already_exists() {
        let (service, _blobs, records) = in_memory_service();

        let first = service.upload("cat.png", "image/png", png(0)).await.unwrap();
        let second = service.upload("cat.png", "image/png", png(1)).await.unwrap();

        assert_eq!(second, UploadOutcome::AlreadyExists { id: first.id().clone() });
        assert_eq!(second.message(), "File already exists");
        assert_eq!(records.len().await, 1);
    }

    #[tokio::test]
    async fn test_upload_with_existing_blob_skips_blob_upload() {
        let (service, blobs, records) = in_memory_service();
        blobs.upload("cat.png", vec![9], "image/gif").await.unwrap();

        let outcome = service.upload("cat.png", "image/png", png(0)).await.unwrap();

        assert!(matches!(outcome, UploadOutcome::Created { .. }));
        assert_eq!(blobs.get("cat.png").await, Some((vec![9], "image/gif".to_string())));
        assert_eq!(records.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_same_filename_uploads_insert_once() {
        let (service, _blobs, records) = in_memory_service();
        let service = Arc::new(service);

        let uploads: Vec<_> = (0..6)
            .map(|i| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.upload("race.png", "image/png", png(i)).await })
            })
            .collect();

        let mut created = 0;
        for upload in uploads {
            if matches!(upload.await.unwrap().unwrap(), UploadOutcome::Created { .. }) {
                created += 1;
            }
        }

        assert_eq!(created, 1);
        assert_eq!(records.len().await, 1);
    }

    #[tokio::test]
    async fn test_upload_invalid_image_touches_nothing() {
        let (service, blobs, records) = in_memory_service();

        let err = service
            .upload("notes.txt", "text/plain", b"definitely not an image".to_vec())
            .await
            .unwrap_err();

        assert!(matches!(err, ImageError::InvalidImage(_)));
        assert!(blobs.is_empty().await);
        assert!(records.is_empty().await);
    }

    #[tokio::test]
    async fn test_upload_accepts_jpeg() {
        let (service, _blobs, _records) = in_memory_service();
        let jpeg = TestDataBuilder::new(3).jpeg_bytes(4, 4);

        let outcome = service.upload("photo.jpg", "image/jpeg", jpeg).await.unwrap();
        assert!(matches!(outcome, UploadOutcome::Created { .. }));
    }

    #[tokio::test]
    async fn test_upload_blank_filename_is_missing_parameter() {
        let (service, _blobs, _records) = in_memory_service();
        let err = service.upload("  ", "image/png", png(0)).await.unwrap_err();
        assert!(matches!(err, ImageError::MissingParameter(_)));
    }

    #[tokio::test]
    async fn test_search_returns_every_active_image_sorted() {
        let (service, _blobs, _records) = in_memory_service();
        service.upload("a.png", "image/png", png(0)).await.unwrap();
        service
            .upload("b.png", "image/png", TestDataBuilder::new(2).png_bytes(9, 7, 0))
            .await
            .unwrap();

        let hits = service.search("anything", 5).await.unwrap();
        assert_eq!(hits.len(), 2);
        let scores: Vec<f32> = hits.iter().map(|h| h.score).collect();
        assert_sorted_desc(&scores, "search");
    }

    #[tokio::test]
    async fn test_search_empty_collection_returns_empty() {
        let (service, _blobs, _records) = in_memory_service();
        assert!(service.search("cat", 5).await.unwrap().is_empty());
        assert!(service.list(Some("cat"), 10).await.unwrap().is_empty());
        assert!(service.list(None, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_top_k_zero_and_oversized() {
        let (service, _blobs, _records) = in_memory_service();
        service.upload("a.png", "image/png", png(0)).await.unwrap();

        assert!(service.search("zero", 0).await.unwrap().is_empty());
        assert_eq!(service.search("zero", 100).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_with_query_drops_non_positive_scores() {
        let (service, blobs, records) = in_memory_service();
        for (name, axis) in [("right.png", 0), ("up.png", 1), ("left.png", 0)] {
            let scale = if name == "left.png" { -1.0 } else { 1.0 };
            records
                .insert(NewImageRecord {
                    filename: name.to_string(),
                    url: blobs.public_url(name),
                    embedding: TestDataBuilder::axis_vector(D, axis, scale),
                })
                .await
                .unwrap();
            blobs.upload(name, vec![0], "image/png").await.unwrap();
        }

        let search: Vec<String> = service
            .search("zero", 10)
            .await
            .unwrap()
            .into_iter()
            .map(|h| h.entry.filename)
            .collect();
        assert_eq!(search, ["right.png", "up.png", "left.png"]);

        let listed: Vec<String> = service
            .list(Some("zero"), 10)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.filename)
            .collect();
        assert_eq!(listed, ["right.png"]);
    }

    #[tokio::test]
    async fn test_list_without_query_dedupes_and_hides_orphans() {
        let (service, blobs, records) = in_memory_service();
        for name in ["a.png", "b.png", "a.png", "orphan.png"] {
            records
                .insert(NewImageRecord {
                    filename: name.to_string(),
                    url: blobs.public_url(name),
                    embedding: TestDataBuilder::axis_vector(D, 0, 1.0),
                })
                .await
                .unwrap();
        }
        blobs.upload("a.png", vec![0], "image/png").await.unwrap();
        blobs.upload("b.png", vec![0], "image/png").await.unwrap();

        let listed = service.list(None, 1).await.unwrap();
        let ids: Vec<_> = listed.iter().map(|e| (e.id.clone(), e.filename.as_str())).collect();
        assert_eq!(ids, [(ImageId::Int(1), "a.png"), (ImageId::Int(2), "b.png")]);

        let blank = service.list(Some("   "), 1).await.unwrap();
        assert_eq!(blank.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_removes_blob_and_record() {
        let (service, blobs, records) = in_memory_service();
        let outcome = service.upload("cat.png", "image/png", png(0)).await.unwrap();

        let removed = service
            .delete(Some(outcome.id().clone()), Some("cat.png"))
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert!(blobs.is_empty().await);
        assert!(records.is_empty().await);
        assert!(service.current_state().is_empty());
        assert!(service.list(None, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_blob_is_success() {
        let (service, _blobs, _records) = in_memory_service();
        let removed = service
            .delete(Some(ImageId::Int(99)), Some("ghost.png"))
            .await
            .unwrap();
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn test_delete_requires_id_and_filename() {
        let (service, _blobs, _records) = in_memory_service();

        for (id, filename) in [
            (None, Some("a.png")),
            (Some(ImageId::Int(1)), None),
            (Some(ImageId::Text(String::new())), Some("a.png")),
            (Some(ImageId::Int(1)), Some("")),
        ] {
            let err = service.delete(id, filename).await.unwrap_err();
            assert!(
                matches!(err, ImageError::MissingParameter(ref m) if m == MISSING_DELETE_PARAMS)
            );
        }
    }

    #[tokio::test]
    async fn test_delete_blob_then_record_failure_leaves_orphan_hidden() {
        let blobs = InMemoryBlobStore::new();
        blobs.upload("cat.png", vec![0], "image/png").await.unwrap();

        let mut records = MockRecordStore::new();
        records
            .expect_delete()
            .returning(|_| Err(ImageError::StoreUnavailable("table locked".into())));
        records.expect_select().returning(|_| {
            Ok(vec![crate::models::ImageRecord {
                id: ImageId::Int(1),
                filename: "cat.png".into(),
                url: "u".into(),
                embedding: Some(vec![1.0, 0.0, 0.0, 0.0].into()),
            }])
        });

        let service =
            ImageService::new(blobs.clone(), records, keyword_embedder(), config()).unwrap();

        let err = service
            .delete(Some(ImageId::Int(1)), Some("cat.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::StoreUnavailable(_)));

        // Row still exists but its blob is gone, so reads no longer see it
        assert!(service.list(None, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_embedder_failure_surfaces() {
        let mut embedder = MockEmbeddingProvider::new();
        embedder.expect_dimension().return_const(D);
        embedder
            .expect_embed_text()
            .returning(|_| Err(ImageError::EmbedderUnavailable("503".into())));

        let service = ImageService::new(
            InMemoryBlobStore::new(),
            InMemoryRecordStore::new(),
            Arc::new(embedder),
            config(),
        )
        .unwrap();

        let err = service.search("cat", 5).await.unwrap_err();
        assert!(matches!(err, ImageError::EmbedderUnavailable(_)));
    }

    #[tokio::test]
    async fn test_embedder_wrong_length_is_unavailable() {
        let mut embedder = MockEmbeddingProvider::new();
        embedder.expect_dimension().return_const(D);
        embedder.expect_embed_text().returning(|_| Ok(vec![1.0; D + 1]));

        let service = ImageService::new(
            InMemoryBlobStore::new(),
            InMemoryRecordStore::new(),
            Arc::new(embedder),
            config(),
        )
        .unwrap();

        let err = service.search("cat", 5).await.unwrap_err();
        assert!(matches!(err, ImageError::EmbedderUnavailable(_)));
    }

    /// Blob store whose every call outlives any deadline
    struct HangingBlobStore;

    #[async_trait::async_trait]
    impl BlobStore for HangingBlobStore {
        async fn upload(&self, _: &str, _: Vec<u8>, _: &str) -> ImageResult<()> {
            std::future::pending().await
        }

        async fn list(&self) -> ImageResult<HashSet<String>> {
            std::future::pending().await
        }

        async fn remove(&self, _: &[String]) -> ImageResult<()> {
            std::future::pending().await
        }

        fn public_url(&self, key: &str) -> String {
            key.to_string()
        }

        async fn ping(&self) -> ImageResult<()> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_blob_store_times_out_as_unavailable() {
        let service = ImageService::new(
            HangingBlobStore,
            InMemoryRecordStore::new(),
            keyword_embedder(),
            config(),
        )
        .unwrap();

        let err = service.upload("a.png", "image/png", png(0)).await.unwrap_err();
        assert!(matches!(err, ImageError::StoreUnavailable(ref m) if m.contains("timed out")));

        let err = service.ping_blob_store().await.unwrap_err();
        assert!(matches!(err, ImageError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn test_store_failure_during_search_is_unavailable() {
        let mut blobs = MockBlobStore::new();
        blobs
            .expect_list()
            .returning(|| Err(ImageError::StoreUnavailable("connection refused".into())));

        let service =
            ImageService::new(blobs, InMemoryRecordStore::new(), keyword_embedder(), config())
                .unwrap();

        let err = service.search("cat", 5).await.unwrap_err();
        assert!(matches!(err, ImageError::StoreUnavailable(_)));
        let err = service.list(None, 10).await.unwrap_err();
        assert!(matches!(err, ImageError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn test_pings_delegate_to_stores() {
        let mut blobs = MockBlobStore::new();
        blobs.expect_ping().returning(|| Ok(()));
        let mut records = MockRecordStore::new();
        records
            .expect_ping()
            .returning(|| Err(ImageError::StoreUnavailable("down".into())));

        let service = ImageService::new(blobs, records, keyword_embedder(), config()).unwrap();
        assert!(service.ping_blob_store().await.is_ok());
        assert!(service.ping_record_store().await.is_err());
    }
}
