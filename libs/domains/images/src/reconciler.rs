use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::deadline::store_call;
use crate::error::ImageResult;
use crate::models::{RecordFilter, SearchEntry};
use crate::storage::{BlobStore, RecordStore};

/// Active records, row-aligned: `vectors[i]` belongs to `entries[i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub vectors: Vec<Vec<f32>>,
    pub entries: Vec<SearchEntry>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Rebuilds the searchable set from the two durable stores.
///
/// A record is active only while its blob exists. Records whose blob is gone are
/// dropped silently; records whose stored embedding is unusable are dropped with a
/// warning. Either store failing fails the whole call.
pub struct Reconciler<'a, B: ?Sized, R: ?Sized> {
    blobs: &'a B,
    records: &'a R,
    dimension: usize,
    store_timeout: Duration,
}

impl<'a, B, R> Reconciler<'a, B, R>
where
    B: BlobStore + ?Sized,
    R: RecordStore + ?Sized,
{
    pub fn new(blobs: &'a B, records: &'a R, dimension: usize, store_timeout: Duration) -> Self {
        Self {
            blobs,
            records,
            dimension,
            store_timeout,
        }
    }

    #[instrument(skip(self))]
    pub async fn reconcile(&self) -> ImageResult<Snapshot> {
        let (rows, existing) = tokio::try_join!(
            store_call(
                self.store_timeout,
                "record select",
                self.records.select(RecordFilter::all())
            ),
            store_call(self.store_timeout, "blob list", self.blobs.list()),
        )?;

        let total = rows.len();
        let mut snapshot = Snapshot::default();

        for row in rows {
            if !existing.contains(&row.filename) {
                debug!(id = %row.id, filename = %row.filename, "Dropping record without blob");
                continue;
            }

            let vector = match row.embedding.as_ref().map(|e| e.to_vector()) {
                Some(Ok(v)) if v.len() == self.dimension => v,
                Some(Ok(v)) => {
                    warn!(
                        id = %row.id,
                        filename = %row.filename,
                        got = v.len(),
                        expected = self.dimension,
                        "Skipping record with wrong embedding dimension"
                    );
                    continue;
                }
                Some(Err(e)) => {
                    warn!(
                        id = %row.id,
                        filename = %row.filename,
                        error = %e,
                        "Skipping record with malformed embedding"
                    );
                    continue;
                }
                None => {
                    warn!(
                        id = %row.id,
                        filename = %row.filename,
                        "Skipping record without embedding"
                    );
                    continue;
                }
            };

            snapshot.vectors.push(vector);
            snapshot.entries.push(SearchEntry::from(&row));
        }

        debug!(
            kept = snapshot.len(),
            dropped = total - snapshot.len(),
            "Reconciled stores"
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImageError;
    use crate::models::{ImageId, ImageRecord, NewImageRecord, StoredEmbedding};
    use crate::storage::{InMemoryBlobStore, InMemoryRecordStore, MockBlobStore, MockRecordStore};
    use std::collections::HashSet;

    const TIMEOUT: Duration = Duration::from_secs(5);

    async fn seed(
        records: &InMemoryRecordStore,
        blobs: &InMemoryBlobStore,
        name: &str,
        v: Vec<f32>,
        with_blob: bool,
    ) {
        records
            .insert(NewImageRecord {
                filename: name.to_string(),
                url: format!("http://x/{}", name),
                embedding: v,
            })
            .await
            .unwrap();
        if with_blob {
            blobs.upload(name, vec![0], "image/png").await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_keeps_only_records_with_blobs_in_fetch_order() {
        let blobs = InMemoryBlobStore::new();
        let records = InMemoryRecordStore::new();
        seed(&records, &blobs, "a.png", vec![1.0, 0.0], true).await;
        seed(&records, &blobs, "orphan.png", vec![0.0, 1.0], false).await;
        seed(&records, &blobs, "b.png", vec![0.5, 0.5], true).await;

        let snapshot = Reconciler::new(&blobs, &records, 2, TIMEOUT)
            .reconcile()
            .await
            .unwrap();

        let names: Vec<_> = snapshot.entries.iter().map(|e| e.filename.as_str()).collect();
        assert_eq!(names, ["a.png", "b.png"]);
        assert_eq!(snapshot.vectors, vec![vec![1.0, 0.0], vec![0.5, 0.5]]);
    }

    #[tokio::test]
    async fn test_empty_stores_reconcile_to_empty_snapshot() {
        let blobs = InMemoryBlobStore::new();
        let records = InMemoryRecordStore::new();

        let snapshot = Reconciler::new(&blobs, &records, 2, TIMEOUT)
            .reconcile()
            .await
            .unwrap();
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_skips_unusable_embeddings() {
        let mut records = MockRecordStore::new();
        records.expect_select().returning(|_| {
            let row = |id: i64, name: &str, embedding: Option<StoredEmbedding>| ImageRecord {
                id: ImageId::Int(id),
                filename: name.to_string(),
                url: String::new(),
                embedding,
            };
            Ok(vec![
                row(1, "good.png", Some(StoredEmbedding::Text("[1,0]".into()))),
                row(2, "short.png", Some(StoredEmbedding::Values(vec![1.0]))),
                row(3, "garbled.png", Some(StoredEmbedding::Text("oops".into()))),
                row(4, "null.png", None),
            ])
        });

        let mut blobs = MockBlobStore::new();
        blobs.expect_list().returning(|| {
            Ok(["good.png", "short.png", "garbled.png", "null.png"]
                .into_iter()
                .map(String::from)
                .collect::<HashSet<_>>())
        });

        let snapshot = Reconciler::new(&blobs, &records, 2, TIMEOUT)
            .reconcile()
            .await
            .unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.entries[0].filename, "good.png");
        assert_eq!(snapshot.vectors[0], vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_record_store_failure_is_not_an_empty_result() {
        let mut records = MockRecordStore::new();
        records
            .expect_select()
            .returning(|_| Err(ImageError::StoreUnavailable("down".into())));
        let mut blobs = MockBlobStore::new();
        blobs.expect_list().returning(|| Ok(HashSet::new()));

        let err = Reconciler::new(&blobs, &records, 2, TIMEOUT)
            .reconcile()
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn test_blob_store_failure_propagates() {
        let mut records = MockRecordStore::new();
        records.expect_select().returning(|_| Ok(vec![]));
        let mut blobs = MockBlobStore::new();
        blobs
            .expect_list()
            .returning(|| Err(ImageError::StoreUnavailable("bucket gone".into())));

        let err = Reconciler::new(&blobs, &records, 2, TIMEOUT)
            .reconcile()
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::StoreUnavailable(msg) if msg.contains("bucket gone")));
    }
}
