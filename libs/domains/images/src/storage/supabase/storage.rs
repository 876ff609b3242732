use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, instrument};

use super::{SupabaseConfig, build_client, error_for_status, transport_error};
use crate::error::{ImageError, ImageResult};
use crate::storage::BlobStore;

/// Blob store backed by a Supabase Storage bucket
pub struct SupabaseBlobStore {
    client: Client,
    config: SupabaseConfig,
}

impl SupabaseBlobStore {
    pub fn new(config: SupabaseConfig) -> ImageResult<Self> {
        Ok(Self {
            client: build_client(&config)?,
            config,
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.config.url,
            urlencoding::encode(&self.config.bucket),
            urlencoding::encode(key)
        )
    }

    fn bucket_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/{}/{}",
            self.config.url,
            path,
            urlencoding::encode(&self.config.bucket)
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListRequest<'a> {
    prefix: &'a str,
    limit: usize,
    offset: usize,
    sort_by: SortBy,
}

#[derive(Debug, Serialize)]
struct SortBy {
    column: &'static str,
    order: &'static str,
}

#[derive(Debug, Deserialize)]
struct ListedObject {
    name: String,
}

#[derive(Debug, Serialize)]
struct RemoveRequest<'a> {
    prefixes: &'a [String],
}

/// Storage answers a re-upload of an existing key with 409, or 400 carrying a
/// `Duplicate` error body depending on version.
fn is_duplicate(status: StatusCode, body: &str) -> bool {
    status == StatusCode::CONFLICT
        || (status == StatusCode::BAD_REQUEST
            && (body.contains("Duplicate") || body.contains("already exists")))
}

#[async_trait]
impl BlobStore for SupabaseBlobStore {
    #[instrument(skip(self, bytes), fields(bucket = %self.config.bucket, size = bytes.len()))]
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> ImageResult<()> {
        let response = self
            .client
            .post(self.object_url(key))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| transport_error("blob upload", e))?;

        let status = response.status();
        if status.is_success() {
            debug!("Blob uploaded");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if is_duplicate(status, &body) {
            debug!("Blob already present");
            return Ok(());
        }

        Err(ImageError::StoreUnavailable(format!(
            "blob upload failed ({}): {}",
            status, body
        )))
    }

    /// Pages through the bucket until a short page comes back.
    #[instrument(skip(self), fields(bucket = %self.config.bucket))]
    async fn list(&self) -> ImageResult<HashSet<String>> {
        let page_size = self.config.list_page_size;
        let mut names = HashSet::new();
        let mut offset = 0;

        loop {
            let request = ListRequest {
                prefix: "",
                limit: page_size,
                offset,
                sort_by: SortBy {
                    column: "name",
                    order: "asc",
                },
            };

            let response = self
                .client
                .post(self.bucket_url("object/list"))
                .json(&request)
                .send()
                .await
                .map_err(|e| transport_error("blob list", e))?;

            let page: Vec<ListedObject> = error_for_status("blob list", response)
                .await?
                .json()
                .await
                .map_err(|e| transport_error("blob list decode", e))?;

            let fetched = page.len();
            names.extend(page.into_iter().map(|o| o.name));

            if fetched < page_size {
                break;
            }
            offset += fetched;
        }

        debug!(count = names.len(), "Listed blobs");
        Ok(names)
    }

    #[instrument(skip(self), fields(bucket = %self.config.bucket))]
    async fn remove(&self, keys: &[String]) -> ImageResult<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .delete(self.bucket_url("object"))
            .json(&RemoveRequest { prefixes: keys })
            .send()
            .await
            .map_err(|e| transport_error("blob remove", e))?;

        error_for_status("blob remove", response).await?;
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.config.url,
            urlencoding::encode(&self.config.bucket),
            urlencoding::encode(key)
        )
    }

    async fn ping(&self) -> ImageResult<()> {
        let response = self
            .client
            .get(self.bucket_url("bucket"))
            .send()
            .await
            .map_err(|e| transport_error("bucket lookup", e))?;

        error_for_status("bucket lookup", response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::supabase::fake;
    use axum::{
        Json, Router,
        body::Bytes,
        extract::{Path, State},
        http::{HeaderMap, StatusCode as AxumStatus},
        routing::{get, post},
    };
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};

    type Uploads = Arc<Mutex<Vec<(String, String, Vec<u8>)>>>;
    type LastBody = Arc<Mutex<Option<Value>>>;

    fn store(base: String, page_size: usize) -> SupabaseBlobStore {
        SupabaseBlobStore::new(
            SupabaseConfig::new(base, "service-key").with_list_page_size(page_size),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_paginates_until_short_page() {
        let all: Vec<String> = (0..5).map(|i| format!("img-{}.png", i)).collect();
        let router = Router::new()
            .route(
                "/storage/v1/object/list/{bucket}",
                post(
                    |State(all): State<Vec<String>>,
                     Path(bucket): Path<String>,
                     headers: HeaderMap,
                     Json(body): Json<Value>| async move {
                        assert_eq!(bucket, "images");
                        assert_eq!(headers["apikey"], "service-key");
                        assert_eq!(headers["authorization"], "Bearer service-key");
                        let limit = body["limit"].as_u64().unwrap() as usize;
                        let offset = body["offset"].as_u64().unwrap() as usize;
                        let page: Vec<Value> = all
                            .iter()
                            .skip(offset)
                            .take(limit)
                            .map(|n| json!({"name": n, "id": "x"}))
                            .collect();
                        Json(Value::Array(page))
                    },
                ),
            )
            .with_state(all.clone());
        let base = fake::spawn(router).await;

        let names = store(base, 2).list().await.unwrap();
        assert_eq!(names.len(), 5);
        assert!(all.iter().all(|n| names.contains(n)));
    }

    #[tokio::test]
    async fn test_upload_sends_bytes_and_content_type() {
        let uploads: Uploads = Arc::default();
        let router = Router::new()
            .route(
                "/storage/v1/object/{bucket}/{key}",
                post(
                    |State(uploads): State<Uploads>,
                     Path((_bucket, key)): Path<(String, String)>,
                     headers: HeaderMap,
                     body: Bytes| async move {
                        let ct = headers["content-type"].to_str().unwrap().to_string();
                        uploads.lock().unwrap().push((key, ct, body.to_vec()));
                        Json(json!({"Key": "images/x"}))
                    },
                ),
            )
            .with_state(uploads.clone());
        let base = fake::spawn(router).await;

        store(base, 1000)
            .upload("my cat.png", vec![1, 2, 3], "image/png")
            .await
            .unwrap();

        let uploads = uploads.lock().unwrap();
        assert_eq!(
            uploads[0],
            ("my cat.png".to_string(), "image/png".to_string(), vec![1, 2, 3])
        );
    }

    #[tokio::test]
    async fn test_upload_duplicate_is_success() {
        let router = Router::new().route(
            "/storage/v1/object/{bucket}/{key}",
            post(|| async {
                (
                    AxumStatus::BAD_REQUEST,
                    Json(json!({
                        "statusCode": "409",
                        "error": "Duplicate",
                        "message": "The resource already exists"
                    })),
                )
            }),
        );
        let base = fake::spawn(router).await;

        assert!(store(base, 1000).upload("a.png", vec![1], "image/png").await.is_ok());
    }

    #[tokio::test]
    async fn test_upload_server_error_is_unavailable() {
        let router = Router::new().route(
            "/storage/v1/object/{bucket}/{key}",
            post(|| async { AxumStatus::INTERNAL_SERVER_ERROR }),
        );
        let base = fake::spawn(router).await;

        let err = store(base, 1000)
            .upload("a.png", vec![1], "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn test_remove_sends_prefixes() {
        let seen: LastBody = Arc::default();
        let router = Router::new()
            .route(
                "/storage/v1/object/{bucket}",
                axum::routing::delete(
                    |State(seen): State<LastBody>, Json(body): Json<Value>| async move {
                        *seen.lock().unwrap() = Some(body);
                        Json(json!([]))
                    },
                ),
            )
            .with_state(seen.clone());
        let base = fake::spawn(router).await;

        store(base, 1000)
            .remove(&["a.png".to_string()])
            .await
            .unwrap();

        assert_eq!(seen.lock().unwrap().clone(), Some(json!({"prefixes": ["a.png"]})));
    }

    #[tokio::test]
    async fn test_ping_checks_bucket() {
        let router = Router::new().route(
            "/storage/v1/bucket/{bucket}",
            get(|Path(bucket): Path<String>| async move {
                if bucket == "images" {
                    Ok(Json(json!({"id": "images"})))
                } else {
                    Err(AxumStatus::NOT_FOUND)
                }
            }),
        );
        let base = fake::spawn(router).await;

        assert!(store(base.clone(), 1000).ping().await.is_ok());

        let other = SupabaseBlobStore::new(
            SupabaseConfig::new(base, "service-key").with_bucket("missing"),
        )
        .unwrap();
        assert!(matches!(other.ping().await, Err(ImageError::StoreUnavailable(_))));
    }

    #[test]
    fn test_public_url_format() {
        let store = SupabaseBlobStore::new(SupabaseConfig::new(
            "https://demo.supabase.co",
            "service-key",
        ))
        .unwrap();
        assert_eq!(
            store.public_url("cat 1.png"),
            "https://demo.supabase.co/storage/v1/object/public/images/cat%201.png"
        );
    }
}
