//! HTTP handlers for search, listing, upload and delete

use axum::{
    Json, Router,
    extract::{Multipart, Query, State, multipart::MultipartError, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use axum_helpers::AppError;
use axum_helpers::errors::responses::{
    InternalServerErrorResponse, InvalidImageResponse, MissingParameterResponse,
    PayloadTooLargeResponse, ServiceUnavailableResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, OpenApi, ToSchema};

use crate::error::{ImageError, ImageResult};
use crate::models::{ImageId, SearchEntry};
use crate::service::ImageService;
use crate::storage::{BlobStore, RecordStore};

const UPLOAD_FIELD: &str = "file";
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

// ===== Request/Response DTOs =====

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct SearchParams {
    /// Natural-language query
    pub query: Option<String>,
    /// Number of results
    #[serde(default = "default_search_top_k")]
    #[param(default = 5)]
    pub top_k: usize,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ListParams {
    /// Optional query; omitted or blank lists every image
    pub query: Option<String>,
    /// Number of results when a query is given
    #[serde(default = "default_list_top_k")]
    #[param(default = 10)]
    pub top_k: usize,
}

fn default_search_top_k() -> usize {
    5
}

fn default_list_top_k() -> usize {
    10
}

/// One image in a result list
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImageSummary {
    pub id: ImageId,
    pub filename: String,
    /// Public URL of the stored image. The field name is kept for existing clients.
    pub image_base64: String,
}

impl From<SearchEntry> for ImageSummary {
    fn from(entry: SearchEntry) -> Self {
        Self {
            id: entry.id,
            filename: entry.filename,
            image_base64: entry.url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SearchResponse {
    pub results: Vec<ImageSummary>,
}

impl SearchResponse {
    fn from_entries(entries: impl IntoIterator<Item = SearchEntry>) -> Self {
        Self {
            results: entries.into_iter().map(ImageSummary::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    /// "Upload successful" or "File already exists"
    pub message: String,
    pub id: ImageId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct DeleteRequest {
    pub id: Option<ImageId>,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Multipart upload form, documentation only
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(content_media_type = "application/octet-stream")]
    pub file: String,
}

// ===== Handlers =====

/// Search images by text
#[utoipa::path(
    get,
    path = "/search/",
    tag = "images",
    params(SearchParams),
    responses(
        (status = 200, description = "Best matches first", body = SearchResponse),
        (status = 400, response = MissingParameterResponse),
        (status = 503, response = ServiceUnavailableResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
pub async fn search_images<B: BlobStore, R: RecordStore>(
    State(service): State<Arc<ImageService<B, R>>>,
    Query(params): Query<SearchParams>,
) -> ImageResult<Json<SearchResponse>> {
    let query = params
        .query
        .ok_or_else(|| ImageError::MissingParameter("Missing query".to_string()))?;

    let hits = service.search(&query, params.top_k).await?;
    Ok(Json(SearchResponse::from_entries(
        hits.into_iter().map(|hit| hit.entry),
    )))
}

/// List images, optionally ranked by a text query
#[utoipa::path(
    get,
    path = "/images/",
    tag = "images",
    params(ListParams),
    responses(
        (status = 200, description = "Images", body = SearchResponse),
        (status = 503, response = ServiceUnavailableResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
pub async fn list_images<B: BlobStore, R: RecordStore>(
    State(service): State<Arc<ImageService<B, R>>>,
    Query(params): Query<ListParams>,
) -> ImageResult<Json<SearchResponse>> {
    let entries = service
        .list(params.query.as_deref(), params.top_k)
        .await?;
    Ok(Json(SearchResponse::from_entries(entries)))
}

/// Upload an image
#[utoipa::path(
    post,
    path = "/upload/",
    tag = "images",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Stored, or already present", body = UploadResponse),
        (status = 400, response = InvalidImageResponse),
        (status = 413, response = PayloadTooLargeResponse),
        (status = 503, response = ServiceUnavailableResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
pub async fn upload_image<B: BlobStore, R: RecordStore>(
    State(service): State<Arc<ImageService<B, R>>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| ImageError::MissingParameter("Missing filename".to_string()))?;
        let content_type = field
            .content_type()
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;

        let outcome = service
            .upload(&filename, &content_type, bytes.to_vec())
            .await?;

        return Ok(Json(UploadResponse {
            message: outcome.message().to_string(),
            id: outcome.id().clone(),
        }));
    }

    Err(ImageError::MissingParameter("Missing file".to_string()).into())
}

/// Delete an image by id and filename
#[utoipa::path(
    post,
    path = "/delete_image/",
    tag = "images",
    request_body = DeleteRequest,
    responses(
        (status = 200, description = "Deleted, or already absent", body = MessageResponse),
        (status = 400, response = MissingParameterResponse),
        (status = 503, response = ServiceUnavailableResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
pub async fn delete_image<B: BlobStore, R: RecordStore>(
    State(service): State<Arc<ImageService<B, R>>>,
    body: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(request) = body?;

    service
        .delete(request.id, request.filename.as_deref())
        .await?;

    Ok(Json(MessageResponse {
        message: "Image deleted".to_string(),
    }))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::BadRequest(err.body_text())
    }
}

// ===== Router =====

/// OpenAPI documentation for the image API
#[derive(OpenApi)]
#[openapi(
    paths(search_images, list_images, upload_image, delete_image),
    components(schemas(
        ImageId,
        ImageSummary,
        SearchResponse,
        UploadResponse,
        UploadForm,
        DeleteRequest,
        MessageResponse
    )),
    tags((name = "images", description = "Semantic image search"))
)]
pub struct ImagesApiDoc;

pub fn router<B, R>(service: ImageService<B, R>) -> Router
where
    B: BlobStore + 'static,
    R: RecordStore + 'static,
{
    router_with_shared(Arc::new(service))
}

/// Router over an already shared service, for callers that also need the handle
pub fn router_with_shared<B, R>(service: Arc<ImageService<B, R>>) -> Router
where
    B: BlobStore + 'static,
    R: RecordStore + 'static,
{
    Router::new()
        .route("/search/", get(search_images::<B, R>))
        .route("/images/", get(list_images::<B, R>))
        .route("/upload/", post(upload_image::<B, R>))
        .route("/delete_image/", post(delete_image::<B, R>))
        .with_state(service)
}
