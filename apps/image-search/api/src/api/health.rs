//! Readiness endpoint

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use axum_helpers::{HealthCheckFuture, run_health_checks};
use domain_images::{BlobStore, ImageService, RecordStore};
use serde_json::Value;
use std::sync::Arc;

/// Create the readiness router
pub fn router<B, R>(service: Arc<ImageService<B, R>>) -> Router
where
    B: BlobStore + 'static,
    R: RecordStore + 'static,
{
    Router::new()
        .route("/ready", get(ready::<B, R>))
        .with_state(service)
}

/// Readiness check - pings the blob store and the record store
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Both stores reachable"),
        (status = 503, description = "A store is unreachable")
    )
)]
pub async fn ready<B: BlobStore, R: RecordStore>(
    State(service): State<Arc<ImageService<B, R>>>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let blob_check: HealthCheckFuture<'_> = Box::pin(async {
        service
            .ping_blob_store()
            .await
            .map_err(|e| e.to_string())
    });
    let record_check: HealthCheckFuture<'_> = Box::pin(async {
        service
            .ping_record_store()
            .await
            .map_err(|e| e.to_string())
    });

    run_health_checks(vec![("blob_store", blob_check), ("record_store", record_check)]).await
}
