//! API routes module
//!
//! The image routes keep their trailing-slash paths at the root; readiness sits
//! next to them.

pub mod health;

use axum::Router;
use domain_images::{BlobStore, ImageService, RecordStore};
use std::sync::Arc;

/// Create all API routes
pub fn routes<B, R>(service: Arc<ImageService<B, R>>) -> Router
where
    B: BlobStore + 'static,
    R: RecordStore + 'static,
{
    Router::new()
        .merge(domain_images::router_with_shared(Arc::clone(&service)))
        .merge(health::router(service))
}
