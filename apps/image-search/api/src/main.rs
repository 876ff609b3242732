use axum_helpers::server::{create_production_app, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_images::{ClipHttpProvider, ImageService, SupabaseBlobStore, SupabaseRecordStore};
use eyre::WrapErr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

mod api;
mod config;
mod openapi;
mod warmup;

use config::Config;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Install color-eyre first for colored error output
    install_color_eyre();

    // Load configuration from environment variables
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.environment);

    info!(
        supabase = %config.supabase.url,
        bucket = %config.supabase.bucket,
        table = %config.supabase.table,
        embedder = %config.embedder.base_url,
        model = %config.embedder.model,
        dimension = config.embedder.dimension,
        "Starting {} v{}",
        config.app.name,
        config.app.version
    );

    let blobs = SupabaseBlobStore::new(config.supabase.clone())?;
    let records = SupabaseRecordStore::new(config.supabase.clone())?;
    let embedder = Arc::new(ClipHttpProvider::new(config.embedder.clone())?);
    let service = Arc::new(ImageService::new(
        blobs,
        records,
        embedder,
        config.service_config(),
    )?);

    // Build the initial index before accepting traffic
    let state = warmup::retry_with_backoff(|| service.refresh(), &config.warmup)
        .await
        .wrap_err("Initial index build failed")?;
    info!(images = state.len(), "Search index ready");

    // Build router with API routes
    let api_routes = api::routes(Arc::clone(&service));

    // Create a router with OpenAPI docs
    let router = axum_helpers::create_router::<openapi::ApiDoc>(api_routes, &config.server)?;

    // Merge health endpoints
    let app = router.merge(health_router(config.app));

    info!("Starting Image Search API with production-ready shutdown (30s timeout)");

    create_production_app(app, &config.server, Duration::from_secs(30), async move {
        info!(
            images = service.current_state().len(),
            "Shutting down: releasing search state"
        );
        drop(service);
    })
    .await
    .wrap_err("Server error")?;

    info!("Image Search API shutdown complete");
    Ok(())
}
