use axum::http::{HeaderValue, Method, header};
use std::io;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

/// Creates a CORS layer restricted to the given origins.
///
/// Allows GET, POST, DELETE and OPTIONS with Content-Type, Accept and
/// Authorization headers; preflight responses are cached for one hour.
pub fn create_cors_layer(allowed_origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .max_age(Duration::from_secs(3600))
}

/// Allows any origin, method and header.
pub fn create_permissive_cors_layer() -> CorsLayer {
    CorsLayer::permissive()
}

/// Builds a CORS layer from a `CORS_ALLOWED_ORIGIN` style value.
///
/// `*` or an empty value yields [`create_permissive_cors_layer`]; otherwise the
/// value is a comma-separated origin list.
pub fn cors_layer_from_origins(origins: &str) -> io::Result<CorsLayer> {
    let trimmed = origins.trim();
    if trimmed.is_empty() || trimmed == "*" {
        info!("CORS configured to allow any origin");
        return Ok(create_permissive_cors_layer());
    }

    let allowed_origins = trimmed
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(HeaderValue::from_str)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Invalid CORS_ALLOWED_ORIGIN value: {e}"),
            )
        })?;

    info!("CORS configured with allowed origins: {}", trimmed);
    Ok(create_cors_layer(allowed_origins))
}
