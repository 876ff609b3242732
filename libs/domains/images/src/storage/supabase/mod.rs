//! Supabase adapters: Storage REST for blobs, PostgREST for records.

mod config;
mod storage;
mod table;

pub use config::SupabaseConfig;
pub use storage::SupabaseBlobStore;
pub use table::SupabaseRecordStore;

use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};

use crate::error::{ImageError, ImageResult};

/// Client that sends the service key both as `apikey` and as a bearer token.
fn build_client(config: &SupabaseConfig) -> ImageResult<Client> {
    let mut headers = HeaderMap::new();
    let key = HeaderValue::from_str(&config.key)
        .map_err(|_| ImageError::Config("SUPABASE_KEY is not a valid header value".to_string()))?;
    let bearer = HeaderValue::from_str(&format!("Bearer {}", config.key))
        .map_err(|_| ImageError::Config("SUPABASE_KEY is not a valid header value".to_string()))?;
    headers.insert("apikey", key);
    headers.insert(AUTHORIZATION, bearer);

    Client::builder()
        .default_headers(headers)
        .timeout(config.timeout)
        .build()
        .map_err(|e| ImageError::Config(format!("failed to build Supabase client: {}", e)))
}

/// Map a non-success response into `StoreUnavailable`, keeping the body for the log.
async fn error_for_status(
    what: &str,
    response: reqwest::Response,
) -> ImageResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(ImageError::StoreUnavailable(format!(
        "{} failed ({}): {}",
        what, status, body
    )))
}

fn transport_error(what: &str, err: reqwest::Error) -> ImageError {
    ImageError::StoreUnavailable(format!("{} failed: {}", what, err))
}
