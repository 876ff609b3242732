use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    /// Uploaded bytes are not a decodable image
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("{0}")]
    MissingParameter(String),

    /// Blob store or record store unreachable, failed, or timed out
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Embedding model call failed or timed out
    #[error("Embedder unavailable: {0}")]
    EmbedderUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ImageResult<T> = Result<T, ImageError>;

impl From<image::ImageError> for ImageError {
    fn from(err: image::ImageError) -> Self {
        ImageError::InvalidImage(err.to_string())
    }
}

impl From<core_config::ConfigError> for ImageError {
    fn from(err: core_config::ConfigError) -> Self {
        ImageError::Config(err.to_string())
    }
}

/// Convert ImageError to AppError for standardized HTTP error responses
impl From<ImageError> for AppError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::InvalidImage(msg) => AppError::InvalidImage(msg),
            ImageError::MissingParameter(msg) => AppError::MissingParameter(msg),
            ImageError::StoreUnavailable(msg) => AppError::StoreUnavailable(msg),
            ImageError::EmbedderUnavailable(msg) => AppError::EmbedderUnavailable(msg),
            ImageError::Config(msg) => {
                AppError::InternalServerError(format!("Config error: {}", msg))
            }
            ImageError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for ImageError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}
