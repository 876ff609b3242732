pub mod codes;
pub mod handlers;
pub mod responses;

pub use codes::ErrorCode;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Standard error response structure.
///
/// Returned for every error response:
/// - `code`: integer error code for logging/monitoring (e.g., 1002)
/// - `error`: machine-readable identifier (e.g., "MISSING_PARAMETER")
/// - `message`: human-readable message
/// - `details`: optional additional details
///
/// ```json
/// {
///   "code": 1002,
///   "error": "MISSING_PARAMETER",
///   "message": "Missing id or filename"
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Integer error code for logging and monitoring
    pub code: i32,
    /// Machine-readable error identifier for programmatic handling
    pub error: String,
    /// Human-readable error message
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            error: code.as_str().to_string(),
            message: message.into(),
            details: None,
        }
    }
}

/// Application error type that can be converted to HTTP responses.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppError {
    #[error("JSON extraction error: {0}")]
    JsonExtractorRejection(#[from] JsonRejection),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Internal Server Error: {0}")]
    InternalServerError(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Embedder unavailable: {0}")]
    EmbedderUnavailable(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::JsonExtractorRejection(e) => e.status(),
            AppError::BadRequest(_) | AppError::MissingParameter(_) | AppError::InvalidImage(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::StoreUnavailable(_) | AppError::EmbedderUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            AppError::JsonExtractorRejection(_) => ErrorCode::JsonExtraction,
            AppError::BadRequest(_) => ErrorCode::BadRequest,
            AppError::MissingParameter(_) => ErrorCode::MissingParameter,
            AppError::InvalidImage(_) => ErrorCode::InvalidImage,
            AppError::PayloadTooLarge(_) => ErrorCode::PayloadTooLarge,
            AppError::InternalServerError(_) => ErrorCode::InternalError,
            AppError::StoreUnavailable(_) => ErrorCode::StoreUnavailable,
            AppError::EmbedderUnavailable(_) => ErrorCode::EmbedderUnavailable,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.error_code();

        let message = match self {
            AppError::JsonExtractorRejection(e) => {
                tracing::warn!(error_code = code.code(), "JSON extraction error: {:?}", e);
                e.body_text()
            }
            AppError::InternalServerError(msg) => {
                tracing::error!(error_code = code.code(), "Internal server error: {}", msg);
                code.default_message().to_string()
            }
            AppError::StoreUnavailable(msg) | AppError::EmbedderUnavailable(msg) => {
                tracing::warn!(error_code = code.code(), "Dependency unavailable: {}", msg);
                code.default_message().to_string()
            }
            AppError::BadRequest(msg)
            | AppError::MissingParameter(msg)
            | AppError::InvalidImage(msg)
            | AppError::PayloadTooLarge(msg) => {
                tracing::info!(error_code = code.code(), "{}: {}", code, msg);
                msg
            }
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}
