//! Type-safe error codes for API responses.
//!
//! Each code carries a SCREAMING_SNAKE_CASE identifier for clients, an integer
//! for logs and dashboards, and a default message.
//!
//! ```rust
//! use axum_helpers::errors::ErrorCode;
//!
//! let code = ErrorCode::InvalidImage;
//! assert_eq!(code.as_str(), "INVALID_IMAGE");
//! assert_eq!(code.code(), 1006);
//! ```

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Client errors (1000s)
    /// Request parameters were malformed
    BadRequest,

    /// A required parameter was not supplied
    MissingParameter,

    /// Requested resource was not found
    NotFound,

    /// Uploaded bytes could not be decoded as an image
    InvalidImage,

    /// JSON extraction from request body failed
    JsonExtraction,

    /// Request body exceeded the configured limit
    PayloadTooLarge,

    // Server errors (1500s)
    /// An unexpected internal server error occurred
    InternalError,

    /// A backing store could not be reached
    StoreUnavailable,

    /// The embedding model could not be reached
    EmbedderUnavailable,
}

impl ErrorCode {
    /// Identifier returned to clients in the `error` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::MissingParameter => "MISSING_PARAMETER",
            Self::NotFound => "NOT_FOUND",
            Self::InvalidImage => "INVALID_IMAGE",
            Self::JsonExtraction => "JSON_EXTRACTION",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::InternalError => "INTERNAL_ERROR",
            Self::StoreUnavailable => "STORE_UNAVAILABLE",
            Self::EmbedderUnavailable => "EMBEDDER_UNAVAILABLE",
        }
    }

    /// Integer code for logging and monitoring.
    pub fn code(&self) -> i32 {
        match self {
            Self::BadRequest => 1001,
            Self::MissingParameter => 1002,
            Self::NotFound => 1004,
            Self::InvalidImage => 1006,
            Self::JsonExtraction => 1008,
            Self::PayloadTooLarge => 1009,
            Self::InternalError => 1500,
            Self::StoreUnavailable => 1502,
            Self::EmbedderUnavailable => 1503,
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            Self::BadRequest => "Bad request",
            Self::MissingParameter => "A required parameter is missing",
            Self::NotFound => "The requested resource was not found",
            Self::InvalidImage => "The uploaded file is not a decodable image",
            Self::JsonExtraction => "Failed to extract JSON from request body",
            Self::PayloadTooLarge => "Request body is too large",
            Self::InternalError => "An internal server error occurred",
            Self::StoreUnavailable => "Storage backend is unavailable",
            Self::EmbedderUnavailable => "Embedding model is unavailable",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
