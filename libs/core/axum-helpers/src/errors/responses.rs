//! Reusable OpenAPI response types for consistent API documentation.

use super::ErrorResponse;
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToResponse;

#[derive(ToResponse)]
#[response(
    description = "Internal Server Error",
    content_type = "application/json",
    example = json!({
        "code": 1500,
        "error": "INTERNAL_ERROR",
        "message": "An internal server error occurred"
    })
)]
pub struct InternalServerErrorResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Bad Request - required parameter missing",
    content_type = "application/json",
    example = json!({
        "code": 1002,
        "error": "MISSING_PARAMETER",
        "message": "Missing id or filename"
    })
)]
pub struct MissingParameterResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Bad Request - uploaded file is not an image",
    content_type = "application/json",
    example = json!({
        "code": 1006,
        "error": "INVALID_IMAGE",
        "message": "The uploaded file is not a decodable image"
    })
)]
pub struct InvalidImageResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Payload Too Large",
    content_type = "application/json",
    example = json!({
        "code": 1009,
        "error": "PAYLOAD_TOO_LARGE",
        "message": "Request body is too large"
    })
)]
pub struct PayloadTooLargeResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Service Unavailable - storage or embedding backend unreachable",
    content_type = "application/json",
    example = json!({
        "code": 1502,
        "error": "STORE_UNAVAILABLE",
        "message": "Storage backend is unavailable"
    })
)]
pub struct ServiceUnavailableResponse(pub ErrorResponse);
