//! Error types for the listings cache
//!
//! The cache core never hands these to its callers: patch and hashing failures
//! degrade to "serve the last snapshot" or "treat as changed". They surface only
//! through the admin HTTP surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the listings cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A payload could not be serialized or deserialized
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored payload or event body does not have the expected shape
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// A change event is missing the identity its kind requires
    #[error("Malformed change event: {0}")]
    MalformedEvent(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) | CacheError::MalformedEvent(_) => {
                StatusCode::BAD_REQUEST
            }
            CacheError::Serialization(_) | CacheError::MalformedPayload(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the listings cache.
pub type Result<T> = std::result::Result<T, CacheError>;
