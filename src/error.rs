//! Error types for the media cache
//!
//! Load failures are cloneable so a single failed decode can be fanned out to
//! every waiter attached to it. `ApiError` maps them onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Collaborator Errors ==
/// The asset source could not produce bytes for an identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct FetchError {
    pub reason: String,
}

impl FetchError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// The decoder rejected the fetched bytes (corrupt or unsupported content).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct DecodeError {
    pub reason: String,
}

impl DecodeError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

// == Load Error Enum ==
/// Outcome of a load that did not produce an asset.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// Source unreadable
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Corrupt or unsupported content
    #[error("Decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// The load was cancelled before it settled
    #[error("Load cancelled")]
    Cancelled,

    /// The cache has been shut down and accepts no new loads
    #[error("Cache is shut down")]
    ShutDown,

    /// A background task died without settling its job
    #[error("Internal error: {0}")]
    Internal(String),
}

// == API Error Enum ==
/// Error type for the HTTP adapter.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The cache failed to produce the asset
    #[error(transparent)]
    Load(#[from] LoadError),
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Load(LoadError::Fetch(_)) => StatusCode::NOT_FOUND,
            ApiError::Load(LoadError::Decode(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Load(LoadError::Cancelled | LoadError::ShutDown) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Load(LoadError::Internal(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the HTTP adapter.
pub type Result<T> = std::result::Result<T, ApiError>;
