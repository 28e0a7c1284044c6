//! Error types
//!
//! Provides the error enums for the resilience combinators and the HTTP API
//! using thiserror.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Resilience Error Enum ==
/// Failures produced by the combinators themselves, never by the wrapped
/// operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResilienceError {
    /// A precondition on the combinator's parameters did not hold
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation did not complete within the bound
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

// == Retry Error Enum ==
/// Outcome of a failed [`retry`](crate::resilience::retry) call.
///
/// `Operation` carries the final attempt's error unmodified.
#[derive(Error, Debug)]
pub enum RetryError<E> {
    #[error(transparent)]
    InvalidArgument(ResilienceError),

    #[error("{0}")]
    Operation(E),
}

impl<E> RetryError<E> {
    /// Returns the operation's error, if that is what ended the sequence.
    pub fn into_operation(self) -> Option<E> {
        match self {
            RetryError::Operation(e) => Some(e),
            RetryError::InvalidArgument(_) => None,
        }
    }
}

// == Api Error Enum ==
/// Error type for the HTTP handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Key not found in cache, or found expired
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the HTTP handlers.
pub type Result<T> = std::result::Result<T, ApiError>;
