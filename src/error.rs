//! REST-boundary error taxonomy.
//!
//! Internally every fallible call returns `anyhow::Result`; at the REST
//! boundary we need a stable mapping to HTTP status codes. `AppError` is that
//! seam, mirroring the `json_error(StatusCode, &str)` helper the rest of this
//! codebase's teacher repo used ad hoc at every handler, but as a typed enum
//! so pipeline code can construct the right variant directly instead of
//! picking a status code by hand at each call site.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use std::fmt;

/// The five failure categories a caller can observe, independent of which
/// internal step produced them.
#[derive(Debug)]
pub enum AppError {
    /// Malformed input: bad date/time, mismatched range, invalid regex, etc.
    InputValidation(String),
    /// No such flight/prediction/resource.
    NotFound(String),
    /// A source read failed but the surrounding operation may still
    /// partially succeed; counted, not fatal.
    TransientSourceFailure(String),
    /// A record violates a data-model invariant (missing mandatory field).
    DataIntegrity(String),
    /// Unrecoverable: store unreachable, configuration missing.
    Fatal(anyhow::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::InputValidation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::TransientSourceFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::DataIntegrity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Fatal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InputValidation(msg) => write!(f, "invalid input: {msg}"),
            AppError::NotFound(msg) => write!(f, "not found: {msg}"),
            AppError::TransientSourceFailure(msg) => write!(f, "transient source failure: {msg}"),
            AppError::DataIntegrity(msg) => write!(f, "data integrity violation: {msg}"),
            AppError::Fatal(err) => write!(f, "fatal: {err}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Fatal(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if matches!(self, AppError::Fatal(_)) {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("{}", self);
        }
        (status, Json(json!({ "errors": self.to_string() }))).into_response()
    }
}

/// Same helper the rest of the codebase's teacher kept at hand for one-off
/// error responses that don't warrant a full `AppError` variant.
pub fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "errors": message }))).into_response()
}
