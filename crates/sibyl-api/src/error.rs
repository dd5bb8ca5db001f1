//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  /// Duplicate relationship; carries the existing id so the caller can
  /// redirect.
  #[error("conflict: relationship already exists as {existing}")]
  Conflict { existing: Uuid },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<sibyl_engine::Error> for ApiError {
  fn from(e: sibyl_engine::Error) -> Self {
    use sibyl_core::Error as Core;
    match e {
      sibyl_engine::Error::Core(core) => match core {
        Core::DocumentNotFound(_)
        | Core::AnnotationNotFound(_)
        | Core::RelationshipNotFound(_)
        | Core::QaNotFound(_) => ApiError::NotFound(core.to_string()),
        Core::NotAuthorized { .. } => ApiError::Forbidden(core.to_string()),
        other => ApiError::BadRequest(other.to_string()),
      },
      sibyl_engine::Error::Store(e) => ApiError::Store(e),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, json!({ "error": m })),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, json!({ "error": m })),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, json!({ "error": m })),
      ApiError::Conflict { existing } => (
        StatusCode::CONFLICT,
        json!({ "error": self.to_string(), "existing": existing }),
      ),
      ApiError::Store(e) => (
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": e.to_string() }),
      ),
    };
    (status, Json(body)).into_response()
  }
}
