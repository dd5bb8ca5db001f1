//! Error type for `sibyl-store-sqlite`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] sibyl_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("document not found: {0}")]
  DocumentNotFound(Uuid),

  #[error("annotation not found: {0}")]
  AnnotationNotFound(Uuid),

  #[error("relationship not found: {0}")]
  RelationshipNotFound(Uuid),

  #[error("validated answer not found: {0}")]
  QaNotFound(Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
