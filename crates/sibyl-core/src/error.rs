//! Error types for `sibyl-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("document not found: {0}")]
  DocumentNotFound(Uuid),

  #[error("annotation not found: {0}")]
  AnnotationNotFound(Uuid),

  #[error("relationship not found: {0}")]
  RelationshipNotFound(Uuid),

  #[error("validated answer not found: {0}")]
  QaNotFound(Uuid),

  /// A relationship with the same (source, target, name) tuple already
  /// exists. Carries the existing id so callers can redirect instead of
  /// retrying.
  #[error("duplicate relationship; existing id {existing}")]
  DuplicateRelationship { existing: Uuid },

  #[error("actor {actor:?} is not allowed to {action}")]
  NotAuthorized { actor: String, action: &'static str },

  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("unknown answer source discriminant: {0:?}")]
  UnknownAnswerSource(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
