//! Relationships — directed, typed edges between two annotations.
//!
//! A relationship is scoped to a document through its endpoints. It is
//! created unvalidated; validation happens exactly once and is the
//! trigger for a single-record snapshot sync. Uniqueness is enforced at
//! the (source, target, name) tuple level.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A directed, typed edge between two existing annotations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
  pub relationship_id:      Uuid,
  pub source_annotation_id: Uuid,
  pub target_annotation_id: Uuid,
  /// Free-form type label, e.g. "has_dosage".
  pub name:                 String,
  pub description:          Option<String>,
  pub is_validated:         bool,
  pub validated_by:         Option<String>,
  pub validated_at:         Option<DateTime<Utc>>,
  pub created_by:           String,
  pub created_at:           DateTime<Utc>,
}

/// Input to [`crate::store::DocumentStore::create_relationship`].
/// `relationship_id` and `created_at` are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewRelationship {
  pub source_annotation_id: Uuid,
  pub target_annotation_id: Uuid,
  pub name:                 String,
  pub description:          Option<String>,
  pub created_by:           String,
}

/// Outcome of a create attempt. A duplicate (source, target, name)
/// tuple is not an error at this seam — callers need the existing id to
/// redirect, so it is part of the contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RelationCreation {
  Created(Relationship),
  Duplicate { existing: Uuid },
}
