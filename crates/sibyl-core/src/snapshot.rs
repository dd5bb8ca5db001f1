//! The per-document JSON snapshot — the sole artifact the QA engine
//! reads.
//!
//! The snapshot is a denormalized read model, rebuilt or patched from
//! the authoritative tables by the sync engine. Drift between the two is
//! allowed between syncs and detectable via the sync-status query.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::{
  qa::{AnswerSource, ValidatedQa},
  relation::Relationship,
};

// ─── Denormalized views ──────────────────────────────────────────────────────

/// One end of a relation, denormalized for fast text search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointView {
  pub annotation_id: Uuid,
  pub entity_type:   String,
  pub value:         String,
  pub page:          u32,
}

/// A relationship with both endpoints inlined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationView {
  pub relationship_id: Uuid,
  pub name:            String,
  pub description:     Option<String>,
  pub source:          EndpointView,
  pub target:          EndpointView,
  pub is_validated:    bool,
  pub validated_by:    Option<String>,
}

/// A validated answer as stored in the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaView {
  pub qa_id:               Uuid,
  pub question:            String,
  pub question_normalized: String,
  pub answer:              String,
  pub source:              AnswerSource,
  pub json_path:           Option<String>,
  pub confidence:          f64,
  pub is_global:           bool,
}

impl QaView {
  pub fn from_qa(qa: &ValidatedQa) -> Self {
    Self {
      qa_id:               qa.qa_id,
      question:            qa.question.clone(),
      question_normalized: qa.question_normalized.clone(),
      answer:              qa.answer.clone(),
      source:              qa.source,
      json_path:           qa.json_path.clone(),
      confidence:          qa.confidence,
      is_global:           qa.is_global,
    }
  }
}

// ─── Metadata ────────────────────────────────────────────────────────────────

/// Bookkeeping written on every sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
  pub total_relations:    usize,
  pub total_validated_qa: usize,
  pub last_synced:        Option<DateTime<Utc>>,
  pub synced_by:          Option<String>,
  pub last_qa_sync:       Option<DateTime<Utc>>,
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// The per-document knowledge base.
///
/// `document` holds the extracted field tree (free-form JSON, searched
/// depth-first); `entities` maps entity type to the list of extracted
/// values; `relations` and `validated_qa` mirror the authoritative
/// tables after the last sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
  #[serde(default)]
  pub document:     serde_json::Value,
  #[serde(default)]
  pub entities:     BTreeMap<String, Vec<String>>,
  #[serde(default)]
  pub relations:    Vec<RelationView>,
  #[serde(default)]
  pub validated_qa: Vec<QaView>,
  #[serde(default)]
  pub metadata:     SnapshotMetadata,
}

impl Snapshot {
  pub fn empty() -> Self { Self::default() }

  /// Total entity value count across all types; 0 for an absent or
  /// malformed entity map (the map deserializes defensively to empty).
  pub fn entity_count(&self) -> usize {
    self.entities.values().map(Vec::len).sum()
  }
}

/// Build the denormalized view of `relationship` given its resolved
/// endpoints. Lives here so the sync engine and tests share one shape.
pub fn relation_view(
  relationship: &Relationship,
  source: EndpointView,
  target: EndpointView,
) -> RelationView {
  RelationView {
    relationship_id: relationship.relationship_id,
    name:            relationship.name.clone(),
    description:     relationship.description.clone(),
    source,
    target,
    is_validated:    relationship.is_validated,
    validated_by:    relationship.validated_by.clone(),
  }
}
