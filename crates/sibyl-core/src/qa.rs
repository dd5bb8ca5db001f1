//! Validated question/answer records and answer provenance.
//!
//! A `ValidatedQa` is an expert-confirmed answer, scoped to one document
//! or global (visible to all documents). The invariant is one *active*
//! record per (document-or-global, normalized question): corrections
//! update in place and append the superseded answer to history rather
//! than inserting a duplicate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Provenance ──────────────────────────────────────────────────────────────

/// Where an answer came from. The variant name doubles as the
/// `source_type` discriminant stored in the database and snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
  /// Exact normalized-question match against a validated answer.
  ExactQa,
  /// Keyword-overlap match against a validated answer.
  FuzzyQa,
  /// Scalar or list value found in the snapshot's field tree.
  StructuredField,
  /// Value found in the snapshot's entity map.
  StructuredEntity,
  /// Edge found in the snapshot's relation list.
  RelationGraph,
  /// Attribute derived from a relation's target endpoint.
  AttributeViaRelation,
  /// Entered directly by an expert, not derived from the snapshot.
  ExpertKnowledge,
  /// Produced by the optional enrichment capability.
  AiEnriched,
  /// An expert correction of an enriched answer.
  AiCorrection,
  /// No tier produced an answer.
  NotFound,
}

impl AnswerSource {
  /// The discriminant string stored in the `source_type` column.
  /// Must match the `rename_all = "snake_case"` serde tags above.
  pub fn discriminant(&self) -> &'static str {
    match self {
      Self::ExactQa => "exact_qa",
      Self::FuzzyQa => "fuzzy_qa",
      Self::StructuredField => "structured_field",
      Self::StructuredEntity => "structured_entity",
      Self::RelationGraph => "relation_graph",
      Self::AttributeViaRelation => "attribute_via_relation",
      Self::ExpertKnowledge => "expert_knowledge",
      Self::AiEnriched => "ai_enriched",
      Self::AiCorrection => "ai_correction",
      Self::NotFound => "not_found",
    }
  }

  pub fn from_discriminant(s: &str) -> Result<Self> {
    match s {
      "exact_qa" => Ok(Self::ExactQa),
      "fuzzy_qa" => Ok(Self::FuzzyQa),
      "structured_field" => Ok(Self::StructuredField),
      "structured_entity" => Ok(Self::StructuredEntity),
      "relation_graph" => Ok(Self::RelationGraph),
      "attribute_via_relation" => Ok(Self::AttributeViaRelation),
      "expert_knowledge" => Ok(Self::ExpertKnowledge),
      "ai_enriched" => Ok(Self::AiEnriched),
      "ai_correction" => Ok(Self::AiCorrection),
      "not_found" => Ok(Self::NotFound),
      other => Err(Error::UnknownAnswerSource(other.to_string())),
    }
  }
}

// ─── ValidatedQa ─────────────────────────────────────────────────────────────

/// An expert-confirmed question/answer pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedQa {
  pub qa_id:               Uuid,
  /// `None` ⇒ global, visible to all documents.
  pub document_id:         Option<Uuid>,
  /// The question as originally asked.
  pub question:            String,
  /// Normalized form — the exact-match lookup key.
  pub question_normalized: String,
  /// The current answer.
  pub answer:              String,
  pub source:              AnswerSource,
  /// Advisory pointer into the snapshot; not followed on read.
  pub json_path:           Option<String>,
  pub confidence:          f64,
  pub usage_count:         u32,
  pub correction_count:    u32,
  /// Superseded answers, oldest first.
  pub previous_answers:    Vec<String>,
  pub validated_by:        String,
  pub validated_at:        DateTime<Utc>,
  pub tags:                Vec<String>,
  /// Soft-delete flag; inactive records are invisible to lookups.
  pub is_active:           bool,
  pub is_global:           bool,
}

/// Input to [`crate::store::DocumentStore::insert_qa`].
/// `qa_id` and `validated_at` are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewValidatedQa {
  pub document_id:         Option<Uuid>,
  pub question:            String,
  pub question_normalized: String,
  pub answer:              String,
  pub source:              AnswerSource,
  pub json_path:           Option<String>,
  pub confidence:          f64,
  pub validated_by:        String,
  pub tags:                Vec<String>,
  pub is_global:           bool,
}
