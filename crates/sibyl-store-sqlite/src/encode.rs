//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. List-valued fields
//! (tags, previous_answers) are stored as compact JSON arrays. UUIDs are
//! stored as hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use sibyl_core::{
  document::{Annotation, Document},
  qa::{AnswerSource, ValidatedQa},
  relation::Relationship,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── String lists ────────────────────────────────────────────────────────────

pub fn encode_string_list(items: &[String]) -> Result<String> {
  Ok(serde_json::to_string(items)?)
}

pub fn decode_string_list(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

// ─── AnswerSource ────────────────────────────────────────────────────────────

pub fn decode_answer_source(s: &str) -> Result<AnswerSource> {
  Ok(AnswerSource::from_discriminant(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `documents` row.
pub struct RawDocument {
  pub document_id: String,
  pub title:       String,
  pub created_at:  String,
}

impl RawDocument {
  pub fn into_document(self) -> Result<Document> {
    Ok(Document {
      document_id: decode_uuid(&self.document_id)?,
      title:       self.title,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `annotations` row.
pub struct RawAnnotation {
  pub annotation_id: String,
  pub document_id:   String,
  pub page:          i64,
  pub entity_type:   String,
  pub text:          String,
  pub created_at:    String,
}

impl RawAnnotation {
  pub fn into_annotation(self) -> Result<Annotation> {
    Ok(Annotation {
      annotation_id: decode_uuid(&self.annotation_id)?,
      document_id:   decode_uuid(&self.document_id)?,
      page:          self.page as u32,
      entity_type:   self.entity_type,
      text:          self.text,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `relationships` row.
pub struct RawRelationship {
  pub relationship_id:      String,
  pub source_annotation_id: String,
  pub target_annotation_id: String,
  pub name:                 String,
  pub description:          Option<String>,
  pub is_validated:         bool,
  pub validated_by:         Option<String>,
  pub validated_at:         Option<String>,
  pub created_by:           String,
  pub created_at:           String,
}

impl RawRelationship {
  pub fn into_relationship(self) -> Result<Relationship> {
    Ok(Relationship {
      relationship_id:      decode_uuid(&self.relationship_id)?,
      source_annotation_id: decode_uuid(&self.source_annotation_id)?,
      target_annotation_id: decode_uuid(&self.target_annotation_id)?,
      name:                 self.name,
      description:          self.description,
      is_validated:         self.is_validated,
      validated_by:         self.validated_by,
      validated_at:         self
        .validated_at
        .as_deref()
        .map(decode_dt)
        .transpose()?,
      created_by:           self.created_by,
      created_at:           decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `validated_qa` row.
pub struct RawValidatedQa {
  pub qa_id:               String,
  pub document_id:         Option<String>,
  pub question:            String,
  pub question_normalized: String,
  pub answer:              String,
  pub source_type:         String,
  pub json_path:           Option<String>,
  pub confidence:          f64,
  pub usage_count:         i64,
  pub correction_count:    i64,
  pub previous_answers:    String,
  pub validated_by:        String,
  pub validated_at:        String,
  pub tags:                String,
  pub is_active:           bool,
  pub is_global:           bool,
}

impl RawValidatedQa {
  pub fn into_qa(self) -> Result<ValidatedQa> {
    Ok(ValidatedQa {
      qa_id:               decode_uuid(&self.qa_id)?,
      document_id:         self
        .document_id
        .as_deref()
        .map(decode_uuid)
        .transpose()?,
      question:            self.question,
      question_normalized: self.question_normalized,
      answer:              self.answer,
      source:              decode_answer_source(&self.source_type)?,
      json_path:           self.json_path,
      confidence:          self.confidence,
      usage_count:         self.usage_count as u32,
      correction_count:    self.correction_count as u32,
      previous_answers:    decode_string_list(&self.previous_answers)?,
      validated_by:        self.validated_by,
      validated_at:        decode_dt(&self.validated_at)?,
      tags:                decode_string_list(&self.tags)?,
      is_active:           self.is_active,
      is_global:           self.is_global,
    })
  }
}
