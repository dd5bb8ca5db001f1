//! Document and annotation envelopes.
//!
//! Document and annotation persistence belongs to the host application;
//! Sibyl only reads them (by id, by document, by text containment) and
//! links relationships between annotations. The types here are the thin
//! shapes those reads return.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A document under analysis. All knowledge (annotations, relations,
/// validated answers, the snapshot) hangs off a document id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
  pub document_id: Uuid,
  pub title:       String,
  pub created_at:  DateTime<Utc>,
}

/// A tagged span of text within a document page — an entity mention.
///
/// `entity_type` is the extraction label (e.g. "Product", "Dosage");
/// `text` is the selected surface text the QA engine matches against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
  pub annotation_id: Uuid,
  pub document_id:   Uuid,
  pub page:          u32,
  pub entity_type:   String,
  pub text:          String,
  pub created_at:    DateTime<Utc>,
}

/// Input to [`crate::store::DocumentStore::add_annotation`].
#[derive(Debug, Clone)]
pub struct NewAnnotation {
  pub document_id: Uuid,
  pub page:        u32,
  pub entity_type: String,
  pub text:        String,
}

/// An opaque identity performing an operation. Authentication is the
/// host application's concern; Sibyl only records the display name and
/// honours the privileged flag for the delete-authorization check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
  pub name:       String,
  #[serde(default)]
  pub privileged: bool,
}

impl Actor {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), privileged: false }
  }

  pub fn privileged(name: impl Into<String>) -> Self {
    Self { name: name.into(), privileged: true }
  }
}
