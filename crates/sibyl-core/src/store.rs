//! The `DocumentStore` trait.
//!
//! The trait is implemented by storage backends (e.g.
//! `sibyl-store-sqlite`). The engine and API layers depend on this
//! abstraction, not on any concrete backend.
//!
//! Document and annotation rows are owned by the host application;
//! the seeding writes exist so the authoritative queries the engine
//! depends on are exercisable end-to-end.

use std::future::Future;

use uuid::Uuid;

use crate::{
  document::{Annotation, Document, NewAnnotation},
  qa::{NewValidatedQa, ValidatedQa},
  relation::{NewRelationship, RelationCreation, Relationship},
  snapshot::Snapshot,
};

/// Abstraction over a Sibyl storage backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait DocumentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Documents & annotations (collaborator-owned) ──────────────────────

  /// Create and persist a document envelope.
  fn add_document<'a>(
    &'a self,
    title: &'a str,
  ) -> impl Future<Output = Result<Document, Self::Error>> + Send + 'a;

  /// Retrieve a document by id. Returns `None` if not found.
  fn get_document(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + '_;

  /// Persist an annotation. The referenced document must exist.
  fn add_annotation(
    &self,
    input: NewAnnotation,
  ) -> impl Future<Output = Result<Annotation, Self::Error>> + Send + '_;

  /// Retrieve an annotation by id. Returns `None` if not found.
  fn get_annotation(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Annotation>, Self::Error>> + Send + '_;

  /// All annotations for a document. Text matching against them is the
  /// engine's job — normalization rules don't belong in SQL.
  fn list_annotations(
    &self,
    document_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Annotation>, Self::Error>> + Send + '_;

  // ── Relationships ─────────────────────────────────────────────────────

  /// Create a relationship between two existing annotations.
  ///
  /// An exact (source, target, name) duplicate is not created; the
  /// outcome carries the existing relationship's id instead.
  fn create_relationship(
    &self,
    input: NewRelationship,
  ) -> impl Future<Output = Result<RelationCreation, Self::Error>> + Send + '_;

  fn get_relationship(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Relationship>, Self::Error>> + Send + '_;

  /// Update name and/or description. `None` fields are left unchanged.
  fn update_relationship(
    &self,
    id: Uuid,
    name: Option<String>,
    description: Option<String>,
  ) -> impl Future<Output = Result<Relationship, Self::Error>> + Send + '_;

  /// Mark a relationship validated. Idempotent: an already-validated
  /// relationship is returned unchanged.
  fn validate_relationship<'a>(
    &'a self,
    id: Uuid,
    validated_by: &'a str,
  ) -> impl Future<Output = Result<Relationship, Self::Error>> + Send + 'a;

  /// Physically delete a relationship.
  fn delete_relationship(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Every relationship whose source or target annotation belongs to
  /// `document_id`.
  fn list_relationships(
    &self,
    document_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Relationship>, Self::Error>> + Send + '_;

  /// Relationships between two specific annotations, in either
  /// orientation.
  fn relationships_between(
    &self,
    a: Uuid,
    b: Uuid,
  ) -> impl Future<Output = Result<Vec<Relationship>, Self::Error>> + Send + '_;

  /// Count of *validated* relationships for a document — the
  /// authoritative side of the drift check.
  fn count_validated_relationships(
    &self,
    document_id: Uuid,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Validated Q&A ─────────────────────────────────────────────────────

  /// Persist a new validated answer. `qa_id` and `validated_at` are
  /// assigned by the store.
  fn insert_qa(
    &self,
    input: NewValidatedQa,
  ) -> impl Future<Output = Result<ValidatedQa, Self::Error>> + Send + '_;

  /// Replace the stored record with `qa` (matched by `qa_id`).
  fn update_qa<'a>(
    &'a self,
    qa: &'a ValidatedQa,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn get_qa(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<ValidatedQa>, Self::Error>> + Send + '_;

  /// The active record whose normalized question equals `normalized`,
  /// scoped to `document_id` or global.
  fn find_qa_exact<'a>(
    &'a self,
    document_id: Option<Uuid>,
    normalized: &'a str,
  ) -> impl Future<Output = Result<Option<ValidatedQa>, Self::Error>> + Send + 'a;

  /// All active records visible to a document (its own plus globals).
  fn list_qa(
    &self,
    document_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ValidatedQa>, Self::Error>> + Send + '_;

  /// Soft delete: flips `is_active` off; the row is preserved.
  fn soft_delete_qa(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Snapshot ──────────────────────────────────────────────────────────

  /// Load the document's snapshot. Malformed stored content is treated
  /// as absent, never an error.
  fn load_snapshot(
    &self,
    document_id: Uuid,
  ) -> impl Future<Output = Result<Option<Snapshot>, Self::Error>> + Send + '_;

  /// Overwrite the document's snapshot (last writer wins).
  fn save_snapshot<'a>(
    &'a self,
    document_id: Uuid,
    snapshot: &'a Snapshot,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
