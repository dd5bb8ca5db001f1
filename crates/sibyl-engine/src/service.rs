//! The call-shaped interface of the engine.
//!
//! [`QaService`] wires the classifiers, the tiered resolver, the
//! relation-intent handler, the validated-answer registry, and the sync
//! engine over any [`DocumentStore`]. Every mutation of relations or
//! validated answers triggers the matching single-record snapshot sync
//! as a side effect, in degrade-don't-fail mode.

use std::sync::Arc;

use serde::Serialize;
use sibyl_core::{
  document::Actor,
  qa::{AnswerSource, ValidatedQa},
  relation::{NewRelationship, RelationCreation, Relationship},
  store::DocumentStore,
};
use uuid::Uuid;

use crate::{
  classify::classify_question,
  enrich::{Enrichment, NoEnrichment},
  error::{Error, Result},
  handler::{self, RelationAction},
  registry::{self, ValidateRequest},
  relation_intent::{classify_relation_intent, is_relation_question},
  resolver::{self, Answer},
  sync::{self, SyncStats, SyncStatus},
  text::normalize,
};

/// What `ask` returns: a resolved answer, or a structured relation
/// action (disambiguation or pending confirmation) for the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AskResponse {
  Answer(Answer),
  Action(RelationAction),
}

/// The engine facade over a storage backend and an optional enrichment
/// capability.
#[derive(Clone)]
pub struct QaService<S, E = NoEnrichment> {
  store:      Arc<S>,
  enrichment: E,
}

impl<S> QaService<S>
where
  S: DocumentStore,
{
  pub fn new(store: Arc<S>) -> Self {
    Self::with_enrichment(store, NoEnrichment)
  }
}

impl<S, E> QaService<S, E>
where
  S: DocumentStore,
  E: Enrichment,
{
  pub fn with_enrichment(store: Arc<S>, enrichment: E) -> Self {
    Self { store, enrichment }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  async fn require_document(&self, document_id: Uuid) -> Result<()> {
    self
      .store
      .get_document(document_id)
      .await
      .map_err(Error::store)?
      .ok_or(sibyl_core::Error::DocumentNotFound(document_id))?;
    Ok(())
  }

  // ── Questions ─────────────────────────────────────────────────────────

  /// Answer a free-text question about a document.
  ///
  /// Relation-management phrasing is detected by keyword trigger and
  /// routed to the relation handler; if no relation pattern matches,
  /// the question falls back to the tiered resolver — it is never
  /// dropped.
  pub async fn ask(&self, question: &str, document_id: Uuid) -> Result<AskResponse> {
    let question = question.trim();
    if question.is_empty() {
      return Err(sibyl_core::Error::InvalidInput("question is empty".into()).into());
    }
    self.require_document(document_id).await?;

    let normalized = normalize(question);

    if is_relation_question(&normalized) {
      if let Some(intent) = classify_relation_intent(&normalized) {
        tracing::debug!(document = %document_id, ?intent, "relation intent");
        let action = handler::handle(self.store.as_ref(), document_id, &intent).await?;
        return Ok(AskResponse::Action(action));
      }
    }

    let snapshot = self
      .store
      .load_snapshot(document_id)
      .await
      .map_err(Error::store)?
      .unwrap_or_default();

    let intent = classify_question(&normalized);
    tracing::debug!(document = %document_id, ?intent, "question intent");
    let mut answer = resolver::resolve(question, &intent, &snapshot);

    if answer.source == AnswerSource::ExactQa {
      if let Some(qa_id) = answer.qa_id {
        registry::record_usage(self.store.as_ref(), qa_id).await;
      }
    }

    // Enrichment is a best-effort last resort; its absence or failure
    // never blocks the rule-based result.
    if answer.source == AnswerSource::NotFound && self.enrichment.enabled() {
      if let Some(enriched) = self.enrichment.enhance(question).await {
        answer = Answer {
          answer:           enriched.answer,
          source:           AnswerSource::AiEnriched,
          confidence:       enriched.confidence,
          json_path:        None,
          json_data:        None,
          needs_validation: true,
          qa_id:            None,
        };
      }
    }

    Ok(AskResponse::Answer(answer))
  }

  // ── Validated answers ─────────────────────────────────────────────────

  /// Create-or-correct a validated answer and patch the snapshot.
  pub async fn validate_answer(&self, request: ValidateRequest) -> Result<ValidatedQa> {
    if let Some(document_id) = request.document_id {
      self.require_document(document_id).await?;
    }

    let qa = registry::validate_answer(self.store.as_ref(), request).await?;
    sync::upsert_validated_qa(self.store.as_ref(), &qa).await;
    Ok(qa)
  }

  /// Correct an existing validated answer and patch the snapshot.
  pub async fn correct_answer(
    &self,
    qa_id: Uuid,
    new_answer: &str,
    corrected_by: &str,
  ) -> Result<ValidatedQa> {
    let qa =
      registry::correct_answer(self.store.as_ref(), qa_id, new_answer, corrected_by)
        .await?;
    sync::upsert_validated_qa(self.store.as_ref(), &qa).await;
    Ok(qa)
  }

  /// Active validated answers visible to a document.
  pub async fn list_validated_qa(&self, document_id: Uuid) -> Result<Vec<ValidatedQa>> {
    self.require_document(document_id).await?;
    self.store.list_qa(document_id).await.map_err(Error::store)
  }

  /// Soft-delete a validated answer (original validator or privileged
  /// actor only) and retract it from the snapshot.
  pub async fn delete_qa(&self, qa_id: Uuid, actor: &Actor) -> Result<()> {
    let mut qa = registry::delete_answer(self.store.as_ref(), qa_id, actor).await?;
    qa.is_active = false;
    sync::upsert_validated_qa(self.store.as_ref(), &qa).await;
    Ok(())
  }

  // ── Relations ─────────────────────────────────────────────────────────

  /// Execute a confirmed `confirm_create_relation` action.
  pub async fn create_relation_from_suggestion(
    &self,
    source_annotation_id: Uuid,
    target_annotation_id: Uuid,
    relationship_name: &str,
    description: Option<String>,
    created_by: &str,
  ) -> Result<RelationCreation> {
    if relationship_name.trim().is_empty() {
      return Err(
        sibyl_core::Error::InvalidInput("relationship name is empty".into()).into(),
      );
    }

    self
      .store
      .create_relationship(NewRelationship {
        source_annotation_id,
        target_annotation_id,
        name: relationship_name.to_owned(),
        description,
        created_by: created_by.to_owned(),
      })
      .await
      .map_err(Error::store)
  }

  /// Rename or re-describe a relationship; a validated one is patched
  /// into the snapshot.
  pub async fn update_relation(
    &self,
    relationship_id: Uuid,
    name: Option<String>,
    description: Option<String>,
  ) -> Result<Relationship> {
    let relationship = self
      .store
      .update_relationship(relationship_id, name, description)
      .await
      .map_err(Error::store)?;

    if relationship.is_validated {
      sync::upsert_relation(self.store.as_ref(), &relationship).await;
    }
    Ok(relationship)
  }

  /// Validate a relationship — the trigger for its single-record
  /// snapshot sync. Idempotent.
  pub async fn validate_relation(
    &self,
    relationship_id: Uuid,
    validated_by: &str,
  ) -> Result<Relationship> {
    let relationship = self
      .store
      .validate_relationship(relationship_id, validated_by)
      .await
      .map_err(Error::store)?;

    sync::upsert_relation(self.store.as_ref(), &relationship).await;
    Ok(relationship)
  }

  /// Delete a relationship and retract it from the snapshot.
  pub async fn delete_relation(&self, relationship_id: Uuid) -> Result<()> {
    let relationship = self
      .store
      .get_relationship(relationship_id)
      .await
      .map_err(Error::store)?
      .ok_or(sibyl_core::Error::RelationshipNotFound(relationship_id))?;

    // The owning document is the source annotation's; resolve it before
    // the row disappears.
    let document_id = self
      .store
      .get_annotation(relationship.source_annotation_id)
      .await
      .map_err(Error::store)?
      .map(|a| a.document_id);

    self
      .store
      .delete_relationship(relationship_id)
      .await
      .map_err(Error::store)?;

    if let Some(document_id) = document_id {
      sync::remove_relation(self.store.as_ref(), document_id, relationship_id).await;
    }
    Ok(())
  }

  // ── Sync ──────────────────────────────────────────────────────────────

  /// Full rebuild of the document's snapshot (relations and Q&A).
  pub async fn sync_document(&self, document_id: Uuid, actor: &str) -> Result<SyncStats> {
    self.require_document(document_id).await?;
    sync::full_sync(self.store.as_ref(), document_id, actor).await
  }

  /// Drift report for a document.
  pub async fn sync_status(&self, document_id: Uuid) -> Result<SyncStatus> {
    self.require_document(document_id).await?;
    sync::sync_status(self.store.as_ref(), document_id).await
  }
}
