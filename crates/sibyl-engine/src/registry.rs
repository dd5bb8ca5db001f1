//! The validated-answer registry.
//!
//! Creates and corrects validated Q&A records independently of how the
//! answer was produced (system lookup or expert-entered). The invariant
//! is one active record per (document-or-global, normalized question):
//! an exact normalized match is corrected in place — history appended,
//! correction count incremented — never duplicated.
//!
//! Correction rule: every correction sets confidence to 1.0. The
//! correction is expert-entered, so it is fully verified by definition.

use chrono::{DateTime, Utc};
use sibyl_core::{
  document::Actor,
  qa::{AnswerSource, NewValidatedQa, ValidatedQa},
  store::DocumentStore,
};
use uuid::Uuid;

use crate::{
  error::{Error, Result},
  text::normalize,
};

/// Confidence assigned to a freshly validated answer.
pub const VALIDATED_CONFIDENCE: f64 = 1.0;

/// Input to [`validate_answer`].
#[derive(Debug, Clone)]
pub struct ValidateRequest {
  pub document_id:  Option<Uuid>,
  pub question:     String,
  pub answer:       String,
  pub validated_by: String,
  pub source:       AnswerSource,
  pub json_path:    Option<String>,
  pub tags:         Vec<String>,
  pub is_global:    bool,
}

/// Apply a correction in place: append the superseded answer to
/// history, bump the correction count, reset confidence, restamp the
/// validator.
pub fn apply_correction(
  qa: &mut ValidatedQa,
  new_answer: String,
  corrected_by: &str,
  source: AnswerSource,
  at: DateTime<Utc>,
) {
  qa.previous_answers.push(std::mem::replace(&mut qa.answer, new_answer));
  qa.correction_count += 1;
  qa.confidence = VALIDATED_CONFIDENCE;
  qa.validated_by = corrected_by.to_owned();
  qa.validated_at = at;
  qa.source = source;
}

/// Provenance of a correction: corrections of enriched answers are
/// tagged as such, everything else is expert knowledge.
fn correction_source(previous: AnswerSource) -> AnswerSource {
  match previous {
    AnswerSource::AiEnriched | AnswerSource::AiCorrection => {
      AnswerSource::AiCorrection
    }
    _ => AnswerSource::ExpertKnowledge,
  }
}

/// Create-or-correct a validated answer.
///
/// An existing active record with the same normalized question (scoped
/// to the document or global) is corrected in place; otherwise a new
/// record is inserted.
pub async fn validate_answer<S>(store: &S, req: ValidateRequest) -> Result<ValidatedQa>
where
  S: DocumentStore,
{
  if req.question.trim().is_empty() {
    return Err(sibyl_core::Error::InvalidInput("question is empty".into()).into());
  }
  if req.answer.trim().is_empty() {
    return Err(sibyl_core::Error::InvalidInput("answer is empty".into()).into());
  }

  let normalized = normalize(&req.question);

  let existing = store
    .find_qa_exact(req.document_id, &normalized)
    .await
    .map_err(Error::store)?;

  if let Some(mut qa) = existing {
    if qa.answer == req.answer {
      return Ok(qa);
    }
    apply_correction(&mut qa, req.answer, &req.validated_by, req.source, Utc::now());
    if req.json_path.is_some() {
      qa.json_path = req.json_path;
    }
    store.update_qa(&qa).await.map_err(Error::store)?;
    return Ok(qa);
  }

  store
    .insert_qa(NewValidatedQa {
      document_id:         req.document_id,
      question:            req.question,
      question_normalized: normalized,
      answer:              req.answer,
      source:              req.source,
      json_path:           req.json_path,
      confidence:          VALIDATED_CONFIDENCE,
      validated_by:        req.validated_by,
      tags:                req.tags,
      is_global:           req.is_global,
    })
    .await
    .map_err(Error::store)
}

/// Correct an existing validated answer by id.
pub async fn correct_answer<S>(
  store: &S,
  qa_id: Uuid,
  new_answer: &str,
  corrected_by: &str,
) -> Result<ValidatedQa>
where
  S: DocumentStore,
{
  if new_answer.trim().is_empty() {
    return Err(sibyl_core::Error::InvalidInput("answer is empty".into()).into());
  }

  let mut qa = store
    .get_qa(qa_id)
    .await
    .map_err(Error::store)?
    .filter(|qa| qa.is_active)
    .ok_or(sibyl_core::Error::QaNotFound(qa_id))?;

  let source = correction_source(qa.source);
  apply_correction(&mut qa, new_answer.to_owned(), corrected_by, source, Utc::now());
  store.update_qa(&qa).await.map_err(Error::store)?;
  Ok(qa)
}

/// Soft-delete a validated answer. Only the original validator or a
/// privileged actor may delete.
pub async fn delete_answer<S>(store: &S, qa_id: Uuid, actor: &Actor) -> Result<ValidatedQa>
where
  S: DocumentStore,
{
  let qa = store
    .get_qa(qa_id)
    .await
    .map_err(Error::store)?
    .filter(|qa| qa.is_active)
    .ok_or(sibyl_core::Error::QaNotFound(qa_id))?;

  if !actor.privileged && actor.name != qa.validated_by {
    return Err(
      sibyl_core::Error::NotAuthorized {
        actor:  actor.name.clone(),
        action: "delete this validated answer",
      }
      .into(),
    );
  }

  store.soft_delete_qa(qa_id).await.map_err(Error::store)?;
  Ok(qa)
}

/// Best-effort usage bump for a served answer. Failures are logged and
/// swallowed — serving the answer matters more than the counter.
pub async fn record_usage<S>(store: &S, qa_id: Uuid)
where
  S: DocumentStore,
{
  let fetched = store.get_qa(qa_id).await;
  match fetched {
    Ok(Some(mut qa)) => {
      qa.usage_count += 1;
      if let Err(e) = store.update_qa(&qa).await {
        tracing::warn!(qa = %qa_id, error = %e, "failed to record answer usage");
      }
    }
    Ok(None) => {}
    Err(e) => {
      tracing::warn!(qa = %qa_id, error = %e, "failed to load answer for usage bump");
    }
  }
}
