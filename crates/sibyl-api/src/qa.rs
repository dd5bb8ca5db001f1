//! Handlers for `/ask` and `/qa` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/ask` | Body: [`AskBody`]; answer or relation action |
//! | `GET`  | `/qa` | `?document_id` required |
//! | `POST` | `/qa` | Body: [`ValidateBody`]; creates or corrects |
//! | `POST` | `/qa/{id}/correct` | Body: `{"answer":"...","corrected_by":"..."}` |
//! | `POST` | `/qa/{id}/delete` | Body: [`ActorBody`]; soft delete |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use sibyl_core::{
  document::Actor,
  qa::{AnswerSource, ValidatedQa},
  store::DocumentStore,
};
use sibyl_engine::{
  AskResponse, QaService, enrich::Enrichment, registry::ValidateRequest,
};
use uuid::Uuid;

use crate::error::ApiError;

// ─── Ask ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AskBody {
  pub question:    String,
  pub document_id: Uuid,
}

/// `POST /ask`
pub async fn ask<S, E>(
  State(service): State<Arc<QaService<S, E>>>,
  Json(body): Json<AskBody>,
) -> Result<Json<AskResponse>, ApiError>
where
  S: DocumentStore,
  E: Enrichment,
{
  let response = service.ask(&body.question, body.document_id).await?;
  Ok(Json(response))
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub document_id: Uuid,
}

/// `GET /qa?document_id=<id>`
pub async fn list<S, E>(
  State(service): State<Arc<QaService<S, E>>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<ValidatedQa>>, ApiError>
where
  S: DocumentStore,
  E: Enrichment,
{
  let qa = service.list_validated_qa(params.document_id).await?;
  Ok(Json(qa))
}

// ─── Validate ─────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /qa`.
#[derive(Debug, Deserialize)]
pub struct ValidateBody {
  pub question:     String,
  pub answer:       String,
  pub document_id:  Option<Uuid>,
  pub validated_by: String,
  pub source:       Option<AnswerSource>,
  pub json_path:    Option<String>,
  #[serde(default)]
  pub tags:         Vec<String>,
  #[serde(default)]
  pub is_global:    bool,
}

impl From<ValidateBody> for ValidateRequest {
  fn from(b: ValidateBody) -> Self {
    ValidateRequest {
      document_id:  b.document_id,
      question:     b.question,
      answer:       b.answer,
      validated_by: b.validated_by,
      source:       b.source.unwrap_or(AnswerSource::ExpertKnowledge),
      json_path:    b.json_path,
      tags:         b.tags,
      is_global:    b.is_global,
    }
  }
}

/// `POST /qa` — returns 201 + the stored (or corrected) record.
pub async fn validate<S, E>(
  State(service): State<Arc<QaService<S, E>>>,
  Json(body): Json<ValidateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocumentStore,
  E: Enrichment,
{
  let qa = service.validate_answer(ValidateRequest::from(body)).await?;
  Ok((StatusCode::CREATED, Json(qa)))
}

// ─── Correct ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CorrectBody {
  pub answer:       String,
  pub corrected_by: String,
}

/// `POST /qa/{id}/correct`
pub async fn correct<S, E>(
  State(service): State<Arc<QaService<S, E>>>,
  Path(qa_id): Path<Uuid>,
  Json(body): Json<CorrectBody>,
) -> Result<Json<ValidatedQa>, ApiError>
where
  S: DocumentStore,
  E: Enrichment,
{
  let qa = service
    .correct_answer(qa_id, &body.answer, &body.corrected_by)
    .await?;
  Ok(Json(qa))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ActorBody {
  pub actor:      String,
  #[serde(default)]
  pub privileged: bool,
}

/// `POST /qa/{id}/delete` — soft delete; original validator or a
/// privileged actor only.
pub async fn delete<S, E>(
  State(service): State<Arc<QaService<S, E>>>,
  Path(qa_id): Path<Uuid>,
  Json(body): Json<ActorBody>,
) -> Result<StatusCode, ApiError>
where
  S: DocumentStore,
  E: Enrichment,
{
  let actor = Actor { name: body.actor, privileged: body.privileged };
  service.delete_qa(qa_id, &actor).await?;
  Ok(StatusCode::NO_CONTENT)
}
