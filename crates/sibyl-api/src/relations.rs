//! Handlers for `/relations` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/relations` | Body: [`CreateBody`]; 201, or 409 with existing id |
//! | `POST`   | `/relations/{id}/update` | Body: `{"name":?,"description":?}` |
//! | `POST`   | `/relations/{id}/validate` | Body: `{"validated_by":"..."}` |
//! | `DELETE` | `/relations/{id}` | Retracts from the snapshot too |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use sibyl_core::{
  relation::{RelationCreation, Relationship},
  store::DocumentStore,
};
use sibyl_engine::{QaService, enrich::Enrichment};
use uuid::Uuid;

use crate::error::ApiError;

// ─── Create ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /relations` — typically the confirmation
/// of a `confirm_create_relation` action.
#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub source_annotation_id: Uuid,
  pub target_annotation_id: Uuid,
  pub name:                 String,
  pub description:          Option<String>,
  pub created_by:           String,
}

/// `POST /relations` — 201 on creation, 409 with the existing id on an
/// exact duplicate.
pub async fn create<S, E>(
  State(service): State<Arc<QaService<S, E>>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocumentStore,
  E: Enrichment,
{
  let outcome = service
    .create_relation_from_suggestion(
      body.source_annotation_id,
      body.target_annotation_id,
      &body.name,
      body.description,
      &body.created_by,
    )
    .await?;

  match outcome {
    RelationCreation::Created(rel) => Ok((StatusCode::CREATED, Json(rel))),
    RelationCreation::Duplicate { existing } => {
      Err(ApiError::Conflict { existing })
    }
  }
}

// ─── Update ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  pub name:        Option<String>,
  pub description: Option<String>,
}

/// `POST /relations/{id}/update`
pub async fn update<S, E>(
  State(service): State<Arc<QaService<S, E>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<UpdateBody>,
) -> Result<Json<Relationship>, ApiError>
where
  S: DocumentStore,
  E: Enrichment,
{
  let rel = service.update_relation(id, body.name, body.description).await?;
  Ok(Json(rel))
}

// ─── Validate ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ValidateBody {
  pub validated_by: String,
}

/// `POST /relations/{id}/validate` — idempotent; triggers the
/// single-record snapshot sync.
pub async fn validate<S, E>(
  State(service): State<Arc<QaService<S, E>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ValidateBody>,
) -> Result<Json<Relationship>, ApiError>
where
  S: DocumentStore,
  E: Enrichment,
{
  let rel = service.validate_relation(id, &body.validated_by).await?;
  Ok(Json(rel))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /relations/{id}`
pub async fn delete<S, E>(
  State(service): State<Arc<QaService<S, E>>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: DocumentStore,
  E: Enrichment,
{
  service.delete_relation(id).await?;
  Ok(StatusCode::NO_CONTENT)
}
