//! Handlers for `/documents/{id}/sync` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/documents/{id}/sync` | Body: `{"actor":"..."}`; full rebuild |
//! | `GET`  | `/documents/{id}/sync-status` | Drift report |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use serde::Deserialize;
use sibyl_core::store::DocumentStore;
use sibyl_engine::{
  QaService,
  enrich::Enrichment,
  sync::{SyncStats, SyncStatus},
};
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct SyncBody {
  pub actor: String,
}

/// `POST /documents/{id}/sync`
pub async fn sync_document<S, E>(
  State(service): State<Arc<QaService<S, E>>>,
  Path(document_id): Path<Uuid>,
  Json(body): Json<SyncBody>,
) -> Result<Json<SyncStats>, ApiError>
where
  S: DocumentStore,
  E: Enrichment,
{
  let stats = service.sync_document(document_id, &body.actor).await?;
  Ok(Json(stats))
}

/// `GET /documents/{id}/sync-status`
pub async fn sync_status<S, E>(
  State(service): State<Arc<QaService<S, E>>>,
  Path(document_id): Path<Uuid>,
) -> Result<Json<SyncStatus>, ApiError>
where
  S: DocumentStore,
  E: Enrichment,
{
  let status = service.sync_status(document_id).await?;
  Ok(Json(status))
}
