//! JSON REST API for Sibyl.
//!
//! Exposes an axum [`Router`] backed by a
//! [`sibyl_engine::QaService`] over any
//! [`sibyl_core::store::DocumentStore`]. Auth, TLS, and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", sibyl_api::api_router(service.clone()))
//! ```

pub mod error;
pub mod qa;
pub mod relations;
pub mod sync;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{delete, get, post},
};
use serde::Deserialize;
use sibyl_core::store::DocumentStore;
use sibyl_engine::{QaService, enrich::Enrichment};

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `SIBYL_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `service`.
///
/// The returned `Router<()>` can be nested into any parent router
/// regardless of its own state type.
pub fn api_router<S, E>(service: Arc<QaService<S, E>>) -> Router<()>
where
  S: DocumentStore + 'static,
  E: Enrichment + 'static,
{
  Router::new()
    // Questions
    .route("/ask", post(qa::ask::<S, E>))
    // Validated answers
    .route("/qa", get(qa::list::<S, E>).post(qa::validate::<S, E>))
    .route("/qa/{id}/correct", post(qa::correct::<S, E>))
    .route("/qa/{id}/delete", post(qa::delete::<S, E>))
    // Relations
    .route("/relations", post(relations::create::<S, E>))
    .route("/relations/{id}", delete(relations::delete::<S, E>))
    .route("/relations/{id}/update", post(relations::update::<S, E>))
    .route("/relations/{id}/validate", post(relations::validate::<S, E>))
    // Sync
    .route("/documents/{id}/sync", post(sync::sync_document::<S, E>))
    .route("/documents/{id}/sync-status", get(sync::sync_status::<S, E>))
    .with_state(service)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use sibyl_core::document::NewAnnotation;
  use sibyl_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;
  use uuid::Uuid;

  async fn make_service() -> (Arc<QaService<SqliteStore>>, Arc<SqliteStore>, Uuid) {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let doc = store.add_document("Notice S 6490").await.unwrap().document_id;
    (Arc::new(QaService::new(store.clone())), store, doc)
  }

  async fn request(
    service: Arc<QaService<SqliteStore>>,
    method: &str,
    uri: &str,
    body: serde_json::Value,
  ) -> (StatusCode, serde_json::Value) {
    let req = Request::builder()
      .method(method)
      .uri(uri)
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap();

    let resp = api_router(service).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
      serde_json::Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
  }

  #[tokio::test]
  async fn ask_returns_not_found_answer_on_empty_document() {
    let (service, _store, doc) = make_service().await;

    let (status, body) = request(
      service,
      "POST",
      "/ask",
      serde_json::json!({ "question": "What is the dosage?", "document_id": doc }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "answer");
    assert_eq!(body["source"], "not_found");
    assert_eq!(body["needs_validation"], true);
  }

  #[tokio::test]
  async fn validate_then_ask_roundtrip() {
    let (service, _store, doc) = make_service().await;

    let (status, created) = request(
      service.clone(),
      "POST",
      "/qa",
      serde_json::json!({
        "question": "What is the dosage?",
        "answer": "5 mg",
        "document_id": doc,
        "validated_by": "dr. blanche",
      }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["answer"], "5 mg");

    let (status, body) = request(
      service,
      "POST",
      "/ask",
      serde_json::json!({ "question": "What is the dosage?", "document_id": doc }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "exact_qa");
    assert_eq!(body["answer"], "5 mg");
    assert_eq!(body["needs_validation"], false);
  }

  #[tokio::test]
  async fn duplicate_relation_returns_409_with_existing_id() {
    let (service, store, doc) = make_service().await;
    let src = store
      .add_annotation(NewAnnotation {
        document_id: doc,
        page:        1,
        entity_type: "Product".into(),
        text:        "S 6490".into(),
      })
      .await
      .unwrap()
      .annotation_id;
    let tgt = store
      .add_annotation(NewAnnotation {
        document_id: doc,
        page:        1,
        entity_type: "Dosage".into(),
        text:        "5 mg".into(),
      })
      .await
      .unwrap()
      .annotation_id;

    let body = serde_json::json!({
      "source_annotation_id": src,
      "target_annotation_id": tgt,
      "name": "has_dosage",
      "created_by": "alice",
    });

    let (status, created) =
      request(service.clone(), "POST", "/relations", body.clone()).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, conflict) = request(service, "POST", "/relations", body).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(conflict["existing"], created["relationship_id"]);
  }

  #[tokio::test]
  async fn sync_status_reports_drift_and_sync_clears_it() {
    let (service, store, doc) = make_service().await;
    let src = store
      .add_annotation(NewAnnotation {
        document_id: doc,
        page:        1,
        entity_type: "Product".into(),
        text:        "S 6490".into(),
      })
      .await
      .unwrap()
      .annotation_id;
    let tgt = store
      .add_annotation(NewAnnotation {
        document_id: doc,
        page:        1,
        entity_type: "Dosage".into(),
        text:        "5 mg".into(),
      })
      .await
      .unwrap()
      .annotation_id;

    let (_, created) = request(
      service.clone(),
      "POST",
      "/relations",
      serde_json::json!({
        "source_annotation_id": src,
        "target_annotation_id": tgt,
        "name": "has_dosage",
        "created_by": "alice",
      }),
    )
    .await;
    let rel_id = created["relationship_id"].as_str().unwrap().to_owned();

    // Validate directly against the store: drift appears.
    store
      .validate_relationship(rel_id.parse().unwrap(), "dr. blanche")
      .await
      .unwrap();

    let (status, drift) = request(
      service.clone(),
      "GET",
      &format!("/documents/{doc}/sync-status"),
      serde_json::Value::Null,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(drift["needs_sync"], true);

    let (status, stats) = request(
      service.clone(),
      "POST",
      &format!("/documents/{doc}/sync"),
      serde_json::json!({ "actor": "dr. blanche" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_relations"], 1);

    let (_, clean) = request(
      service,
      "GET",
      &format!("/documents/{doc}/sync-status"),
      serde_json::Value::Null,
    )
    .await;
    assert_eq!(clean["needs_sync"], false);
  }

  #[tokio::test]
  async fn unknown_document_is_404() {
    let (service, _store, _doc) = make_service().await;

    let (status, _) = request(
      service,
      "POST",
      "/ask",
      serde_json::json!({
        "question": "What is the dosage?",
        "document_id": Uuid::new_v4(),
      }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }
}
