//! Snapshot synchronization.
//!
//! The snapshot is patched by pure `(Snapshot, delta) -> Snapshot`
//! functions, each independently testable without storage; the async
//! wrappers load, apply, and save.
//!
//! Failure semantics: single-record operations (the side effects of
//! relation/Q&A mutations) never raise — a failed sync degrades to
//! snapshot drift, which [`sync_status`] detects, and the QA read path
//! keeps serving from the last-known-good snapshot. Full rebuilds and
//! the status query are explicit caller requests; genuine storage
//! failures propagate there.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sibyl_core::{
  qa::ValidatedQa,
  relation::Relationship,
  snapshot::{self, EndpointView, QaView, RelationView, Snapshot},
  store::DocumentStore,
};
use uuid::Uuid;

use crate::error::{Error, Result};

// ─── Reported types ──────────────────────────────────────────────────────────

/// Result of a full document sync.
#[derive(Debug, Clone, Serialize)]
pub struct SyncStats {
  pub total_relations:    usize,
  pub total_validated_qa: usize,
  pub entity_types:       usize,
  pub synced_at:          DateTime<Utc>,
}

/// Drift report: authoritative validated-relation count versus what the
/// snapshot holds.
#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
  pub needs_sync:              bool,
  pub authoritative_relations: usize,
  pub snapshot_relations:      usize,
  pub total_entities:          usize,
  pub last_synced:             Option<DateTime<Utc>>,
  pub synced_by:               Option<String>,
}

/// Outcome of a single-record sync. Never an error: degradation is
/// reported, logged, and left for the next rebuild to repair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
  Applied,
  /// The operation does not apply (e.g. global Q&A with no bound
  /// document — fan-out is deferred).
  Skipped { reason: &'static str },
  Degraded { reason: String },
}

// ─── Pure snapshot transforms ────────────────────────────────────────────────

/// Full overwrite of `relations[]` — not a merge.
pub fn apply_relations_rebuild(
  mut snapshot: Snapshot,
  views: Vec<RelationView>,
  synced_by: &str,
  at: DateTime<Utc>,
) -> Snapshot {
  snapshot.relations = views;
  snapshot.metadata.total_relations = snapshot.relations.len();
  snapshot.metadata.last_synced = Some(at);
  snapshot.metadata.synced_by = Some(synced_by.to_owned());
  snapshot
}

/// Full overwrite of `validated_qa[]`.
pub fn apply_qa_rebuild(
  mut snapshot: Snapshot,
  views: Vec<QaView>,
  at: DateTime<Utc>,
) -> Snapshot {
  snapshot.validated_qa = views;
  snapshot.metadata.total_validated_qa = snapshot.validated_qa.len();
  snapshot.metadata.last_qa_sync = Some(at);
  snapshot
}

/// Replace the entry with the same id in place, or append. Unrelated
/// relations are untouched.
pub fn apply_relation_upsert(mut snapshot: Snapshot, view: RelationView) -> Snapshot {
  match snapshot
    .relations
    .iter_mut()
    .find(|r| r.relationship_id == view.relationship_id)
  {
    Some(slot) => *slot = view,
    None => snapshot.relations.push(view),
  }
  snapshot.metadata.total_relations = snapshot.relations.len();
  snapshot
}

/// Filter the entry out by id. A snapshot without the entry is left
/// unchanged (removal is idempotent).
pub fn apply_relation_removal(mut snapshot: Snapshot, relationship_id: Uuid) -> Snapshot {
  snapshot.relations.retain(|r| r.relationship_id != relationship_id);
  snapshot.metadata.total_relations = snapshot.relations.len();
  snapshot
}

/// Id-based upsert against `validated_qa[]`.
pub fn apply_qa_upsert(mut snapshot: Snapshot, view: QaView) -> Snapshot {
  match snapshot
    .validated_qa
    .iter_mut()
    .find(|qa| qa.qa_id == view.qa_id)
  {
    Some(slot) => *slot = view,
    None => snapshot.validated_qa.push(view),
  }
  snapshot.metadata.total_validated_qa = snapshot.validated_qa.len();
  snapshot
}

/// Filter a Q&A entry out by id.
pub fn apply_qa_removal(mut snapshot: Snapshot, qa_id: Uuid) -> Snapshot {
  snapshot.validated_qa.retain(|qa| qa.qa_id != qa_id);
  snapshot.metadata.total_validated_qa = snapshot.validated_qa.len();
  snapshot
}

// ─── View construction ───────────────────────────────────────────────────────

/// Denormalize a relationship: resolve both endpoints and pick the
/// owning document (the source annotation's). Fails when an endpoint
/// annotation has vanished.
async fn relation_view_for<S>(
  store: &S,
  relationship: &Relationship,
) -> Result<(Uuid, RelationView)>
where
  S: DocumentStore,
{
  let source = store
    .get_annotation(relationship.source_annotation_id)
    .await
    .map_err(Error::store)?
    .ok_or(sibyl_core::Error::AnnotationNotFound(
      relationship.source_annotation_id,
    ))?;
  let target = store
    .get_annotation(relationship.target_annotation_id)
    .await
    .map_err(Error::store)?
    .ok_or(sibyl_core::Error::AnnotationNotFound(
      relationship.target_annotation_id,
    ))?;

  let view = snapshot::relation_view(
    relationship,
    EndpointView {
      annotation_id: source.annotation_id,
      entity_type:   source.entity_type,
      value:         source.text,
      page:          source.page,
    },
    EndpointView {
      annotation_id: target.annotation_id,
      entity_type:   target.entity_type,
      value:         target.text,
      page:          target.page,
    },
  );

  Ok((source.document_id, view))
}

// ─── Single-record operations (degrade, never raise) ─────────────────────────

fn degraded(op: &str, e: impl std::fmt::Display) -> SyncOutcome {
  tracing::warn!(operation = op, error = %e, "snapshot sync degraded");
  SyncOutcome::Degraded { reason: e.to_string() }
}

/// Patch one relationship into its document's snapshot. Callable
/// immediately after a single relation's validation flag flips.
pub async fn upsert_relation<S>(store: &S, relationship: &Relationship) -> SyncOutcome
where
  S: DocumentStore,
{
  let (document_id, view) = match relation_view_for(store, relationship).await {
    Ok(pair) => pair,
    Err(e) => return degraded("upsert_relation", e),
  };

  let snapshot = match store.load_snapshot(document_id).await {
    Ok(s) => s.unwrap_or_default(),
    Err(e) => return degraded("upsert_relation", e),
  };

  let snapshot = apply_relation_upsert(snapshot, view);
  match store.save_snapshot(document_id, &snapshot).await {
    Ok(()) => SyncOutcome::Applied,
    Err(e) => degraded("upsert_relation", e),
  }
}

/// Retract a deleted relationship from its document's snapshot.
pub async fn remove_relation<S>(store: &S, document_id: Uuid, relationship_id: Uuid) -> SyncOutcome
where
  S: DocumentStore,
{
  let snapshot = match store.load_snapshot(document_id).await {
    Ok(Some(s)) => s,
    // No snapshot yet: nothing to retract.
    Ok(None) => return SyncOutcome::Applied,
    Err(e) => return degraded("remove_relation", e),
  };

  let snapshot = apply_relation_removal(snapshot, relationship_id);
  match store.save_snapshot(document_id, &snapshot).await {
    Ok(()) => SyncOutcome::Applied,
    Err(e) => degraded("remove_relation", e),
  }
}

/// Patch one validated answer into its document's snapshot.
///
/// Global Q&A with no bound document is an explicit no-op: fanning a
/// global answer out to every document snapshot is deferred, and such
/// records reach snapshots only through full rebuilds.
pub async fn upsert_validated_qa<S>(store: &S, qa: &ValidatedQa) -> SyncOutcome
where
  S: DocumentStore,
{
  let Some(document_id) = qa.document_id else {
    return SyncOutcome::Skipped { reason: "global answer with no bound document" };
  };

  let snapshot = match store.load_snapshot(document_id).await {
    Ok(s) => s.unwrap_or_default(),
    Err(e) => return degraded("upsert_validated_qa", e),
  };

  let snapshot = if qa.is_active {
    apply_qa_upsert(snapshot, QaView::from_qa(qa))
  } else {
    apply_qa_removal(snapshot, qa.qa_id)
  };

  match store.save_snapshot(document_id, &snapshot).await {
    Ok(()) => SyncOutcome::Applied,
    Err(e) => degraded("upsert_validated_qa", e),
  }
}

// ─── Full rebuilds ───────────────────────────────────────────────────────────

async fn validated_relation_views<S>(
  store: &S,
  document_id: Uuid,
) -> Result<Vec<RelationView>>
where
  S: DocumentStore,
{
  let relationships = store
    .list_relationships(document_id)
    .await
    .map_err(Error::store)?;

  let mut views = Vec::new();
  for relationship in relationships.iter().filter(|r| r.is_validated) {
    let (_, view) = relation_view_for(store, relationship).await?;
    views.push(view);
  }
  Ok(views)
}

/// Rebuild the snapshot's `relations[]` from scratch.
pub async fn rebuild_relations<S>(
  store: &S,
  document_id: Uuid,
  synced_by: &str,
) -> Result<usize>
where
  S: DocumentStore,
{
  let views = validated_relation_views(store, document_id).await?;
  let count = views.len();

  let snapshot = store
    .load_snapshot(document_id)
    .await
    .map_err(Error::store)?
    .unwrap_or_default();
  let snapshot = apply_relations_rebuild(snapshot, views, synced_by, Utc::now());
  store
    .save_snapshot(document_id, &snapshot)
    .await
    .map_err(Error::store)?;

  Ok(count)
}

/// Rebuild the snapshot's `validated_qa[]` from scratch.
pub async fn rebuild_validated_qa<S>(store: &S, document_id: Uuid) -> Result<usize>
where
  S: DocumentStore,
{
  let views: Vec<QaView> = store
    .list_qa(document_id)
    .await
    .map_err(Error::store)?
    .iter()
    .map(QaView::from_qa)
    .collect();
  let count = views.len();

  let snapshot = store
    .load_snapshot(document_id)
    .await
    .map_err(Error::store)?
    .unwrap_or_default();
  let snapshot = apply_qa_rebuild(snapshot, views, Utc::now());
  store
    .save_snapshot(document_id, &snapshot)
    .await
    .map_err(Error::store)?;

  Ok(count)
}

/// Full rebuild of both relations and Q&A in one snapshot write.
pub async fn full_sync<S>(
  store: &S,
  document_id: Uuid,
  synced_by: &str,
) -> Result<SyncStats>
where
  S: DocumentStore,
{
  let relation_views = validated_relation_views(store, document_id).await?;
  let qa_views: Vec<QaView> = store
    .list_qa(document_id)
    .await
    .map_err(Error::store)?
    .iter()
    .map(QaView::from_qa)
    .collect();

  let now = Utc::now();
  let snapshot = store
    .load_snapshot(document_id)
    .await
    .map_err(Error::store)?
    .unwrap_or_default();
  let snapshot = apply_relations_rebuild(snapshot, relation_views, synced_by, now);
  let snapshot = apply_qa_rebuild(snapshot, qa_views, now);

  store
    .save_snapshot(document_id, &snapshot)
    .await
    .map_err(Error::store)?;

  Ok(SyncStats {
    total_relations:    snapshot.metadata.total_relations,
    total_validated_qa: snapshot.metadata.total_validated_qa,
    entity_types:       snapshot.entities.len(),
    synced_at:          now,
  })
}

/// Compare the authoritative validated-relation count against the
/// snapshot. Drift between syncs is allowed; this is how it is seen.
pub async fn sync_status<S>(store: &S, document_id: Uuid) -> Result<SyncStatus>
where
  S: DocumentStore,
{
  let authoritative = store
    .count_validated_relationships(document_id)
    .await
    .map_err(Error::store)?;

  let snapshot = store
    .load_snapshot(document_id)
    .await
    .map_err(Error::store)?
    .unwrap_or_default();

  Ok(SyncStatus {
    needs_sync:              authoritative != snapshot.relations.len(),
    authoritative_relations: authoritative,
    snapshot_relations:      snapshot.relations.len(),
    total_entities:          snapshot.entity_count(),
    last_synced:             snapshot.metadata.last_synced,
    synced_by:               snapshot.metadata.synced_by,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use sibyl_core::qa::AnswerSource;

  fn view(id: Uuid, name: &str) -> RelationView {
    RelationView {
      relationship_id: id,
      name:            name.to_owned(),
      description:     None,
      source:          EndpointView {
        annotation_id: Uuid::new_v4(),
        entity_type:   "Product".into(),
        value:         "S 6490".into(),
        page:          1,
      },
      target:          EndpointView {
        annotation_id: Uuid::new_v4(),
        entity_type:   "Dosage".into(),
        value:         "5 mg".into(),
        page:          1,
      },
      is_validated:    true,
      validated_by:    None,
    }
  }

  #[test]
  fn relation_upsert_replaces_in_place_or_appends() {
    let id = Uuid::new_v4();
    let other = Uuid::new_v4();

    let snapshot = apply_relation_upsert(Snapshot::empty(), view(id, "has_dosage"));
    let snapshot = apply_relation_upsert(snapshot, view(other, "contains"));
    assert_eq!(snapshot.metadata.total_relations, 2);

    // Same id replaces, does not append; unrelated entry untouched.
    let snapshot = apply_relation_upsert(snapshot, view(id, "renamed"));
    assert_eq!(snapshot.relations.len(), 2);
    assert_eq!(snapshot.relations[0].name, "renamed");
    assert_eq!(snapshot.relations[1].name, "contains");
  }

  #[test]
  fn relation_removal_is_idempotent() {
    let id = Uuid::new_v4();
    let snapshot = apply_relation_upsert(Snapshot::empty(), view(id, "has_dosage"));

    let snapshot = apply_relation_removal(snapshot, id);
    assert!(snapshot.relations.is_empty());
    assert_eq!(snapshot.metadata.total_relations, 0);

    // Removing again (or from an empty snapshot) is a success no-op.
    let snapshot = apply_relation_removal(snapshot, id);
    assert!(snapshot.relations.is_empty());
  }

  #[test]
  fn rebuild_overwrites_instead_of_merging() {
    let stale = apply_relation_upsert(Snapshot::empty(), view(Uuid::new_v4(), "stale"));

    let fresh = vec![view(Uuid::new_v4(), "a"), view(Uuid::new_v4(), "b")];
    let snapshot =
      apply_relations_rebuild(stale, fresh, "dr. blanche", Utc::now());

    assert_eq!(snapshot.relations.len(), 2);
    assert!(snapshot.relations.iter().all(|r| r.name != "stale"));
    assert_eq!(snapshot.metadata.total_relations, 2);
    assert_eq!(snapshot.metadata.synced_by.as_deref(), Some("dr. blanche"));
  }

  #[test]
  fn qa_upsert_and_removal_track_metadata() {
    let qa = QaView {
      qa_id:               Uuid::new_v4(),
      question:            "Q?".into(),
      question_normalized: "q".into(),
      answer:              "A".into(),
      source:              AnswerSource::ExpertKnowledge,
      json_path:           None,
      confidence:          1.0,
      is_global:           false,
    };

    let snapshot = apply_qa_upsert(Snapshot::empty(), qa.clone());
    assert_eq!(snapshot.metadata.total_validated_qa, 1);

    let mut corrected = qa.clone();
    corrected.answer = "B".into();
    let snapshot = apply_qa_upsert(snapshot, corrected);
    assert_eq!(snapshot.validated_qa.len(), 1);
    assert_eq!(snapshot.validated_qa[0].answer, "B");

    let snapshot = apply_qa_removal(snapshot, qa.qa_id);
    assert!(snapshot.validated_qa.is_empty());
    assert_eq!(snapshot.metadata.total_validated_qa, 0);
  }
}
