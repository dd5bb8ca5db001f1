//! Integration tests for `SqliteStore` against an in-memory database.

use sibyl_core::{
  document::NewAnnotation,
  qa::{AnswerSource, NewValidatedQa},
  relation::{NewRelationship, RelationCreation, Relationship},
  snapshot::Snapshot,
  store::DocumentStore,
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn create_relationship(
  s: &SqliteStore,
  src: Uuid,
  tgt: Uuid,
  name: &str,
) -> Relationship {
  match s
    .create_relationship(NewRelationship {
      source_annotation_id: src,
      target_annotation_id: tgt,
      name:                 name.into(),
      description:          None,
      created_by:           "alice".into(),
    })
    .await
    .unwrap()
  {
    RelationCreation::Created(rel) => rel,
    RelationCreation::Duplicate { existing } => {
      panic!("unexpected duplicate of {existing}")
    }
  }
}

async fn seed_document(s: &SqliteStore) -> Uuid {
  s.add_document("Leaflet").await.unwrap().document_id
}

async fn seed_annotation(
  s: &SqliteStore,
  document_id: Uuid,
  entity_type: &str,
  text: &str,
) -> Uuid {
  s.add_annotation(NewAnnotation {
    document_id,
    page: 1,
    entity_type: entity_type.into(),
    text: text.into(),
  })
  .await
  .unwrap()
  .annotation_id
}

fn expert_qa(document_id: Uuid, question: &str, answer: &str) -> NewValidatedQa {
  NewValidatedQa {
    document_id:         Some(document_id),
    question:            question.into(),
    question_normalized: question.to_lowercase(),
    answer:              answer.into(),
    source:              AnswerSource::ExpertKnowledge,
    json_path:           None,
    confidence:          1.0,
    validated_by:        "dr. blanche".into(),
    tags:                vec![],
    is_global:           false,
  }
}

// ─── Documents & annotations ─────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_document() {
  let s = store().await;

  let doc = s.add_document("Notice S 6490").await.unwrap();
  assert_eq!(doc.title, "Notice S 6490");

  let fetched = s.get_document(doc.document_id).await.unwrap().unwrap();
  assert_eq!(fetched.document_id, doc.document_id);
}

#[tokio::test]
async fn get_document_missing_returns_none() {
  let s = store().await;
  assert!(s.get_document(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn annotation_requires_document() {
  let s = store().await;
  let err = s
    .add_annotation(NewAnnotation {
      document_id: Uuid::new_v4(),
      page:        1,
      entity_type: "Product".into(),
      text:        "S 6490".into(),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::DocumentNotFound(_)));
}

#[tokio::test]
async fn list_annotations_scoped_to_document() {
  let s = store().await;
  let doc_a = seed_document(&s).await;
  let doc_b = seed_document(&s).await;

  seed_annotation(&s, doc_a, "Product", "S 6490").await;
  seed_annotation(&s, doc_a, "Dosage", "5 mg").await;
  seed_annotation(&s, doc_b, "Product", "Other").await;

  let annotations = s.list_annotations(doc_a).await.unwrap();
  assert_eq!(annotations.len(), 2);
  assert!(annotations.iter().all(|a| a.document_id == doc_a));
}

// ─── Relationships ───────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_relationship() {
  let s = store().await;
  let doc = seed_document(&s).await;
  let src = seed_annotation(&s, doc, "Product", "S 6490").await;
  let tgt = seed_annotation(&s, doc, "Dosage", "5 mg").await;

  let rel = create_relationship(&s, src, tgt, "has_dosage").await;
  assert!(!rel.is_validated);

  let fetched = s.get_relationship(rel.relationship_id).await.unwrap().unwrap();
  assert_eq!(fetched.name, "has_dosage");
  assert_eq!(fetched.source_annotation_id, src);
}

#[tokio::test]
async fn duplicate_relationship_returns_existing_id() {
  let s = store().await;
  let doc = seed_document(&s).await;
  let src = seed_annotation(&s, doc, "Product", "S 6490").await;
  let tgt = seed_annotation(&s, doc, "Dosage", "5 mg").await;

  let first = create_relationship(&s, src, tgt, "has_dosage").await;

  let outcome = s
    .create_relationship(NewRelationship {
      source_annotation_id: src,
      target_annotation_id: tgt,
      name:                 "has_dosage".into(),
      description:          None,
      created_by:           "bob".into(),
    })
    .await
    .unwrap();
  assert!(matches!(
    outcome,
    RelationCreation::Duplicate { existing } if existing == first.relationship_id
  ));

  // A different name between the same endpoints is a new edge.
  create_relationship(&s, src, tgt, "mentions").await;
  assert_eq!(s.list_relationships(doc).await.unwrap().len(), 2);
}

#[tokio::test]
async fn validate_relationship_is_idempotent() {
  let s = store().await;
  let doc = seed_document(&s).await;
  let src = seed_annotation(&s, doc, "Product", "S 6490").await;
  let tgt = seed_annotation(&s, doc, "Dosage", "5 mg").await;

  let rel = create_relationship(&s, src, tgt, "has_dosage").await;

  let first = s
    .validate_relationship(rel.relationship_id, "dr. blanche")
    .await
    .unwrap();
  assert!(first.is_validated);
  assert_eq!(first.validated_by.as_deref(), Some("dr. blanche"));

  // Second validation keeps the original validator.
  let second = s
    .validate_relationship(rel.relationship_id, "someone else")
    .await
    .unwrap();
  assert_eq!(second.validated_by.as_deref(), Some("dr. blanche"));
  assert_eq!(second.validated_at, first.validated_at);
}

#[tokio::test]
async fn delete_relationship_removes_row() {
  let s = store().await;
  let doc = seed_document(&s).await;
  let src = seed_annotation(&s, doc, "Product", "S 6490").await;
  let tgt = seed_annotation(&s, doc, "Dosage", "5 mg").await;

  let rel = create_relationship(&s, src, tgt, "has_dosage").await;

  s.delete_relationship(rel.relationship_id).await.unwrap();
  assert!(s.get_relationship(rel.relationship_id).await.unwrap().is_none());

  let err = s.delete_relationship(rel.relationship_id).await.unwrap_err();
  assert!(matches!(err, crate::Error::RelationshipNotFound(_)));
}

#[tokio::test]
async fn relationships_between_matches_either_orientation() {
  let s = store().await;
  let doc = seed_document(&s).await;
  let a = seed_annotation(&s, doc, "Product", "S 6490").await;
  let b = seed_annotation(&s, doc, "Dosage", "5 mg").await;

  create_relationship(&s, a, b, "has_dosage").await;

  assert_eq!(s.relationships_between(a, b).await.unwrap().len(), 1);
  assert_eq!(s.relationships_between(b, a).await.unwrap().len(), 1);
}

#[tokio::test]
async fn count_validated_relationships_ignores_unvalidated() {
  let s = store().await;
  let doc = seed_document(&s).await;
  let a = seed_annotation(&s, doc, "Product", "S 6490").await;
  let b = seed_annotation(&s, doc, "Dosage", "5 mg").await;
  let c = seed_annotation(&s, doc, "Substance", "perindopril").await;

  let r1 = create_relationship(&s, a, b, "has_dosage").await;
  create_relationship(&s, a, c, "contains").await;

  assert_eq!(s.count_validated_relationships(doc).await.unwrap(), 0);

  s.validate_relationship(r1.relationship_id, "dr. blanche")
    .await
    .unwrap();
  assert_eq!(s.count_validated_relationships(doc).await.unwrap(), 1);
}

// ─── Validated Q&A ───────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_find_qa_exact() {
  let s = store().await;
  let doc = seed_document(&s).await;

  let qa = s
    .insert_qa(expert_qa(doc, "What is the dosage?", "5 mg"))
    .await
    .unwrap();

  let found = s
    .find_qa_exact(Some(doc), "what is the dosage?")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(found.qa_id, qa.qa_id);
  assert_eq!(found.answer, "5 mg");
}

#[tokio::test]
async fn document_scoped_qa_shadows_global() {
  let s = store().await;
  let doc = seed_document(&s).await;

  let mut global = expert_qa(doc, "What is the dosage?", "global answer");
  global.document_id = None;
  global.is_global = true;
  s.insert_qa(global).await.unwrap();

  let local = s
    .insert_qa(expert_qa(doc, "What is the dosage?", "5 mg"))
    .await
    .unwrap();

  let found = s
    .find_qa_exact(Some(doc), "what is the dosage?")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(found.qa_id, local.qa_id);
}

#[tokio::test]
async fn list_qa_includes_globals_and_skips_inactive() {
  let s = store().await;
  let doc = seed_document(&s).await;

  let local = s
    .insert_qa(expert_qa(doc, "Local question?", "local"))
    .await
    .unwrap();

  let mut global = expert_qa(doc, "Global question?", "global");
  global.document_id = None;
  global.is_global = true;
  s.insert_qa(global).await.unwrap();

  assert_eq!(s.list_qa(doc).await.unwrap().len(), 2);

  s.soft_delete_qa(local.qa_id).await.unwrap();
  let remaining = s.list_qa(doc).await.unwrap();
  assert_eq!(remaining.len(), 1);
  assert_eq!(remaining[0].answer, "global");

  // The soft-deleted row is preserved.
  let deleted = s.get_qa(local.qa_id).await.unwrap().unwrap();
  assert!(!deleted.is_active);
}

#[tokio::test]
async fn update_qa_roundtrips_history() {
  let s = store().await;
  let doc = seed_document(&s).await;

  let mut qa = s
    .insert_qa(expert_qa(doc, "What is the dosage?", "4 mg"))
    .await
    .unwrap();

  qa.previous_answers.push(qa.answer.clone());
  qa.answer = "5 mg".into();
  qa.correction_count += 1;
  s.update_qa(&qa).await.unwrap();

  let fetched = s.get_qa(qa.qa_id).await.unwrap().unwrap();
  assert_eq!(fetched.answer, "5 mg");
  assert_eq!(fetched.previous_answers, vec!["4 mg".to_string()]);
  assert_eq!(fetched.correction_count, 1);
}

#[tokio::test]
async fn update_missing_qa_errors() {
  let s = store().await;
  let doc = seed_document(&s).await;

  let mut qa = s
    .insert_qa(expert_qa(doc, "Q?", "A"))
    .await
    .unwrap();
  qa.qa_id = Uuid::new_v4();

  let err = s.update_qa(&qa).await.unwrap_err();
  assert!(matches!(err, crate::Error::QaNotFound(_)));
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn snapshot_save_and_load_roundtrip() {
  let s = store().await;
  let doc = seed_document(&s).await;

  assert!(s.load_snapshot(doc).await.unwrap().is_none());

  let mut snapshot = Snapshot::empty();
  snapshot
    .entities
    .insert("Product".into(), vec!["S 6490".into()]);
  snapshot.metadata.total_relations = 0;

  s.save_snapshot(doc, &snapshot).await.unwrap();
  let loaded = s.load_snapshot(doc).await.unwrap().unwrap();
  assert_eq!(loaded, snapshot);

  // Overwrite wins.
  snapshot.entities.insert("Dosage".into(), vec!["5 mg".into()]);
  s.save_snapshot(doc, &snapshot).await.unwrap();
  let loaded = s.load_snapshot(doc).await.unwrap().unwrap();
  assert_eq!(loaded.entity_count(), 2);
}

#[tokio::test]
async fn malformed_snapshot_loads_as_none() {
  let s = store().await;
  let doc = seed_document(&s).await;

  let snapshot = Snapshot::empty();
  s.save_snapshot(doc, &snapshot).await.unwrap();

  // Corrupt the stored JSON behind the store's back.
  let doc_str = doc.hyphenated().to_string();
  s.conn_for_tests()
    .call(move |conn| {
      conn.execute(
        "UPDATE snapshots SET content = '{not json' WHERE document_id = ?1",
        rusqlite::params![doc_str],
      )?;
      Ok(())
    })
    .await
    .unwrap();

  assert!(s.load_snapshot(doc).await.unwrap().is_none());
}
