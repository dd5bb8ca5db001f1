//! [`SqliteStore`] — the SQLite implementation of [`DocumentStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use sibyl_core::{
  document::{Annotation, Document, NewAnnotation},
  qa::{NewValidatedQa, ValidatedQa},
  relation::{NewRelationship, RelationCreation, Relationship},
  snapshot::Snapshot,
  store::DocumentStore,
};

use crate::{
  encode::{
    encode_dt, encode_string_list, encode_uuid, RawAnnotation, RawDocument,
    RawRelationship, RawValidatedQa,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Sibyl knowledge store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Direct connection access for tests that corrupt stored state.
  #[cfg(test)]
  pub(crate) fn conn_for_tests(&self) -> &tokio_rusqlite::Connection {
    &self.conn
  }

  /// Fetch one relationship row by id, undecoded.
  async fn raw_relationship(&self, id: Uuid) -> Result<Option<RawRelationship>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT relationship_id, source_annotation_id, target_annotation_id,
                      name, description, is_validated, validated_by, validated_at,
                      created_by, created_at
               FROM relationships WHERE relationship_id = ?1",
              rusqlite::params![id_str],
              relationship_from_row,
            )
            .optional()?,
        )
      })
      .await?;
    Ok(raw)
  }
}

// ─── Row mappers ─────────────────────────────────────────────────────────────

fn document_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawDocument> {
  Ok(RawDocument {
    document_id: row.get(0)?,
    title:       row.get(1)?,
    created_at:  row.get(2)?,
  })
}

fn annotation_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawAnnotation> {
  Ok(RawAnnotation {
    annotation_id: row.get(0)?,
    document_id:   row.get(1)?,
    page:          row.get(2)?,
    entity_type:   row.get(3)?,
    text:          row.get(4)?,
    created_at:    row.get(5)?,
  })
}

fn relationship_from_row(
  row: &rusqlite::Row<'_>,
) -> rusqlite::Result<RawRelationship> {
  Ok(RawRelationship {
    relationship_id:      row.get(0)?,
    source_annotation_id: row.get(1)?,
    target_annotation_id: row.get(2)?,
    name:                 row.get(3)?,
    description:          row.get(4)?,
    is_validated:         row.get(5)?,
    validated_by:         row.get(6)?,
    validated_at:         row.get(7)?,
    created_by:           row.get(8)?,
    created_at:           row.get(9)?,
  })
}

fn qa_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawValidatedQa> {
  Ok(RawValidatedQa {
    qa_id:               row.get(0)?,
    document_id:         row.get(1)?,
    question:            row.get(2)?,
    question_normalized: row.get(3)?,
    answer:              row.get(4)?,
    source_type:         row.get(5)?,
    json_path:           row.get(6)?,
    confidence:          row.get(7)?,
    usage_count:         row.get(8)?,
    correction_count:    row.get(9)?,
    previous_answers:    row.get(10)?,
    validated_by:        row.get(11)?,
    validated_at:        row.get(12)?,
    tags:                row.get(13)?,
    is_active:           row.get(14)?,
    is_global:           row.get(15)?,
  })
}

const QA_COLUMNS: &str = "qa_id, document_id, question, question_normalized,
   answer, source_type, json_path, confidence, usage_count, correction_count,
   previous_answers, validated_by, validated_at, tags, is_active, is_global";

// ─── DocumentStore impl ──────────────────────────────────────────────────────

impl DocumentStore for SqliteStore {
  type Error = Error;

  // ── Documents & annotations ───────────────────────────────────────────────

  async fn add_document(&self, title: &str) -> Result<Document> {
    let document = Document {
      document_id: Uuid::new_v4(),
      title:       title.to_owned(),
      created_at:  Utc::now(),
    };

    let id_str    = encode_uuid(document.document_id);
    let at_str    = encode_dt(document.created_at);
    let title_str = document.title.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO documents (document_id, title, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, title_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(document)
  }

  async fn get_document(&self, id: Uuid) -> Result<Option<Document>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawDocument> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT document_id, title, created_at FROM documents WHERE document_id = ?1",
              rusqlite::params![id_str],
              document_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDocument::into_document).transpose()
  }

  async fn add_annotation(&self, input: NewAnnotation) -> Result<Annotation> {
    if self.get_document(input.document_id).await?.is_none() {
      return Err(Error::DocumentNotFound(input.document_id));
    }

    let annotation = Annotation {
      annotation_id: Uuid::new_v4(),
      document_id:   input.document_id,
      page:          input.page,
      entity_type:   input.entity_type,
      text:          input.text,
      created_at:    Utc::now(),
    };

    let id_str   = encode_uuid(annotation.annotation_id);
    let doc_str  = encode_uuid(annotation.document_id);
    let page     = annotation.page as i64;
    let ety      = annotation.entity_type.clone();
    let text     = annotation.text.clone();
    let at_str   = encode_dt(annotation.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO annotations (annotation_id, document_id, page, entity_type, text, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, doc_str, page, ety, text, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(annotation)
  }

  async fn get_annotation(&self, id: Uuid) -> Result<Option<Annotation>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawAnnotation> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT annotation_id, document_id, page, entity_type, text, created_at
               FROM annotations WHERE annotation_id = ?1",
              rusqlite::params![id_str],
              annotation_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAnnotation::into_annotation).transpose()
  }

  async fn list_annotations(&self, document_id: Uuid) -> Result<Vec<Annotation>> {
    let doc_str = encode_uuid(document_id);

    let raws: Vec<RawAnnotation> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT annotation_id, document_id, page, entity_type, text, created_at
           FROM annotations WHERE document_id = ?1 ORDER BY page, rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![doc_str], annotation_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAnnotation::into_annotation).collect()
  }

  // ── Relationships ─────────────────────────────────────────────────────────

  async fn create_relationship(&self, input: NewRelationship) -> Result<RelationCreation> {
    for id in [input.source_annotation_id, input.target_annotation_id] {
      if self.get_annotation(id).await?.is_none() {
        return Err(Error::AnnotationNotFound(id));
      }
    }

    // Exact duplicates are not created; the pre-existing id is returned
    // so the caller can redirect instead of retrying.
    let src_str  = encode_uuid(input.source_annotation_id);
    let tgt_str  = encode_uuid(input.target_annotation_id);
    let name_str = input.name.clone();

    let existing: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT relationship_id FROM relationships
               WHERE source_annotation_id = ?1 AND target_annotation_id = ?2 AND name = ?3",
              rusqlite::params![src_str, tgt_str, name_str],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    if let Some(existing) = existing {
      return Ok(RelationCreation::Duplicate {
        existing: Uuid::parse_str(&existing)?,
      });
    }

    let relationship = Relationship {
      relationship_id:      Uuid::new_v4(),
      source_annotation_id: input.source_annotation_id,
      target_annotation_id: input.target_annotation_id,
      name:                 input.name,
      description:          input.description,
      is_validated:         false,
      validated_by:         None,
      validated_at:         None,
      created_by:           input.created_by,
      created_at:           Utc::now(),
    };

    let id_str   = encode_uuid(relationship.relationship_id);
    let src_str  = encode_uuid(relationship.source_annotation_id);
    let tgt_str  = encode_uuid(relationship.target_annotation_id);
    let name_str = relationship.name.clone();
    let desc     = relationship.description.clone();
    let by       = relationship.created_by.clone();
    let at_str   = encode_dt(relationship.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO relationships (
             relationship_id, source_annotation_id, target_annotation_id,
             name, description, is_validated, validated_by, validated_at,
             created_by, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, 0, NULL, NULL, ?6, ?7)",
          rusqlite::params![id_str, src_str, tgt_str, name_str, desc, by, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(RelationCreation::Created(relationship))
  }

  async fn get_relationship(&self, id: Uuid) -> Result<Option<Relationship>> {
    self
      .raw_relationship(id)
      .await?
      .map(RawRelationship::into_relationship)
      .transpose()
  }

  async fn update_relationship(
    &self,
    id: Uuid,
    name: Option<String>,
    description: Option<String>,
  ) -> Result<Relationship> {
    let mut relationship = self
      .get_relationship(id)
      .await?
      .ok_or(Error::RelationshipNotFound(id))?;

    if let Some(name) = name {
      relationship.name = name;
    }
    if let Some(description) = description {
      relationship.description = Some(description);
    }

    let id_str   = encode_uuid(id);
    let name_str = relationship.name.clone();
    let desc     = relationship.description.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE relationships SET name = ?2, description = ?3 WHERE relationship_id = ?1",
          rusqlite::params![id_str, name_str, desc],
        )?;
        Ok(())
      })
      .await?;

    Ok(relationship)
  }

  async fn validate_relationship(
    &self,
    id: Uuid,
    validated_by: &str,
  ) -> Result<Relationship> {
    let mut relationship = self
      .get_relationship(id)
      .await?
      .ok_or(Error::RelationshipNotFound(id))?;

    // Validation is one-shot metadata; a second call is a no-op.
    if relationship.is_validated {
      return Ok(relationship);
    }

    relationship.is_validated = true;
    relationship.validated_by = Some(validated_by.to_owned());
    relationship.validated_at = Some(Utc::now());

    let id_str = encode_uuid(id);
    let by     = validated_by.to_owned();
    let at_str = relationship.validated_at.map(encode_dt);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE relationships SET is_validated = 1, validated_by = ?2, validated_at = ?3
           WHERE relationship_id = ?1",
          rusqlite::params![id_str, by, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(relationship)
  }

  async fn delete_relationship(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);

    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM relationships WHERE relationship_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    if affected == 0 {
      return Err(Error::RelationshipNotFound(id));
    }
    Ok(())
  }

  async fn list_relationships(&self, document_id: Uuid) -> Result<Vec<Relationship>> {
    let doc_str = encode_uuid(document_id);

    let raws: Vec<RawRelationship> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT r.relationship_id, r.source_annotation_id, r.target_annotation_id,
                  r.name, r.description, r.is_validated, r.validated_by, r.validated_at,
                  r.created_by, r.created_at
           FROM relationships r
           JOIN annotations sa ON sa.annotation_id = r.source_annotation_id
           JOIN annotations ta ON ta.annotation_id = r.target_annotation_id
           WHERE sa.document_id = ?1 OR ta.document_id = ?1
           ORDER BY r.rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![doc_str], relationship_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawRelationship::into_relationship)
      .collect()
  }

  async fn relationships_between(&self, a: Uuid, b: Uuid) -> Result<Vec<Relationship>> {
    let a_str = encode_uuid(a);
    let b_str = encode_uuid(b);

    let raws: Vec<RawRelationship> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT relationship_id, source_annotation_id, target_annotation_id,
                  name, description, is_validated, validated_by, validated_at,
                  created_by, created_at
           FROM relationships
           WHERE (source_annotation_id = ?1 AND target_annotation_id = ?2)
              OR (source_annotation_id = ?2 AND target_annotation_id = ?1)
           ORDER BY rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![a_str, b_str], relationship_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawRelationship::into_relationship)
      .collect()
  }

  async fn count_validated_relationships(&self, document_id: Uuid) -> Result<usize> {
    let doc_str = encode_uuid(document_id);

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*)
           FROM relationships r
           JOIN annotations sa ON sa.annotation_id = r.source_annotation_id
           JOIN annotations ta ON ta.annotation_id = r.target_annotation_id
           WHERE r.is_validated = 1 AND (sa.document_id = ?1 OR ta.document_id = ?1)",
          rusqlite::params![doc_str],
          |r| r.get(0),
        )?)
      })
      .await?;

    Ok(count as usize)
  }

  // ── Validated Q&A ─────────────────────────────────────────────────────────

  async fn insert_qa(&self, input: NewValidatedQa) -> Result<ValidatedQa> {
    let qa = ValidatedQa {
      qa_id:               Uuid::new_v4(),
      document_id:         input.document_id,
      question:            input.question,
      question_normalized: input.question_normalized,
      answer:              input.answer,
      source:              input.source,
      json_path:           input.json_path,
      confidence:          input.confidence,
      usage_count:         0,
      correction_count:    0,
      previous_answers:    Vec::new(),
      validated_by:        input.validated_by,
      validated_at:        Utc::now(),
      tags:                input.tags,
      is_active:           true,
      is_global:           input.is_global,
    };

    let id_str   = encode_uuid(qa.qa_id);
    let doc_str  = qa.document_id.map(encode_uuid);
    let question = qa.question.clone();
    let norm     = qa.question_normalized.clone();
    let answer   = qa.answer.clone();
    let source   = qa.source.discriminant().to_owned();
    let path     = qa.json_path.clone();
    let conf     = qa.confidence;
    let prev     = encode_string_list(&qa.previous_answers)?;
    let by       = qa.validated_by.clone();
    let at_str   = encode_dt(qa.validated_at);
    let tags     = encode_string_list(&qa.tags)?;
    let global   = qa.is_global;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO validated_qa (
             qa_id, document_id, question, question_normalized, answer,
             source_type, json_path, confidence, usage_count, correction_count,
             previous_answers, validated_by, validated_at, tags, is_active, is_global
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, 0, ?9, ?10, ?11, ?12, 1, ?13)",
          rusqlite::params![
            id_str, doc_str, question, norm, answer, source, path, conf, prev,
            by, at_str, tags, global,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(qa)
  }

  async fn update_qa(&self, qa: &ValidatedQa) -> Result<()> {
    let id_str   = encode_uuid(qa.qa_id);
    let answer   = qa.answer.clone();
    let source   = qa.source.discriminant().to_owned();
    let path     = qa.json_path.clone();
    let conf     = qa.confidence;
    let usage    = qa.usage_count as i64;
    let corr     = qa.correction_count as i64;
    let prev     = encode_string_list(&qa.previous_answers)?;
    let by       = qa.validated_by.clone();
    let at_str   = encode_dt(qa.validated_at);
    let tags     = encode_string_list(&qa.tags)?;
    let active   = qa.is_active;

    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE validated_qa SET
             answer = ?2, source_type = ?3, json_path = ?4, confidence = ?5,
             usage_count = ?6, correction_count = ?7, previous_answers = ?8,
             validated_by = ?9, validated_at = ?10, tags = ?11, is_active = ?12
           WHERE qa_id = ?1",
          rusqlite::params![
            id_str, answer, source, path, conf, usage, corr, prev, by, at_str,
            tags, active,
          ],
        )?)
      })
      .await?;

    if affected == 0 {
      return Err(Error::QaNotFound(qa.qa_id));
    }
    Ok(())
  }

  async fn get_qa(&self, id: Uuid) -> Result<Option<ValidatedQa>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawValidatedQa> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {QA_COLUMNS} FROM validated_qa WHERE qa_id = ?1"),
              rusqlite::params![id_str],
              qa_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawValidatedQa::into_qa).transpose()
  }

  async fn find_qa_exact(
    &self,
    document_id: Option<Uuid>,
    normalized: &str,
  ) -> Result<Option<ValidatedQa>> {
    let doc_str = document_id.map(encode_uuid);
    let norm    = normalized.to_owned();

    // Document-scoped records shadow globals on an exact match.
    let raw: Option<RawValidatedQa> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {QA_COLUMNS} FROM validated_qa
                 WHERE is_active = 1 AND question_normalized = ?1
                   AND (document_id = ?2 OR is_global = 1)
                 ORDER BY is_global ASC, rowid ASC
                 LIMIT 1"
              ),
              rusqlite::params![norm, doc_str],
              qa_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawValidatedQa::into_qa).transpose()
  }

  async fn list_qa(&self, document_id: Uuid) -> Result<Vec<ValidatedQa>> {
    let doc_str = encode_uuid(document_id);

    let raws: Vec<RawValidatedQa> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {QA_COLUMNS} FROM validated_qa
           WHERE is_active = 1 AND (document_id = ?1 OR is_global = 1)
           ORDER BY rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![doc_str], qa_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawValidatedQa::into_qa).collect()
  }

  async fn soft_delete_qa(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);

    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE validated_qa SET is_active = 0 WHERE qa_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    if affected == 0 {
      return Err(Error::QaNotFound(id));
    }
    Ok(())
  }

  // ── Snapshot ──────────────────────────────────────────────────────────────

  async fn load_snapshot(&self, document_id: Uuid) -> Result<Option<Snapshot>> {
    let doc_str = encode_uuid(document_id);

    let content: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT content FROM snapshots WHERE document_id = ?1",
              rusqlite::params![doc_str],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    let Some(content) = content else {
      return Ok(None);
    };

    // Malformed stored content is treated as absent, not fatal: the QA
    // engine must keep serving even over a damaged snapshot.
    match serde_json::from_str(&content) {
      Ok(snapshot) => Ok(Some(snapshot)),
      Err(e) => {
        tracing::warn!(document = %document_id, error = %e, "discarding malformed snapshot");
        Ok(None)
      }
    }
  }

  async fn save_snapshot(&self, document_id: Uuid, snapshot: &Snapshot) -> Result<()> {
    let doc_str = encode_uuid(document_id);
    let content = serde_json::to_string(snapshot)?;
    let at_str  = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO snapshots (document_id, content, updated_at)
           VALUES (?1, ?2, ?3)
           ON CONFLICT (document_id) DO UPDATE SET content = ?2, updated_at = ?3",
          rusqlite::params![doc_str, content, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
