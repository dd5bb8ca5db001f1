//! SQL schema for the Sibyl SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS documents (
    document_id TEXT PRIMARY KEY,
    title       TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS annotations (
    annotation_id TEXT PRIMARY KEY,
    document_id   TEXT NOT NULL REFERENCES documents(document_id),
    page          INTEGER NOT NULL,
    entity_type   TEXT NOT NULL,
    text          TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

-- A directed, typed edge between two annotations.
-- The UNIQUE constraint backs the duplicate-tuple rejection; the store
-- still pre-checks so it can return the existing id.
CREATE TABLE IF NOT EXISTS relationships (
    relationship_id      TEXT PRIMARY KEY,
    source_annotation_id TEXT NOT NULL REFERENCES annotations(annotation_id),
    target_annotation_id TEXT NOT NULL REFERENCES annotations(annotation_id),
    name                 TEXT NOT NULL,
    description          TEXT,
    is_validated         INTEGER NOT NULL DEFAULT 0,
    validated_by         TEXT,
    validated_at         TEXT,
    created_by           TEXT NOT NULL,
    created_at           TEXT NOT NULL,
    UNIQUE (source_annotation_id, target_annotation_id, name)
);

-- Soft-deleted rows keep their data; is_active = 0 hides them.
CREATE TABLE IF NOT EXISTS validated_qa (
    qa_id               TEXT PRIMARY KEY,
    document_id         TEXT REFERENCES documents(document_id),  -- NULL = global
    question            TEXT NOT NULL,
    question_normalized TEXT NOT NULL,
    answer              TEXT NOT NULL,
    source_type         TEXT NOT NULL,
    json_path           TEXT,
    confidence          REAL NOT NULL,
    usage_count         INTEGER NOT NULL DEFAULT 0,
    correction_count    INTEGER NOT NULL DEFAULT 0,
    previous_answers    TEXT NOT NULL DEFAULT '[]',
    validated_by        TEXT NOT NULL,
    validated_at        TEXT NOT NULL,
    tags                TEXT NOT NULL DEFAULT '[]',
    is_active           INTEGER NOT NULL DEFAULT 1,
    is_global           INTEGER NOT NULL DEFAULT 0
);

-- One snapshot per document, stored as a JSON blob.
CREATE TABLE IF NOT EXISTS snapshots (
    document_id TEXT PRIMARY KEY REFERENCES documents(document_id),
    content     TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS annotations_document_idx ON annotations(document_id);
CREATE INDEX IF NOT EXISTS relationships_source_idx ON relationships(source_annotation_id);
CREATE INDEX IF NOT EXISTS relationships_target_idx ON relationships(target_annotation_id);
CREATE INDEX IF NOT EXISTS qa_document_idx          ON validated_qa(document_id);
CREATE INDEX IF NOT EXISTS qa_normalized_idx        ON validated_qa(question_normalized);

PRAGMA user_version = 1;
";
