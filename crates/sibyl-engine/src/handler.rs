//! Relation-intent handling.
//!
//! Resolves the entity-text references extracted by
//! [`crate::relation_intent`] to concrete annotations and produces
//! either a direct answer (query/list) or a structured pending action
//! (create/modify/delete) for the caller to confirm and execute.
//!
//! This module is read-only with respect to the store: every mutating
//! intent ends in a `confirm_*` action, pushing the actual write — and
//! the authorization decision — to the external caller. At worst, a
//! misclassified intent shows a human a wrong suggestion.

use serde::Serialize;
use sibyl_core::{
  document::Annotation,
  relation::Relationship,
  store::DocumentStore,
};
use uuid::Uuid;

use crate::{
  error::{Error, Result},
  relation_intent::RelationIntent,
  text::{normalize, text_matches},
};

/// How many relations a list answer shows before truncating.
pub const LIST_DISPLAY_LIMIT: usize = 10;

/// Default suggested relationship name when no typing rule applies.
pub const DEFAULT_RELATION_NAME: &str = "related_to";

/// Suggested relationship names keyed by substrings of the normalized
/// (source, target) entity types. First matching rule wins.
const NAME_SUGGESTIONS: &[(&str, &str, &str)] = &[
  ("product", "dosage", "has_dosage"),
  ("product", "substance", "contains"),
  ("substance", "dosage", "has_dosage"),
  ("product", "indication", "treats"),
  ("product", "effect", "has_side_effect"),
  ("produit", "dosage", "has_dosage"),
  ("produit", "substance", "contains"),
];

// ─── Action payloads ─────────────────────────────────────────────────────────

/// A lightweight annotation reference shown in disambiguation lists.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotationRef {
  pub annotation_id: Uuid,
  pub text:          String,
  pub entity_type:   String,
  pub page:          u32,
}

impl AnnotationRef {
  fn from_annotation(a: &Annotation) -> Self {
    Self {
      annotation_id: a.annotation_id,
      text:          a.text.clone(),
      entity_type:   a.entity_type.clone(),
      page:          a.page,
    }
  }
}

/// A relationship summarised for display, with resolved endpoint texts.
#[derive(Debug, Clone, Serialize)]
pub struct RelationSummary {
  pub relationship_id: Uuid,
  pub name:            String,
  pub description:     Option<String>,
  pub source_text:     String,
  pub target_text:     String,
  pub is_validated:    bool,
}

/// The outcome of handling a relation intent. Mutating intents yield
/// `confirm_*` payloads; nothing here has touched the store.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RelationAction {
  /// An entity reference resolved to no annotation.
  NotFound { searched: String, suggestion: String },
  /// An entity reference resolved to several annotations; the caller
  /// must pick before anything else can happen.
  SelectAnnotations {
    searched:   String,
    candidates: Vec<AnnotationRef>,
  },
  /// Pending creation; `suggested_name` comes from the typing rules and
  /// final naming is the caller's decision.
  ConfirmCreateRelation {
    source:         AnnotationRef,
    target:         AnnotationRef,
    suggested_name: String,
  },
  /// Query/modify found no existing relation between the pair.
  SuggestCreate {
    source: AnnotationRef,
    target: AnnotationRef,
  },
  /// Existing relations between the queried pair.
  RelationsFound { relations: Vec<RelationSummary> },
  /// Several relations exist where modify expected one.
  SelectRelation { candidates: Vec<RelationSummary> },
  /// Pending modification, carrying the current state.
  ConfirmModifyRelation { relation: RelationSummary },
  /// Pending deletion of every listed relation.
  ConfirmDeleteRelation { relations: Vec<RelationSummary> },
  /// Listing; `total` counts all matches, `relations` is capped at
  /// [`LIST_DISPLAY_LIMIT`] with `truncated` telling how many were cut.
  RelationList {
    relations: Vec<RelationSummary>,
    total:     usize,
    truncated: usize,
  },
  /// The document has no relations (matching the filter).
  EmptyList { filter: Option<String> },
}

// ─── Handler ─────────────────────────────────────────────────────────────────

/// Handle a classified relation intent against one document.
pub async fn handle<S>(
  store: &S,
  document_id: Uuid,
  intent: &RelationIntent,
) -> Result<RelationAction>
where
  S: DocumentStore,
{
  match intent {
    RelationIntent::Create { source, target } => {
      with_resolved_pair(store, document_id, source, target, |src, tgt| {
        RelationAction::ConfirmCreateRelation {
          suggested_name: suggest_name(&src.entity_type, &tgt.entity_type),
          source:         AnnotationRef::from_annotation(&src),
          target:         AnnotationRef::from_annotation(&tgt),
        }
      })
      .await
    }
    RelationIntent::Query { source, target } => {
      query_pair(store, document_id, source, target).await
    }
    RelationIntent::Modify { source, target } => {
      modify_pair(store, document_id, source, target).await
    }
    RelationIntent::Delete { source, target } => {
      delete_pair(store, document_id, source, target).await
    }
    RelationIntent::List { filter } => {
      list_relations(store, document_id, filter.as_deref()).await
    }
  }
}

/// Every annotation in the document whose normalized text
/// bidirectionally substring-matches the normalized query text. May be
/// zero, one, or many.
pub async fn find_annotations_by_text<S>(
  store: &S,
  document_id: Uuid,
  text: &str,
) -> Result<Vec<Annotation>>
where
  S: DocumentStore,
{
  let needle = normalize(text);
  let annotations = store
    .list_annotations(document_id)
    .await
    .map_err(Error::store)?;

  Ok(
    annotations
      .into_iter()
      .filter(|a| text_matches(&normalize(&a.text), &needle))
      .collect(),
  )
}

/// Resolve both sides to exactly one annotation each, or return the
/// zero/many action. The handler never fabricates an annotation and
/// never guesses among candidates.
async fn resolve_one<S>(
  store: &S,
  document_id: Uuid,
  text: &str,
) -> Result<std::result::Result<Annotation, RelationAction>>
where
  S: DocumentStore,
{
  let mut candidates = find_annotations_by_text(store, document_id, text).await?;
  Ok(match candidates.len() {
    0 => Err(RelationAction::NotFound {
      searched:   text.to_owned(),
      suggestion: format!(
        "No annotation matches {text:?}; annotate it in the document first."
      ),
    }),
    1 => Ok(candidates.remove(0)),
    _ => Err(RelationAction::SelectAnnotations {
      searched:   text.to_owned(),
      candidates: candidates.iter().map(AnnotationRef::from_annotation).collect(),
    }),
  })
}

async fn resolve_pair<S>(
  store: &S,
  document_id: Uuid,
  source_text: &str,
  target_text: &str,
) -> Result<std::result::Result<(Annotation, Annotation), RelationAction>>
where
  S: DocumentStore,
{
  let source = match resolve_one(store, document_id, source_text).await? {
    Ok(a) => a,
    Err(action) => return Ok(Err(action)),
  };
  let target = match resolve_one(store, document_id, target_text).await? {
    Ok(a) => a,
    Err(action) => return Ok(Err(action)),
  };
  Ok(Ok((source, target)))
}

async fn with_resolved_pair<S, F>(
  store: &S,
  document_id: Uuid,
  source_text: &str,
  target_text: &str,
  build: F,
) -> Result<RelationAction>
where
  S: DocumentStore,
  F: FnOnce(Annotation, Annotation) -> RelationAction,
{
  match resolve_pair(store, document_id, source_text, target_text).await? {
    Ok((source, target)) => Ok(build(source, target)),
    Err(action) => Ok(action),
  }
}

fn summarize(rel: &Relationship, source: &Annotation, target: &Annotation) -> RelationSummary {
  // relationships_between returns edges in either orientation; align
  // the endpoint texts with the stored direction.
  let (source_text, target_text) = if rel.source_annotation_id == source.annotation_id {
    (source.text.clone(), target.text.clone())
  } else {
    (target.text.clone(), source.text.clone())
  };
  RelationSummary {
    relationship_id: rel.relationship_id,
    name:            rel.name.clone(),
    description:     rel.description.clone(),
    source_text,
    target_text,
    is_validated:    rel.is_validated,
  }
}

async fn query_pair<S>(
  store: &S,
  document_id: Uuid,
  source_text: &str,
  target_text: &str,
) -> Result<RelationAction>
where
  S: DocumentStore,
{
  let (source, target) =
    match resolve_pair(store, document_id, source_text, target_text).await? {
      Ok(pair) => pair,
      Err(action) => return Ok(action),
    };

  let relations = store
    .relationships_between(source.annotation_id, target.annotation_id)
    .await
    .map_err(Error::store)?;

  if relations.is_empty() {
    return Ok(RelationAction::SuggestCreate {
      source: AnnotationRef::from_annotation(&source),
      target: AnnotationRef::from_annotation(&target),
    });
  }

  Ok(RelationAction::RelationsFound {
    relations: relations
      .iter()
      .map(|r| summarize(r, &source, &target))
      .collect(),
  })
}

async fn modify_pair<S>(
  store: &S,
  document_id: Uuid,
  source_text: &str,
  target_text: &str,
) -> Result<RelationAction>
where
  S: DocumentStore,
{
  let (source, target) =
    match resolve_pair(store, document_id, source_text, target_text).await? {
      Ok(pair) => pair,
      Err(action) => return Ok(action),
    };

  let relations = store
    .relationships_between(source.annotation_id, target.annotation_id)
    .await
    .map_err(Error::store)?;

  match relations.as_slice() {
    [] => Ok(RelationAction::SuggestCreate {
      source: AnnotationRef::from_annotation(&source),
      target: AnnotationRef::from_annotation(&target),
    }),
    [rel] => Ok(RelationAction::ConfirmModifyRelation {
      relation: summarize(rel, &source, &target),
    }),
    many => Ok(RelationAction::SelectRelation {
      candidates: many.iter().map(|r| summarize(r, &source, &target)).collect(),
    }),
  }
}

async fn delete_pair<S>(
  store: &S,
  document_id: Uuid,
  source_text: &str,
  target_text: &str,
) -> Result<RelationAction>
where
  S: DocumentStore,
{
  let (source, target) =
    match resolve_pair(store, document_id, source_text, target_text).await? {
      Ok(pair) => pair,
      Err(action) => return Ok(action),
    };

  let relations = store
    .relationships_between(source.annotation_id, target.annotation_id)
    .await
    .map_err(Error::store)?;

  if relations.is_empty() {
    return Ok(RelationAction::NotFound {
      searched:   format!("{source_text} / {target_text}"),
      suggestion: "No relation exists between these annotations.".to_owned(),
    });
  }

  Ok(RelationAction::ConfirmDeleteRelation {
    relations: relations
      .iter()
      .map(|r| summarize(r, &source, &target))
      .collect(),
  })
}

async fn list_relations<S>(
  store: &S,
  document_id: Uuid,
  filter: Option<&str>,
) -> Result<RelationAction>
where
  S: DocumentStore,
{
  let relationships = store
    .list_relationships(document_id)
    .await
    .map_err(Error::store)?;
  let annotations = store
    .list_annotations(document_id)
    .await
    .map_err(Error::store)?;

  let text_of = |id: Uuid| -> String {
    annotations
      .iter()
      .find(|a| a.annotation_id == id)
      .map(|a| a.text.clone())
      .unwrap_or_default()
  };

  let filter_norm = filter.map(normalize);

  let mut summaries: Vec<RelationSummary> = Vec::new();
  for rel in &relationships {
    let source_text = text_of(rel.source_annotation_id);
    let target_text = text_of(rel.target_annotation_id);

    if let Some(needle) = &filter_norm {
      let hit = text_matches(&normalize(&source_text), needle)
        || text_matches(&normalize(&target_text), needle);
      if !hit {
        continue;
      }
    }

    summaries.push(RelationSummary {
      relationship_id: rel.relationship_id,
      name:            rel.name.clone(),
      description:     rel.description.clone(),
      source_text,
      target_text,
      is_validated:    rel.is_validated,
    });
  }

  if summaries.is_empty() {
    return Ok(RelationAction::EmptyList {
      filter: filter.map(str::to_owned),
    });
  }

  let total = summaries.len();
  summaries.truncate(LIST_DISPLAY_LIMIT);
  Ok(RelationAction::RelationList {
    truncated: total - summaries.len(),
    relations: summaries,
    total,
  })
}

/// Suggest a relationship name from the endpoint entity types. The
/// rules match on substrings of the normalized types; `related_to` is
/// the fallback, leaving final naming to the expert.
pub fn suggest_name(source_type: &str, target_type: &str) -> String {
  let src = normalize(source_type);
  let tgt = normalize(target_type);

  for (src_sub, tgt_sub, name) in NAME_SUGGESTIONS {
    if src.contains(src_sub) && tgt.contains(tgt_sub) {
      return (*name).to_owned();
    }
  }
  DEFAULT_RELATION_NAME.to_owned()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn suggestion_rules_match_on_type_substrings() {
    assert_eq!(suggest_name("Product", "Dosage"), "has_dosage");
    assert_eq!(suggest_name("produit pharmaceutique", "Substance active"), "contains");
    assert_eq!(suggest_name("Person", "Place"), DEFAULT_RELATION_NAME);
  }
}
