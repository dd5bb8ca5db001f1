//! Tiered answer resolution over a document snapshot.
//!
//! Tiers are attempted in a fixed order, first success wins:
//!
//! 1. exact validated-Q&A match (normalized question equality)
//! 2. fuzzy validated-Q&A match (keyword overlap ≥ threshold)
//! 3. structured field/entity search (depth-first, first hit wins)
//! 4. relation search
//! 5. attribute-via-relation search
//! 6. the explicit "needs expert" result
//!
//! Failing a tier is the normal fall-through signal, never an error.
//! Tiers 1–2 return expert-approved answers (`needs_validation =
//! false`); tiers 3–5 return structurally derived, unapproved answers
//! (`needs_validation = true`) that callers must not present as
//! authoritative without expert confirmation.

use serde::Serialize;
use serde_json::Value;
use sibyl_core::{
  qa::AnswerSource,
  snapshot::{QaView, Snapshot},
};
use uuid::Uuid;

use crate::{
  classify::QuestionIntent,
  text::{keywords, normalize, overlap_ratio, text_matches},
};

/// Minimum keyword overlap for a fuzzy Q&A match.
pub const FUZZY_MATCH_THRESHOLD: f64 = 0.7;
/// Confidence of structured field/entity hits — below the Q&A tiers,
/// since nothing validated them.
pub const STRUCTURED_CONFIDENCE: f64 = 0.8;
/// Confidence of relation-derived answers.
pub const RELATION_CONFIDENCE: f64 = 0.9;
/// How many list values to show before truncating.
pub const LIST_PREVIEW_LIMIT: usize = 5;
/// The fixed tier-6 message.
pub const NO_ANSWER_MESSAGE: &str =
  "No validated answer is available for this question; expert input is needed.";

/// A resolved answer with provenance.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
  pub answer:           String,
  pub source:           AnswerSource,
  pub confidence:       f64,
  pub json_path:        Option<String>,
  pub json_data:        Option<Value>,
  pub needs_validation: bool,
  pub qa_id:            Option<Uuid>,
}

/// Resolve `question` against `snapshot`. Never fails: tier 6 is the
/// terminal fallback.
pub fn resolve(question: &str, intent: &QuestionIntent, snapshot: &Snapshot) -> Answer {
  let normalized = normalize(question);

  if let Some(answer) = exact_qa_match(&normalized, snapshot) {
    return answer;
  }
  if let Some(answer) = fuzzy_qa_match(&normalized, snapshot) {
    return answer;
  }

  match intent {
    QuestionIntent::ValueOf { field } => {
      if let Some(answer) = structured_search(field, snapshot) {
        return answer;
      }
    }
    QuestionIntent::EntityValue { term } | QuestionIntent::List { term } => {
      if let Some(answer) = structured_search(term, snapshot) {
        return answer;
      }
    }
    QuestionIntent::Relation { first, second } => {
      if let Some(answer) = relation_search(first, second, snapshot) {
        return answer;
      }
    }
    QuestionIntent::AttributeOf { entity, attribute } => {
      if let Some(answer) = attribute_search(entity, attribute, snapshot) {
        return answer;
      }
    }
    QuestionIntent::Unknown => {}
  }

  not_found()
}

/// The explicit tier-6 result.
pub fn not_found() -> Answer {
  Answer {
    answer:           NO_ANSWER_MESSAGE.to_owned(),
    source:           AnswerSource::NotFound,
    confidence:       0.0,
    json_path:        None,
    json_data:        None,
    needs_validation: true,
    qa_id:            None,
  }
}

// ─── Tier 1: exact Q&A ───────────────────────────────────────────────────────

fn exact_qa_match(normalized: &str, snapshot: &Snapshot) -> Option<Answer> {
  let qa = snapshot
    .validated_qa
    .iter()
    .find(|qa| qa.question_normalized == normalized)?;
  Some(qa_answer(qa, AnswerSource::ExactQa, qa.confidence))
}

// ─── Tier 2: fuzzy Q&A ───────────────────────────────────────────────────────

fn fuzzy_qa_match(normalized: &str, snapshot: &Snapshot) -> Option<Answer> {
  let query_kw = keywords(normalized);
  if query_kw.is_empty() {
    return None;
  }

  // First match in stored order wins, not best-of: ties are broken by
  // encounter order.
  for qa in &snapshot.validated_qa {
    let candidate_kw = keywords(&qa.question_normalized);
    let ratio = overlap_ratio(&query_kw, &candidate_kw);
    if ratio >= FUZZY_MATCH_THRESHOLD {
      return Some(qa_answer(qa, AnswerSource::FuzzyQa, qa.confidence * ratio));
    }
  }
  None
}

fn qa_answer(qa: &QaView, source: AnswerSource, confidence: f64) -> Answer {
  Answer {
    answer: qa.answer.clone(),
    source,
    confidence,
    json_path: qa.json_path.clone(),
    json_data: None,
    needs_validation: false,
    qa_id: Some(qa.qa_id),
  }
}

// ─── Tier 3: structured field/entity search ──────────────────────────────────

fn structured_search(term: &str, snapshot: &Snapshot) -> Option<Answer> {
  let needle = normalize(term);
  if needle.is_empty() {
    return None;
  }

  if let Some((path, value)) = find_field(&snapshot.document, &needle, "document") {
    return Some(Answer {
      answer:           format_value(&value),
      source:           AnswerSource::StructuredField,
      confidence:       STRUCTURED_CONFIDENCE,
      json_path:        Some(path),
      json_data:        Some(value),
      needs_validation: true,
      qa_id:            None,
    });
  }

  for (entity_type, values) in &snapshot.entities {
    if text_matches(&normalize(entity_type), &needle) {
      return Some(Answer {
        answer:           format_list(values),
        source:           AnswerSource::StructuredEntity,
        confidence:       STRUCTURED_CONFIDENCE,
        json_path:        Some(format!("entities.{entity_type}")),
        json_data:        Some(Value::from(values.clone())),
        needs_validation: true,
        qa_id:            None,
      });
    }
  }

  None
}

/// Depth-first search of the snapshot's field tree. A key matches when
/// the normalized field name and the normalized key are substrings of
/// one another, in either direction. The first matching scalar or
/// scalar-list value wins — not globally optimal, but deterministic
/// given the fixed traversal order.
fn find_field(value: &Value, needle: &str, path: &str) -> Option<(String, Value)> {
  match value {
    Value::Object(map) => {
      for (key, child) in map {
        let child_path = format!("{path}.{key}");
        if text_matches(&normalize(key), needle) {
          match child {
            Value::Object(_) => {}
            Value::Array(items) if items.iter().any(Value::is_object) => {}
            other => return Some((child_path, other.clone())),
          }
        }
        if let Some(hit) = find_field(child, needle, &child_path) {
          return Some(hit);
        }
      }
      None
    }
    Value::Array(items) => {
      for (i, item) in items.iter().enumerate() {
        let child_path = format!("{path}[{i}]");
        if let Some(hit) = find_field(item, needle, &child_path) {
          return Some(hit);
        }
      }
      None
    }
    _ => None,
  }
}

fn format_value(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    Value::Array(items) => {
      let values: Vec<String> = items.iter().map(scalar_to_string).collect();
      format_list(&values)
    }
    other => scalar_to_string(other),
  }
}

fn scalar_to_string(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

/// Comma-separated preview capped at [`LIST_PREVIEW_LIMIT`], with an
/// "and N more" suffix when truncated.
fn format_list(values: &[String]) -> String {
  if values.len() <= LIST_PREVIEW_LIMIT {
    return values.join(", ");
  }
  let shown = values[..LIST_PREVIEW_LIMIT].join(", ");
  format!("{shown} and {} more", values.len() - LIST_PREVIEW_LIMIT)
}

// ─── Tier 4: relation search ─────────────────────────────────────────────────

fn relation_search(first: &str, second: &str, snapshot: &Snapshot) -> Option<Answer> {
  let a = normalize(first);
  let b = normalize(second);

  for (i, relation) in snapshot.relations.iter().enumerate() {
    let src = normalize(&relation.source.value);
    let tgt = normalize(&relation.target.value);

    let forward = text_matches(&src, &a) && text_matches(&tgt, &b);
    let reverse = text_matches(&src, &b) && text_matches(&tgt, &a);
    if forward || reverse {
      let answer = relation.description.clone().unwrap_or_else(|| {
        format!(
          "{} {} {}",
          relation.source.value, relation.name, relation.target.value
        )
      });
      return Some(Answer {
        answer,
        source: AnswerSource::RelationGraph,
        confidence: RELATION_CONFIDENCE,
        json_path: Some(format!("relations[{i}]")),
        json_data: serde_json::to_value(relation).ok(),
        needs_validation: true,
        qa_id: None,
      });
    }
  }
  None
}

// ─── Tier 5: attribute via relation ──────────────────────────────────────────

fn attribute_search(
  entity: &str,
  attribute: &str,
  snapshot: &Snapshot,
) -> Option<Answer> {
  let entity_norm = normalize(entity);
  let attr_norm   = normalize(attribute);

  let mut matches: Vec<&sibyl_core::snapshot::RelationView> = Vec::new();
  let mut first_index = None;

  for (i, relation) in snapshot.relations.iter().enumerate() {
    let source_hit = text_matches(&normalize(&relation.source.value), &entity_norm);
    let attr_hit = text_matches(&normalize(&relation.target.entity_type), &attr_norm)
      || text_matches(&normalize(&relation.name), &attr_norm);
    if source_hit && attr_hit {
      if matches.is_empty() {
        first_index = Some(i);
      }
      matches.push(relation);
    }
  }

  let first = matches.first()?;
  let mut answer = format!(
    "The {attribute} of {entity} is: {}",
    first.target.value
  );
  if matches.len() > 1 {
    let extra: Vec<&str> =
      matches[1..].iter().map(|r| r.target.value.as_str()).collect();
    answer.push_str(&format!(" (also: {})", extra.join(", ")));
  }

  Some(Answer {
    answer,
    source: AnswerSource::AttributeViaRelation,
    confidence: RELATION_CONFIDENCE,
    json_path: first_index.map(|i| format!("relations[{i}]")),
    json_data: serde_json::to_value(first).ok(),
    needs_validation: true,
    qa_id: None,
  })
}
