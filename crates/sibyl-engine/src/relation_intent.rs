//! Relation-management intent classification.
//!
//! A second pattern bank over the same normalized text, for questions
//! that manage relations rather than ask about document content. A
//! lightweight keyword trigger decides whether a question is routed
//! here at all; inside, patterns are tried in priority order —
//! create/modify/delete before the more general query pattern, whose
//! phrasing their verb forms strictly extend. A triggered question
//! that matches no pattern falls back to the answer resolver; it is
//! never dropped.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;

/// Keywords that route a normalized question to this classifier.
const TRIGGER_KEYWORDS: &[&str] = &[
  "relation", "relationship", "link", "between", "create", "modify",
  "delete", "lien", "entre", "creer", "modifier", "supprimer",
];

/// The recognized relation-management intents.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum RelationIntent {
  Create { source: String, target: String },
  Modify { source: String, target: String },
  Delete { source: String, target: String },
  List { filter: Option<String> },
  Query { source: String, target: String },
}

/// `true` when any word of the normalized question starts with a
/// trigger keyword — prefix matching covers inflections ("relations",
/// "relationships", "linked") without a stemmer. Over-triggering is
/// harmless: an unmatched question falls back to the resolver.
pub fn is_relation_question(normalized: &str) -> bool {
  normalized
    .split_whitespace()
    .any(|word| TRIGGER_KEYWORDS.iter().any(|k| word.starts_with(k)))
}

type Extractor = fn(&Captures<'_>) -> RelationIntent;

fn pair(caps: &Captures<'_>) -> (String, String) {
  let get = |name: &str| {
    caps
      .name(name)
      .map(|m| m.as_str().trim().to_owned())
      .unwrap_or_default()
  };
  (get("source"), get("target"))
}

fn create(caps: &Captures<'_>) -> RelationIntent {
  let (source, target) = pair(caps);
  RelationIntent::Create { source, target }
}

fn modify(caps: &Captures<'_>) -> RelationIntent {
  let (source, target) = pair(caps);
  RelationIntent::Modify { source, target }
}

fn delete(caps: &Captures<'_>) -> RelationIntent {
  let (source, target) = pair(caps);
  RelationIntent::Delete { source, target }
}

fn list(caps: &Captures<'_>) -> RelationIntent {
  RelationIntent::List {
    filter: caps.name("filter").map(|m| m.as_str().trim().to_owned()),
  }
}

fn query(caps: &Captures<'_>) -> RelationIntent {
  let (source, target) = pair(caps);
  RelationIntent::Query { source, target }
}

/// The ordered pattern bank, English and French. Mutating verbs come
/// first; the unanchored query pattern is the catch-all.
static PATTERNS: LazyLock<Vec<(Regex, Extractor)>> = LazyLock::new(|| {
  let entries: Vec<(&str, Extractor)> = vec![
    // create
    (
      r"^(?:create|add|make)(?: a| an)?(?: new)?(?: relation(?:ship)?| link)?(?: between)? (?P<source>.+?) (?:and|to|avec) (?P<target>.+)$",
      create,
    ),
    (
      r"^(?:creer?|cree|ajouter?|ajoute)(?: une?)?(?: nouvelle?)?(?: relation| lien)?(?: entre)? (?P<source>.+?) et (?P<target>.+)$",
      create,
    ),
    // modify
    (
      r"^(?:modify|change|update|rename)(?: the)?(?: relation(?:ship)?| link)?(?: between)? (?P<source>.+?) (?:and|et) (?P<target>.+)$",
      modify,
    ),
    (
      r"^(?:modifier?|modifie|changer?|change|renommer?)(?: la)?(?: relation| lien)?(?: entre)? (?P<source>.+?) et (?P<target>.+)$",
      modify,
    ),
    // delete
    (
      r"^(?:delete|remove)(?: the)?(?: relation(?:ship)?| link)?(?: between)? (?P<source>.+?) (?:and|et) (?P<target>.+)$",
      delete,
    ),
    (
      r"^(?:supprimer?|supprime|effacer?|efface|retirer?|retire)(?: la)?(?: relation| lien)?(?: entre)? (?P<source>.+?) et (?P<target>.+)$",
      delete,
    ),
    // list
    (
      r"^(?:list|show)(?: me)?(?: all)?(?: the)? relation(?:s|ships)?(?: (?:for|of|with|on) (?P<filter>.+))?$",
      list,
    ),
    (
      r"^(?:liste[rz]?|liste|afficher?|affiche)(?: toutes)?(?: les)? relations(?: (?:de|du|pour|avec) (?P<filter>.+))?$",
      list,
    ),
    // query — catch-all for "… relation between X and Y"
    (
      r"relation(?:s|ship)?(?: existe[nt]*)? (?:between|entre) (?P<source>.+?) (?:and|et) (?P<target>.+)$",
      query,
    ),
  ];

  entries
    .into_iter()
    .map(|(pattern, extract)| {
      (Regex::new(pattern).expect("static relation pattern"), extract)
    })
    .collect()
});

/// Classify an already-normalized question. `None` means the caller
/// should fall back to the answer resolver.
pub fn classify_relation_intent(normalized: &str) -> Option<RelationIntent> {
  for (pattern, extract) in PATTERNS.iter() {
    if let Some(caps) = pattern.captures(normalized) {
      return Some(extract(&caps));
    }
  }
  None
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::text::normalize;

  fn classify(raw: &str) -> Option<RelationIntent> {
    classify_relation_intent(&normalize(raw))
  }

  #[test]
  fn trigger_requires_whole_words() {
    assert!(is_relation_question("create a relation between a and b"));
    assert!(is_relation_question("what is the relation between a and b"));
    assert!(!is_relation_question("what is the dosage of the product"));
    // "interrelationship" must not trigger via substring.
    assert!(!is_relation_question("explain the interrelationships here"));
  }

  #[test]
  fn create_is_tried_before_query() {
    assert_eq!(
      classify("Create a relation between Product A and Substance X"),
      Some(RelationIntent::Create {
        source: "product a".into(),
        target: "substance x".into(),
      })
    );
  }

  #[test]
  fn modify_and_delete_extract_pairs() {
    assert_eq!(
      classify("Modify the relation between S 6490 and perindopril"),
      Some(RelationIntent::Modify {
        source: "s 6490".into(),
        target: "perindopril".into(),
      })
    );
    assert_eq!(
      classify("Supprimer la relation entre S 6490 et perindopril"),
      Some(RelationIntent::Delete {
        source: "s 6490".into(),
        target: "perindopril".into(),
      })
    );
  }

  #[test]
  fn list_with_and_without_filter() {
    assert_eq!(classify("List all relations"), Some(RelationIntent::List { filter: None }));
    assert_eq!(
      classify("List relations for S 6490"),
      Some(RelationIntent::List { filter: Some("s 6490".into()) })
    );
  }

  #[test]
  fn question_phrasing_falls_to_query() {
    assert_eq!(
      classify("What is the relation between S 6490 and perindopril?"),
      Some(RelationIntent::Query {
        source: "s 6490".into(),
        target: "perindopril".into(),
      })
    );
  }

  #[test]
  fn unmatched_triggered_text_returns_none() {
    assert_eq!(classify("delete everything immediately"), None);
  }
}
