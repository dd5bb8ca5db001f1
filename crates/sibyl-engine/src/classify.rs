//! Question intent classification.
//!
//! An ordered bank of (pattern, extractor) pairs is evaluated strictly
//! in declaration order against the normalized question; the first
//! extractor to produce an intent wins. The ordering is load-bearing:
//! `attribute_of` phrasing ("what is the X of Y") would otherwise be
//! swallowed by the laxer `what is` pattern, so it is tried first. Do
//! not convert this to an unordered dispatch map.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;

/// The recognized question intents, with their extracted slots.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum QuestionIntent {
  /// "what is the ATTRIBUTE of ENTITY"
  AttributeOf { entity: String, attribute: String },
  /// "what is the value of FIELD"
  ValueOf { field: String },
  /// "what is TERM"
  EntityValue { term: String },
  /// "relation between FIRST and SECOND"
  Relation { first: String, second: String },
  /// "list TERM"
  List { term: String },
  Unknown,
}

type Extractor = fn(&Captures<'_>) -> Option<QuestionIntent>;

fn slot(caps: &Captures<'_>, name: &str) -> String {
  caps
    .name(name)
    .map(|m| m.as_str().trim().to_owned())
    .unwrap_or_default()
}

fn attribute_of(caps: &Captures<'_>) -> Option<QuestionIntent> {
  let attribute = slot(caps, "attribute");
  // "what is the value of X" belongs to the value_of pattern below; the
  // regex crate has no lookahead, so the exclusion lives here.
  if attribute == "value" || attribute == "valeur" {
    return None;
  }
  Some(QuestionIntent::AttributeOf { entity: slot(caps, "entity"), attribute })
}

fn value_of(caps: &Captures<'_>) -> Option<QuestionIntent> {
  Some(QuestionIntent::ValueOf { field: slot(caps, "field") })
}

fn entity_value(caps: &Captures<'_>) -> Option<QuestionIntent> {
  Some(QuestionIntent::EntityValue { term: slot(caps, "term") })
}

fn relation(caps: &Captures<'_>) -> Option<QuestionIntent> {
  Some(QuestionIntent::Relation {
    first:  slot(caps, "first"),
    second: slot(caps, "second"),
  })
}

fn list(caps: &Captures<'_>) -> Option<QuestionIntent> {
  Some(QuestionIntent::List { term: slot(caps, "term") })
}

/// The ordered pattern bank. Patterns match normalized text only
/// (lowercase, diacritics stripped, no punctuation), in English and
/// French.
static PATTERNS: LazyLock<Vec<(Regex, Extractor)>> = LazyLock::new(|| {
  let entries: Vec<(&str, Extractor)> = vec![
    // attribute_of — before value_of / entity_value (see module docs)
    (
      r"^what is the (?P<attribute>.+?) (?:of|for) (?:the )?(?P<entity>.+)$",
      attribute_of,
    ),
    (
      r"^quel(?:le)? est (?:le |la |l )?(?P<attribute>.+?) (?:du |de la |de l |des |de )(?P<entity>.+)$",
      attribute_of,
    ),
    // value_of
    (r"^what is the value of (?:the )?(?P<field>.+)$", value_of),
    (
      r"^quelle est la valeur (?:du |de la |de l |des |de )(?P<field>.+)$",
      value_of,
    ),
    // entity_value / what_is
    (r"^what(?: is| s) (?:the |a |an )?(?P<term>.+)$", entity_value),
    (
      r"^qu est ce qu(?:e le |e la |e l |e | )(?P<term>.+)$",
      entity_value,
    ),
    (r"^quel(?:le)? est (?:le |la |l )?(?P<term>.+)$", entity_value),
    // relation
    (
      r"relation(?:ship)? between (?P<first>.+) and (?P<second>.+)$",
      relation,
    ),
    (r"relations? entre (?P<first>.+) et (?P<second>.+)$", relation),
    // list
    (r"^(?:list|show)(?: me)?(?: all)? (?:the )?(?P<term>.+)$", list),
    (
      r"^(?:liste[rz]?|affiche[rz]?)(?: tous| toutes)? (?:les |la |le )?(?P<term>.+)$",
      list,
    ),
  ];

  entries
    .into_iter()
    .map(|(pattern, extract)| {
      (Regex::new(pattern).expect("static classifier pattern"), extract)
    })
    .collect()
});

/// Classify an already-normalized question. Unmatched text yields
/// [`QuestionIntent::Unknown`] with no slots.
pub fn classify_question(normalized: &str) -> QuestionIntent {
  for (pattern, extract) in PATTERNS.iter() {
    if let Some(caps) = pattern.captures(normalized) {
      if let Some(intent) = extract(&caps) {
        return intent;
      }
    }
  }
  QuestionIntent::Unknown
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::text::normalize;

  fn classify(raw: &str) -> QuestionIntent {
    classify_question(&normalize(raw))
  }

  #[test]
  fn attribute_of_wins_over_entity_value() {
    assert_eq!(
      classify("What is the dosage of the product?"),
      QuestionIntent::AttributeOf {
        entity:    "product".into(),
        attribute: "dosage".into(),
      }
    );
  }

  #[test]
  fn value_of_is_not_swallowed_by_attribute_of() {
    assert_eq!(
      classify("What is the value of the expiry date?"),
      QuestionIntent::ValueOf { field: "expiry date".into() }
    );
    assert_eq!(
      classify("Quelle est la valeur de la date de peremption ?"),
      QuestionIntent::ValueOf { field: "date de peremption".into() }
    );
  }

  #[test]
  fn french_attribute_of() {
    assert_eq!(
      classify("Quel est le dosage du produit S 6490 ?"),
      QuestionIntent::AttributeOf {
        entity:    "produit s 6490".into(),
        attribute: "dosage".into(),
      }
    );
  }

  #[test]
  fn plain_what_is_maps_to_entity_value() {
    assert_eq!(
      classify("What is perindopril?"),
      QuestionIntent::EntityValue { term: "perindopril".into() }
    );
  }

  #[test]
  fn relation_pattern_extracts_both_entities() {
    assert_eq!(
      classify("Is there a relation between S 6490 and perindopril?"),
      QuestionIntent::Relation {
        first:  "s 6490".into(),
        second: "perindopril".into(),
      }
    );
  }

  #[test]
  fn list_pattern() {
    assert_eq!(
      classify("List all side effects"),
      QuestionIntent::List { term: "side effects".into() }
    );
  }

  #[test]
  fn unmatched_text_is_unknown() {
    assert_eq!(classify("tell me something nice"), QuestionIntent::Unknown);
  }
}
