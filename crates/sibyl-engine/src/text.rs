//! Text normalization and keyword extraction.
//!
//! Every lookup in the engine goes through [`normalize`] first: exact
//! Q&A matching, keyword overlap, structured field search, and
//! annotation text resolution all compare normalized strings.
//! Normalization must therefore be idempotent and deterministic — two
//! semantically-equal surface strings normalize identically.

use std::collections::HashSet;
use std::sync::LazyLock;

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Minimum token length kept by [`keywords`].
const MIN_KEYWORD_LEN: usize = 3;

/// Function words excluded from keyword sets. The corpus is French with
/// English queries mixed in, so both languages are covered.
static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
  [
    // English
    "the", "and", "for", "are", "was", "were", "has", "have", "had", "not",
    "but", "its", "with", "from", "this", "that", "these", "those", "what",
    "which", "who", "whom", "how", "when", "where", "why", "does", "did",
    "can", "could", "will", "would", "should", "there", "their", "they",
    "you", "your", "all", "any", "into", "about",
    // French
    "les", "des", "une", "est", "que", "qui", "quoi", "dont", "dans",
    "pour", "sur", "avec", "par", "pas", "plus", "son", "ses", "aux",
    "ces", "cette", "mais", "comme", "tout", "tous", "toutes", "nous",
    "vous", "ils", "elles", "elle", "sont", "ont", "fait", "ete", "etre",
    "avoir", "quel", "quelle", "quels", "quelles", "comment", "pourquoi",
    "quand", "donc",
  ]
  .into_iter()
  .collect()
});

/// Normalize a surface string for matching: lowercase, strip combining
/// diacritical marks, replace every character that is neither a word
/// character nor whitespace with a space, collapse whitespace, trim.
///
/// Empty input yields an empty string; this never fails.
pub fn normalize(text: &str) -> String {
  let folded: String = text
    .to_lowercase()
    .nfd()
    .filter(|c| !is_combining_mark(*c))
    .map(|c| {
      if c.is_alphanumeric() || c == '_' || c.is_whitespace() {
        c
      } else {
        ' '
      }
    })
    .collect();

  folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Stop-word-filtered keyword set of an already-normalized string.
/// Tokens shorter than [`MIN_KEYWORD_LEN`] are dropped.
pub fn keywords(normalized: &str) -> HashSet<String> {
  normalized
    .split_whitespace()
    .filter(|t| t.len() >= MIN_KEYWORD_LEN && !STOP_WORDS.contains(t))
    .map(str::to_owned)
    .collect()
}

/// Share of `a`'s keywords present in `b`. Asymmetric: the query's
/// keyword coverage is what matters, not the candidate's. 0.0 when `a`
/// is empty.
pub fn overlap_ratio(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
  if a.is_empty() {
    return 0.0;
  }
  let common = a.intersection(b).count();
  common as f64 / a.len() as f64
}

/// Bidirectional substring match over two normalized strings.
/// Intentionally loose: "s 6490" matches "produit s 6490" and vice
/// versa. Empty strings never match.
pub fn text_matches(a: &str, b: &str) -> bool {
  !a.is_empty() && !b.is_empty() && (a.contains(b) || b.contains(a))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalize_is_idempotent() {
    for s in [
      "  What IS   the Dosage?!",
      "Quel est le dosage du produit S 6490 ?",
      "déjà-vu: l'effet",
      "",
    ] {
      let once = normalize(s);
      assert_eq!(normalize(&once), once);
    }
  }

  #[test]
  fn normalize_strips_diacritics() {
    assert_eq!(normalize("Café"), "cafe");
    assert_eq!(normalize("effets indésirables"), "effets indesirables");
    assert_eq!(normalize("l'élément"), "l element");
  }

  #[test]
  fn normalize_collapses_punctuation_and_whitespace() {
    assert_eq!(normalize("What  is... the value?"), "what is the value");
    assert_eq!(normalize("S-6490"), "s 6490");
  }

  #[test]
  fn keywords_filter_stop_words_and_short_tokens() {
    let kw = keywords("what is the dosage of the product");
    assert!(kw.contains("dosage"));
    assert!(kw.contains("product"));
    assert!(!kw.contains("what"));
    assert!(!kw.contains("the"));
    assert!(!kw.contains("of"));
  }

  #[test]
  fn overlap_ratio_is_asymmetric() {
    let a: HashSet<String> =
      ["dosage", "product"].iter().map(|s| s.to_string()).collect();
    let b: HashSet<String> = ["dosage", "product", "substance", "page"]
      .iter()
      .map(|s| s.to_string())
      .collect();

    assert_eq!(overlap_ratio(&a, &b), 1.0);
    assert_eq!(overlap_ratio(&b, &a), 0.5);
    assert_eq!(overlap_ratio(&HashSet::new(), &b), 0.0);
  }

  #[test]
  fn text_matches_is_bidirectional() {
    assert!(text_matches("s 6490", "produit s 6490"));
    assert!(text_matches("produit s 6490", "s 6490"));
    assert!(!text_matches("s 6490", "perindopril"));
    assert!(!text_matches("", "anything"));
  }
}
