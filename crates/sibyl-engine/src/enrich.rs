//! Optional enrichment capability.
//!
//! An injected, best-effort seam for an AI-assisted layer. The rule-
//! based tiers are fully functional with this capability disabled or
//! absent; its failure must never block them. The engine consults it
//! only when every rule tier has come up empty.

use std::future::Future;

/// An answer produced by the enrichment capability.
#[derive(Debug, Clone)]
pub struct EnrichedAnswer {
  pub answer:     String,
  pub confidence: f64,
}

/// The capability seam. Implementations own their failure handling:
/// `enhance` returns `None` for "no answer" and for any internal error.
pub trait Enrichment: Send + Sync {
  fn enabled(&self) -> bool;

  fn enhance<'a>(
    &'a self,
    prompt: &'a str,
  ) -> impl Future<Output = Option<EnrichedAnswer>> + Send + 'a;
}

/// The default: enrichment absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEnrichment;

impl Enrichment for NoEnrichment {
  fn enabled(&self) -> bool { false }

  async fn enhance(&self, _prompt: &str) -> Option<EnrichedAnswer> { None }
}
