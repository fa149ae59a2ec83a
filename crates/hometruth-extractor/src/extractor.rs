//! [`ListingExtractor`]: the engine's public entry point.

use std::sync::Arc;

use hometruth_core::{ExtractionOutcome, ListingIdentity, RawPayload};
use serde_json::Value;

use crate::assemble::Assembler;
use crate::classify;
use crate::identity;
use crate::normalizer::{PropertyNormalizer, StandardNormalizer};
use crate::registry::SourceRegistry;
use crate::report::{ErrorReporter, TracingReporter};

/// Cheap-to-clone handle over a shared registry, reporter, and normalizer.
///
/// All methods take `&self` and never fail outward: classification misses
/// return `None`/`false` and extraction always produces an
/// [`ExtractionOutcome`].
#[derive(Clone)]
pub struct ListingExtractor {
    registry: Arc<SourceRegistry>,
    reporter: Arc<dyn ErrorReporter>,
    normalizer: Arc<dyn PropertyNormalizer>,
}

impl ListingExtractor {
    #[must_use]
    pub fn new(registry: Arc<SourceRegistry>, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            registry,
            reporter,
            normalizer: Arc::new(StandardNormalizer),
        }
    }

    /// Replaces the field normalizer.
    #[must_use]
    pub fn with_normalizer(mut self, normalizer: Arc<dyn PropertyNormalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Source id for `url`, or `None` for unregistered hosts and unparsable URLs.
    #[must_use]
    pub fn identify_source(&self, url: &str) -> Option<String> {
        classify::identify_source(&self.registry, self.reporter.as_ref(), url)
            .map(|source| source.source_id.clone())
    }

    #[must_use]
    pub fn is_listing_page(&self, url: &str) -> bool {
        classify::is_listing_page(&self.registry, self.reporter.as_ref(), url)
    }

    #[must_use]
    pub fn derive_identity(&self, url: &str, source_id: &str) -> Option<ListingIdentity> {
        identity::derive_identity(&self.registry, self.reporter.as_ref(), url, source_id)
    }

    /// Normalizes `payload` for `url`. Absent and non-object payloads are
    /// treated as empty.
    #[must_use]
    pub fn extract(&self, url: &str, payload: Option<&Value>) -> ExtractionOutcome {
        self.assembler().assemble(url, None, payload_map(payload))
    }

    /// Like [`extract`](Self::extract) for callers that already know the source.
    #[must_use]
    pub fn extract_for_source(
        &self,
        url: &str,
        source_id: &str,
        payload: Option<&Value>,
    ) -> ExtractionOutcome {
        self.assembler()
            .assemble(url, Some(source_id), payload_map(payload))
    }

    /// Normalizes an owned payload map without copying it.
    #[must_use]
    pub fn extract_raw(&self, url: &str, payload: RawPayload) -> ExtractionOutcome {
        self.assembler().assemble(url, None, payload)
    }

    fn assembler(&self) -> Assembler<'_> {
        Assembler {
            registry: &self.registry,
            reporter: self.reporter.as_ref(),
            normalizer: self.normalizer.as_ref(),
        }
    }
}

impl Default for ListingExtractor {
    fn default() -> Self {
        Self::new(
            Arc::new(SourceRegistry::builtin()),
            Arc::new(TracingReporter::new()),
        )
    }
}

impl std::fmt::Debug for ListingExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListingExtractor")
            .field("sources", &self.registry.source_ids())
            .finish_non_exhaustive()
    }
}

fn payload_map(payload: Option<&Value>) -> RawPayload {
    match payload {
        Some(Value::Object(map)) => map.clone(),
        Some(other) => {
            tracing::debug!(kind = value_kind(other), "payload is not an object, treating as empty");
            RawPayload::new()
        }
        None => RawPayload::new(),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
