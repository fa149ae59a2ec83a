//! Record assembly: classification, identity, and normalization in one pass.
//!
//! Walks `Start -> SourceResolved -> PageValidated -> IdentityDerived ->
//! Success`, leaving at the first failed step with a [`PartialFailureRecord`].
//! Nothing escapes: a panicking normalizer is caught here and turned into
//! [`FailureKind::AssemblyFailed`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use hometruth_core::{ExtractionOutcome, FailureKind, PartialFailureRecord, RawPayload};
use sha2::{Digest, Sha256};

use crate::classify::{parse_listing_url, source_for};
use crate::identity::identity_from_path;
use crate::normalizer::{normalize_fields, PropertyNormalizer};
use crate::registry::SourceRegistry;
use crate::report::{ErrorReport, ErrorReporter, ExtractionStage, ReportContext};

pub const UNSUPPORTED_SOURCE: &str = "unsupported source";
pub const NOT_LISTING_PAGE: &str = "not a listing page";
pub const UNRECOGNIZED_LISTING_PATH: &str = "unrecognized listing path";

/// Borrowed collaborators for one assembly.
pub struct Assembler<'a> {
    pub registry: &'a SourceRegistry,
    pub reporter: &'a dyn ErrorReporter,
    pub normalizer: &'a dyn PropertyNormalizer,
}

impl Assembler<'_> {
    /// Assembles a record for `url`, resolving the source from the host unless
    /// `known_source` is given.
    #[must_use]
    pub fn assemble(
        &self,
        url: &str,
        known_source: Option<&str>,
        payload: RawPayload,
    ) -> ExtractionOutcome {
        let parsed = match parse_listing_url(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                let mut context = ReportContext::for_url(url);
                context.source_id = known_source.map(str::to_string);
                self.reporter.report(ErrorReport::new(
                    ExtractionStage::SourceIdentification,
                    e.to_string(),
                    context,
                ));
                // A registered source was named, so only the URL itself is at fault.
                let registered = known_source.and_then(|id| self.registry.get(id));
                let kind = if registered.is_some() {
                    FailureKind::UnrecognizedListingPath
                } else {
                    FailureKind::UnsupportedSource
                };
                let mut record = PartialFailureRecord::new(url, kind, e.to_string(), payload);
                record.source = known_source.map(str::to_string);
                return ExtractionOutcome::Failed(record);
            }
        };

        // Start -> SourceResolved
        let source = match known_source {
            Some(id) => self.registry.get(id),
            None => source_for(self.registry, &parsed),
        };
        let Some(source) = source else {
            let message = match known_source {
                Some(id) => format!("{UNSUPPORTED_SOURCE} '{id}'"),
                None => UNSUPPORTED_SOURCE.to_string(),
            };
            tracing::debug!(url, "skipping payload from unsupported source");
            return ExtractionOutcome::Failed(PartialFailureRecord::new(
                url,
                FailureKind::UnsupportedSource,
                message,
                payload,
            ));
        };

        // SourceResolved -> PageValidated
        if !source.is_listing_path(parsed.path()) {
            tracing::debug!(url, source_id = %source.source_id, "skipping non-listing page");
            return ExtractionOutcome::Failed(
                PartialFailureRecord::new(url, FailureKind::NotListingPage, NOT_LISTING_PAGE, payload)
                    .with_source(source.source_id.as_str()),
            );
        }

        // PageValidated -> IdentityDerived
        let Some(identity) = identity_from_path(source, &parsed) else {
            tracing::debug!(url, source_id = %source.source_id, "no listing id in path");
            return ExtractionOutcome::Failed(
                PartialFailureRecord::new(
                    url,
                    FailureKind::UnrecognizedListingPath,
                    UNRECOGNIZED_LISTING_PATH,
                    payload,
                )
                .with_source(source.source_id.as_str()),
            );
        };

        // IdentityDerived -> Success
        let normalized = panic::catch_unwind(AssertUnwindSafe(|| {
            normalize_fields(self.normalizer, &identity, url, &payload)
        }));

        match normalized {
            Ok(mut property) => {
                property.raw_data = payload;
                tracing::info!(
                    listing = %identity,
                    url,
                    populated = property.populated_fields(),
                    "property extracted successfully"
                );
                ExtractionOutcome::Extracted(Box::new(property))
            }
            Err(panic_payload) => {
                let message = format!("assembly failed: {}", panic_message(&*panic_payload));
                let (payload_bytes, payload_digest) = fingerprint(&payload);

                self.reporter.report(ErrorReport::new(
                    ExtractionStage::DataProcessing,
                    message.clone(),
                    ReportContext {
                        url: url.to_string(),
                        source_id: Some(identity.source_id.clone()),
                        listing_id: Some(identity.canonical()),
                        payload_bytes,
                        payload_digest,
                    },
                ));

                ExtractionOutcome::Failed(
                    PartialFailureRecord::new(url, FailureKind::AssemblyFailed, message, payload)
                        .with_identity(identity),
                )
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

/// Serialized size and hex SHA-256 of the payload, for correlating reports
/// without shipping the payload itself.
fn fingerprint(payload: &RawPayload) -> (Option<usize>, Option<String>) {
    match serde_json::to_vec(payload) {
        Ok(bytes) => (
            Some(bytes.len()),
            Some(format!("{:x}", Sha256::digest(&bytes))),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "could not serialize payload for fingerprint");
            (None, None)
        }
    }
}

#[cfg(test)]
mod tests {
    use hometruth_core::{ListingIdentity, Tenure};
    use serde_json::{json, Value};

    use super::*;
    use crate::normalizer::StandardNormalizer;
    use crate::report::MemoryReporter;

    struct Panicking;

    impl PropertyNormalizer for Panicking {
        fn bedrooms(&self, _payload: &RawPayload) -> Result<Option<u32>, crate::ExtractorError> {
            panic!("bedroom parser exploded");
        }
    }

    fn payload() -> RawPayload {
        match json!({
            "price": "£425,000",
            "bedrooms": 3,
            "description": "recently converted, share of freehold available",
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn run(
        normalizer: &dyn PropertyNormalizer,
        reporter: &MemoryReporter,
        url: &str,
        source: Option<&str>,
    ) -> ExtractionOutcome {
        let registry = SourceRegistry::builtin();
        Assembler {
            registry: &registry,
            reporter,
            normalizer,
        }
        .assemble(url, source, payload())
    }

    #[test]
    fn success_path_keeps_raw_payload() {
        let reporter = MemoryReporter::default();
        let outcome = run(
            &StandardNormalizer,
            &reporter,
            "https://www.rightmove.co.uk/properties/123456",
            None,
        );
        let property = outcome.as_property().expect("extracted");
        assert_eq!(property.id, ListingIdentity::new("rightmove", "123456"));
        assert_eq!(property.source, "rightmove");
        assert_eq!(property.price, Some(425_000));
        assert_eq!(property.tenure, Some(Tenure::ShareOfFreehold));
        assert_eq!(&property.raw_data, &payload());
        assert!(reporter.is_empty());
    }

    #[test]
    fn unsupported_host_fails_without_identity() {
        let reporter = MemoryReporter::default();
        let outcome = run(&StandardNormalizer, &reporter, "https://example.com/properties/1", None);
        let failure = outcome.as_failure().expect("failed");
        assert_eq!(failure.failure, FailureKind::UnsupportedSource);
        assert!(failure.id.is_none());
        assert!(failure.source.is_none());
        assert_eq!(failure.raw_data, payload());
        assert!(reporter.is_empty());
    }

    #[test]
    fn unknown_known_source_is_unsupported() {
        let reporter = MemoryReporter::default();
        let outcome = run(
            &StandardNormalizer,
            &reporter,
            "https://www.rightmove.co.uk/properties/1",
            Some("acme"),
        );
        let failure = outcome.as_failure().expect("failed");
        assert_eq!(failure.failure, FailureKind::UnsupportedSource);
        assert_eq!(failure.error_message, "unsupported source 'acme'");
    }

    #[test]
    fn unparsable_url_for_registered_source_is_unrecognized_path() {
        let reporter = MemoryReporter::default();
        let outcome = run(
            &StandardNormalizer,
            &reporter,
            "rightmove.co.uk/properties/1",
            Some("rightmove"),
        );
        let failure = outcome.as_failure().expect("failed");
        assert_eq!(failure.failure, FailureKind::UnrecognizedListingPath);
        assert_eq!(failure.source.as_deref(), Some("rightmove"));
        assert_eq!(reporter.len(), 1);

        let outcome = run(
            &StandardNormalizer,
            &reporter,
            "rightmove.co.uk/properties/1",
            Some("acme"),
        );
        let failure = outcome.as_failure().expect("failed");
        assert_eq!(failure.failure, FailureKind::UnsupportedSource);
    }

    #[test]
    fn index_page_is_not_a_listing() {
        let reporter = MemoryReporter::default();
        let outcome = run(
            &StandardNormalizer,
            &reporter,
            "https://www.zoopla.co.uk/for-sale/property/london/",
            None,
        );
        let failure = outcome.as_failure().expect("failed");
        assert_eq!(failure.failure, FailureKind::NotListingPage);
        assert_eq!(failure.source.as_deref(), Some("zoopla"));
        assert!(reporter.is_empty());
    }

    #[test]
    fn panicking_normalizer_is_contained() {
        let reporter = MemoryReporter::default();
        let outcome = run(
            &Panicking,
            &reporter,
            "https://www.zoopla.co.uk/for-sale/details/998877/",
            None,
        );
        let failure = outcome.as_failure().expect("failed");
        assert_eq!(failure.failure, FailureKind::AssemblyFailed);
        assert_eq!(failure.id, Some(ListingIdentity::new("zoopla", "998877")));
        assert!(failure.error_message.contains("bedroom parser exploded"));
        assert_eq!(failure.raw_data, payload());

        let reports = reporter.history(10);
        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        assert_eq!(report.stage, ExtractionStage::DataProcessing);
        assert_eq!(report.context.listing_id.as_deref(), Some("zoopla-998877"));
        assert_eq!(report.context.source_id.as_deref(), Some("zoopla"));
        let digest = report.context.payload_digest.as_deref().unwrap();
        assert_eq!(digest.len(), 64);
        assert!(report.context.payload_bytes.unwrap() > 0);
    }

    #[test]
    fn fingerprint_is_stable() {
        let (bytes_a, digest_a) = fingerprint(&payload());
        let (bytes_b, digest_b) = fingerprint(&payload());
        assert_eq!(bytes_a, bytes_b);
        assert_eq!(digest_a, digest_b);
    }
}
