//! Listing identity derivation from URL paths.

use hometruth_core::ListingIdentity;
use url::Url;

use crate::classify::parse_listing_url;
use crate::registry::{SourceDescriptor, SourceRegistry};
use crate::report::{ErrorReport, ErrorReporter, ExtractionStage, ReportContext};

/// Identity from an already-parsed URL and resolved source.
#[must_use]
pub fn identity_from_path(source: &SourceDescriptor, url: &Url) -> Option<ListingIdentity> {
    source
        .capture_listing_id(url.path())
        .map(|local_id| ListingIdentity::new(source.source_id.as_str(), local_id))
}

/// Derives `{source_id, local_id}` from `url` using the source's id pattern.
///
/// Returns `None` when the source is not registered or the pattern does not
/// match. Unparsable URLs are additionally reported.
pub fn derive_identity(
    registry: &SourceRegistry,
    reporter: &dyn ErrorReporter,
    url: &str,
    source_id: &str,
) -> Option<ListingIdentity> {
    let source = registry.get(source_id)?;

    match parse_listing_url(url) {
        Ok(parsed) => identity_from_path(source, &parsed),
        Err(e) => {
            reporter.report(ErrorReport::new(
                ExtractionStage::IdentityDerivation,
                e.to_string(),
                ReportContext::for_url(url).with_source(source_id),
            ));
            None
        }
    }
}
