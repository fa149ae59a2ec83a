//! Source and page classification over a [`SourceRegistry`].

use url::Url;

use crate::error::ExtractorError;
use crate::registry::{SourceDescriptor, SourceRegistry};
use crate::report::{ErrorReport, ErrorReporter, ExtractionStage, ReportContext};

/// Parses an absolute URL that carries a host.
///
/// # Errors
///
/// Returns [`ExtractorError::InvalidUrl`] for relative URLs, malformed input,
/// and host-less URLs such as `mailto:`.
pub fn parse_listing_url(url: &str) -> Result<Url, ExtractorError> {
    let parsed = Url::parse(url.trim()).map_err(|e| ExtractorError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(parsed),
        _ => Err(ExtractorError::InvalidUrl {
            url: url.to_string(),
            reason: "URL has no host".to_string(),
        }),
    }
}

/// Resolves an already-parsed URL to its source.
#[must_use]
pub fn source_for<'r>(registry: &'r SourceRegistry, url: &Url) -> Option<&'r SourceDescriptor> {
    url.host_str().and_then(|host| registry.find_by_host(host))
}

/// Resolves `url` to its source descriptor.
///
/// Unparsable URLs are reported and yield `None`.
pub fn identify_source<'r>(
    registry: &'r SourceRegistry,
    reporter: &dyn ErrorReporter,
    url: &str,
) -> Option<&'r SourceDescriptor> {
    match parse_listing_url(url) {
        Ok(parsed) => source_for(registry, &parsed),
        Err(e) => {
            reporter.report(ErrorReport::new(
                ExtractionStage::SourceIdentification,
                e.to_string(),
                ReportContext::for_url(url),
            ));
            None
        }
    }
}

/// `true` when `url` belongs to a registered source and its path addresses a
/// single listing.
pub fn is_listing_page(registry: &SourceRegistry, reporter: &dyn ErrorReporter, url: &str) -> bool {
    let parsed = match parse_listing_url(url) {
        Ok(parsed) => parsed,
        Err(e) => {
            reporter.report(ErrorReport::new(
                ExtractionStage::PageClassification,
                e.to_string(),
                ReportContext::for_url(url),
            ));
            return false;
        }
    };

    source_for(registry, &parsed).is_some_and(|source| source.is_listing_path(parsed.path()))
}
