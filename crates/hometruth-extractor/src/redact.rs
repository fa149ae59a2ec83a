//! Scrubs personal data out of error reports before they leave the engine.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::report::ErrorReport;

static POSTCODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z]{1,2}[0-9][A-Z0-9]? ?[0-9][A-Z]{2}\b").expect("postcode pattern is valid")
});

const POSTCODE_REPLACEMENT: &str = "[POSTCODE REDACTED]";
const ID_REPLACEMENT: &str = "[ID REDACTED]";
const PATH_REPLACEMENT: &str = "[PATH REDACTED]";
const URL_REPLACEMENT: &str = "[URL REDACTED]";

/// Keeps only the scheme and host; the path and query carry the listing id.
fn redact_url(url: &str) -> String {
    if url.is_empty() {
        return String::new();
    }
    match Url::parse(url) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => format!("{}://{host}/{PATH_REPLACEMENT}", parsed.scheme()),
            None => URL_REPLACEMENT.to_string(),
        },
        Err(_) => URL_REPLACEMENT.to_string(),
    }
}

/// Replaces UK postcodes and `<source>-<id>` listing identities.
#[derive(Debug, Clone)]
pub struct Redactor {
    identity: Option<Regex>,
}

impl Redactor {
    /// Builds a redactor that recognizes identities for the given source ids.
    #[must_use]
    pub fn new<I, S>(source_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let alternatives: Vec<String> = source_ids
            .into_iter()
            .map(|id| regex::escape(id.as_ref()))
            .filter(|id| !id.is_empty())
            .collect();

        let identity = if alternatives.is_empty() {
            None
        } else {
            // Built from escaped literals, so it always compiles.
            Regex::new(&format!(r"\b({})-[A-Za-z0-9]+\b", alternatives.join("|"))).ok()
        };

        Self { identity }
    }

    #[must_use]
    pub fn scrub_message(&self, message: &str) -> String {
        let scrubbed = POSTCODE.replace_all(message, POSTCODE_REPLACEMENT);
        match &self.identity {
            Some(identity) => identity
                .replace_all(&scrubbed, format!("${{1}}-{ID_REPLACEMENT}"))
                .into_owned(),
            None => scrubbed.into_owned(),
        }
    }

    /// Scrubs the message, the context URL, and the context's listing id.
    /// The raw URL is also replaced wherever the message quotes it.
    #[must_use]
    pub fn apply(&self, mut report: ErrorReport) -> ErrorReport {
        let redacted_url = redact_url(&report.context.url);
        if !report.context.url.is_empty() {
            report.message = report.message.replace(&report.context.url, &redacted_url);
        }
        report.message = self.scrub_message(&report.message);
        report.context.url = redacted_url;
        if report.context.listing_id.is_some() {
            report.context.listing_id = Some(ID_REPLACEMENT.to_string());
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ExtractionStage, ReportContext};

    fn redactor() -> Redactor {
        Redactor::new(["rightmove", "zoopla", "onthemarket", "primelocation"])
    }

    #[test]
    fn scrubs_full_postcodes() {
        let scrubbed = redactor().scrub_message("flat at SW1A 1AA and M1 1AE failed");
        assert_eq!(
            scrubbed,
            "flat at [POSTCODE REDACTED] and [POSTCODE REDACTED] failed"
        );
    }

    #[test]
    fn scrubs_postcode_without_space() {
        assert_eq!(
            redactor().scrub_message("EC1A1BB"),
            "[POSTCODE REDACTED]"
        );
    }

    #[test]
    fn scrubs_listing_identities_for_known_sources() {
        let scrubbed = redactor().scrub_message("zoopla-998877 and onthemarket-AB12cd failed");
        assert_eq!(
            scrubbed,
            "zoopla-[ID REDACTED] and onthemarket-[ID REDACTED] failed"
        );
    }

    #[test]
    fn leaves_unknown_sources_alone() {
        assert_eq!(redactor().scrub_message("acme-123"), "acme-123");
    }

    #[test]
    fn leaves_plain_text_alone() {
        let message = "assembly failed: index out of bounds";
        assert_eq!(redactor().scrub_message(message), message);
    }

    #[test]
    fn apply_scrubs_message_and_listing_id() {
        let mut context = ReportContext::for_url("https://www.rightmove.co.uk/properties/123456");
        context.listing_id = Some("rightmove-123456".to_string());
        let report = ErrorReport::new(
            ExtractionStage::DataProcessing,
            "rightmove-123456 near N1 9GU",
            context,
        );

        let redacted = redactor().apply(report);
        assert_eq!(
            redacted.message,
            "rightmove-[ID REDACTED] near [POSTCODE REDACTED]"
        );
        assert_eq!(redacted.context.listing_id.as_deref(), Some("[ID REDACTED]"));
        assert_eq!(
            redacted.context.url,
            "https://www.rightmove.co.uk/[PATH REDACTED]"
        );
    }

    #[test]
    fn apply_removes_raw_url_from_message() {
        let url = "www.rightmove.co.uk/properties/123456";
        let report = ErrorReport::new(
            ExtractionStage::SourceIdentification,
            format!("invalid URL \"{url}\": relative URL without a base"),
            ReportContext::for_url(url),
        );

        let redacted = redactor().apply(report);
        assert!(!redacted.message.contains("123456"), "{}", redacted.message);
        assert!(redacted.message.contains("[URL REDACTED]"));
        assert_eq!(redacted.context.url, "[URL REDACTED]");
    }

    #[test]
    fn apply_leaves_empty_url_empty() {
        let report = ErrorReport::new(
            ExtractionStage::SourceIdentification,
            "invalid URL \"\": empty",
            ReportContext::for_url(""),
        );
        assert_eq!(redactor().apply(report).context.url, "");
    }

    #[test]
    fn empty_source_list_only_scrubs_postcodes() {
        let redactor = Redactor::new(Vec::<String>::new());
        assert_eq!(
            redactor.scrub_message("rightmove-1 at W1A 0AX"),
            "rightmove-1 at [POSTCODE REDACTED]"
        );
    }
}
