//! Subcommand handlers.
//!
//! Handlers write to any `io::Write` so tests can capture their output. They
//! return `Err` only for I/O and argument problems; per-listing failures are
//! part of the normal output.

use std::collections::HashSet;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use anyhow::Context;
use hometruth_extractor::{ListingExtractor, SourceRegistry};
use serde::Deserialize;
use serde_json::{json, Value};

/// One line of a batch file.
#[derive(Debug, Deserialize)]
struct BatchLine {
    url: String,
    #[serde(default)]
    payload: Option<Value>,
    /// Optional source id; skips host resolution when present.
    #[serde(default)]
    source: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct BatchSummary {
    pub lines: usize,
    pub extracted: usize,
    pub failed: usize,
    pub duplicates: usize,
    pub malformed: usize,
}

pub(crate) fn run_classify(
    extractor: &ListingExtractor,
    urls: &[String],
    out: &mut impl Write,
) -> anyhow::Result<()> {
    for url in urls {
        let source = extractor.identify_source(url);
        let is_listing = extractor.is_listing_page(url);
        let identity = source
            .as_deref()
            .and_then(|source_id| extractor.derive_identity(url, source_id))
            .map(|identity| identity.canonical());

        let row = json!({
            "url": url,
            "source": source,
            "isListing": is_listing,
            "identity": identity,
        });
        writeln!(out, "{row}")?;
    }
    Ok(())
}

pub(crate) fn run_extract(
    extractor: &ListingExtractor,
    url: &str,
    payload_path: &Path,
    source: Option<&str>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let raw = fs::read_to_string(payload_path)
        .with_context(|| format!("reading payload {}", payload_path.display()))?;
    let payload: Value = serde_json::from_str(&raw)
        .with_context(|| format!("parsing payload {}", payload_path.display()))?;

    let outcome = match source {
        Some(source_id) => extractor.extract_for_source(url, source_id, Some(&payload)),
        None => extractor.extract(url, Some(&payload)),
    };

    writeln!(out, "{}", serde_json::to_string_pretty(&outcome)?)?;
    Ok(())
}

/// Streams a JSONL file through the extractor, one outcome per output line.
///
/// Malformed lines are logged and skipped. With `dedupe`, a property whose
/// identity was already extracted is skipped. Failures are always emitted and
/// never claim an identity, so a later successful retry still comes through.
pub(crate) fn run_batch(
    extractor: &ListingExtractor,
    path: &Path,
    dedupe: bool,
    out: &mut impl Write,
) -> anyhow::Result<BatchSummary> {
    let file =
        fs::File::open(path).with_context(|| format!("opening batch file {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut summary = BatchSummary::default();
    let mut seen: HashSet<String> = HashSet::new();

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.with_context(|| format!("reading line {line_no}"))?;
        if line.trim().is_empty() {
            continue;
        }
        summary.lines += 1;

        let entry: BatchLine = match serde_json::from_str(&line) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "skipping malformed batch line");
                summary.malformed += 1;
                continue;
            }
        };

        let outcome = match entry.source.as_deref() {
            Some(source_id) => {
                extractor.extract_for_source(&entry.url, source_id, entry.payload.as_ref())
            }
            None => extractor.extract(&entry.url, entry.payload.as_ref()),
        };

        if dedupe {
            if let Some(property) = outcome.as_property() {
                if !seen.insert(property.id.canonical()) {
                    tracing::debug!(line = line_no, listing = %property.id, "skipping duplicate listing");
                    summary.duplicates += 1;
                    continue;
                }
            }
        }

        if outcome.as_property().is_some() {
            summary.extracted += 1;
        } else {
            summary.failed += 1;
        }
        writeln!(out, "{}", serde_json::to_string(&outcome)?)?;
    }

    Ok(summary)
}

pub(crate) fn run_sources(registry: &SourceRegistry, out: &mut impl Write) -> anyhow::Result<()> {
    for source in registry.descriptors() {
        writeln!(
            out,
            "{:<16}{:<24}{}",
            source.source_id, source.host_pattern, source.name
        )?;
    }
    Ok(())
}
