use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// One supported listing portal, in its serializable form.
///
/// The pattern fields are regular-expression sources; they are compiled when
/// the extractor builds its registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Lowercase alphanumeric id, e.g. `"rightmove"`. Prefix of every
    /// listing identity from this source.
    pub id: String,
    pub name: String,
    /// Registrable host, matched against a URL host as an exact or dot-suffix match.
    pub host: String,
    /// Path pattern that marks an individual listing page.
    pub listing_path: String,
    /// Path pattern with exactly one capturing group holding the listing id.
    pub listing_id: String,
}

impl SourceConfig {
    fn new(id: &str, name: &str, host: &str, listing_path: &str, listing_id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            host: host.to_string(),
            listing_path: listing_path.to_string(),
            listing_id: listing_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesFile {
    pub sources: Vec<SourceConfig>,
}

/// The built-in UK portal table.
#[must_use]
pub fn default_sources() -> SourcesFile {
    SourcesFile {
        sources: vec![
            SourceConfig::new(
                "rightmove",
                "Rightmove",
                "rightmove.co.uk",
                r"/properties/[0-9]+",
                r"/properties/([0-9]+)",
            ),
            SourceConfig::new(
                "zoopla",
                "Zoopla",
                "zoopla.co.uk",
                r"/for-sale/details/[0-9]+",
                r"/for-sale/details/([0-9]+)",
            ),
            SourceConfig::new(
                "onthemarket",
                "OnTheMarket",
                "onthemarket.com",
                r"/details/[a-zA-Z0-9]+",
                r"/details/([a-zA-Z0-9]+)",
            ),
            SourceConfig::new(
                "primelocation",
                "PrimeLocation",
                "primelocation.com",
                r"/property-for-sale/property-[0-9]+",
                r"/property-for-sale/property-([0-9]+)",
            ),
        ],
    }
}

/// Load and validate a source table from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_sources(path: &Path) -> Result<SourcesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SourcesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let sources_file: SourcesFile =
        serde_yaml::from_str(&content).map_err(ConfigError::SourcesFileParse)?;

    validate_sources(&sources_file)?;

    Ok(sources_file)
}

/// Structural checks that do not need the patterns compiled.
///
/// # Errors
///
/// Returns `ConfigError::Validation` on empty or malformed ids, empty hosts,
/// duplicate ids, or hosts that overlap (equal, or one a dot-suffix of the other).
pub fn validate_sources(sources_file: &SourcesFile) -> Result<(), ConfigError> {
    if sources_file.sources.is_empty() {
        return Err(ConfigError::Validation(
            "at least one source must be configured".to_string(),
        ));
    }

    let mut seen_ids = HashSet::new();
    let mut hosts: Vec<(String, &str)> = Vec::new();

    for source in &sources_file.sources {
        if source.id.is_empty()
            || !source
                .id
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(ConfigError::Validation(format!(
                "source id '{}' must be non-empty lowercase alphanumeric",
                source.id
            )));
        }

        if !seen_ids.insert(source.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate source id: '{}'",
                source.id
            )));
        }

        let host = source.host.trim().to_ascii_lowercase();
        if host.is_empty() {
            return Err(ConfigError::Validation(format!(
                "source '{}' has an empty host",
                source.id
            )));
        }

        if let Some((_, other_id)) = hosts.iter().find(|(other, _)| hosts_overlap(&host, other)) {
            return Err(ConfigError::Validation(format!(
                "source '{}' host '{}' overlaps with source '{}'",
                source.id, source.host, other_id
            )));
        }
        hosts.push((host, source.id.as_str()));
    }

    Ok(())
}

fn hosts_overlap(a: &str, b: &str) -> bool {
    a == b || a.ends_with(&format!(".{b}")) || b.ends_with(&format!(".{a}"))
}

#[cfg(test)]
#[path = "sources_test.rs"]
mod tests;
