//! Compiled source table.
//!
//! Classification and identity derivation are written once and parametrized
//! over [`SourceDescriptor`]s, so supporting a new portal is a data change in
//! the sources file rather than a code change.

use hometruth_core::sources::validate_sources;
use hometruth_core::{default_sources, SourceConfig, SourcesFile};
use regex::Regex;

use crate::error::ExtractorError;

/// One supported source with its URL rules compiled.
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    pub source_id: String,
    pub name: String,
    /// Lowercased registrable host, e.g. `"rightmove.co.uk"`.
    pub host_pattern: String,
    pub listing_path_pattern: Regex,
    /// Always exactly one capturing group.
    pub listing_id_capture: Regex,
}

impl SourceDescriptor {
    /// Compiles a [`SourceConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ExtractorError::InvalidPattern`] if either pattern fails to
    /// compile, or [`ExtractorError::InvalidRegistry`] if the id pattern does
    /// not have exactly one capturing group.
    pub fn from_config(config: &SourceConfig) -> Result<Self, ExtractorError> {
        let listing_path_pattern =
            Regex::new(&config.listing_path).map_err(|e| ExtractorError::InvalidPattern {
                source_id: config.id.clone(),
                field: "listing_path",
                source: e,
            })?;

        let listing_id_capture =
            Regex::new(&config.listing_id).map_err(|e| ExtractorError::InvalidPattern {
                source_id: config.id.clone(),
                field: "listing_id",
                source: e,
            })?;

        // captures_len counts the implicit whole-match group.
        let groups = listing_id_capture.captures_len() - 1;
        if groups != 1 {
            return Err(ExtractorError::InvalidRegistry(format!(
                "listing_id pattern for source '{}' must have exactly one capturing group, found {groups}",
                config.id
            )));
        }

        Ok(Self {
            source_id: config.id.clone(),
            name: config.name.clone(),
            host_pattern: config.host.trim().to_ascii_lowercase(),
            listing_path_pattern,
            listing_id_capture,
        })
    }

    /// `true` when `host` is the pattern itself or one of its subdomains.
    #[must_use]
    pub fn matches_host(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        host == self.host_pattern
            || host
                .strip_suffix(self.host_pattern.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    }

    #[must_use]
    pub fn is_listing_path(&self, path: &str) -> bool {
        self.listing_path_pattern.is_match(path)
    }

    /// The source-local listing id captured from `path`, if any.
    #[must_use]
    pub fn capture_listing_id<'p>(&self, path: &'p str) -> Option<&'p str> {
        self.listing_id_capture
            .captures(path)?
            .get(1)
            .map(|m| m.as_str())
            .filter(|id| !id.is_empty())
    }
}

/// Read-only table of [`SourceDescriptor`]s in declaration order.
///
/// Build it once at startup and share it behind an `Arc`; nothing mutates it
/// after construction.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    descriptors: Vec<SourceDescriptor>,
}

impl SourceRegistry {
    /// Builds a registry from a source table.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractorError::InvalidRegistry`] if the table fails
    /// structural validation (ids, overlapping hosts), or any error from
    /// [`SourceDescriptor::from_config`].
    pub fn from_sources(sources_file: &SourcesFile) -> Result<Self, ExtractorError> {
        validate_sources(sources_file)
            .map_err(|e| ExtractorError::InvalidRegistry(e.to_string()))?;

        let descriptors = sources_file
            .sources
            .iter()
            .map(SourceDescriptor::from_config)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(count = descriptors.len(), "built source registry");

        Ok(Self { descriptors })
    }

    /// Registry over the built-in UK portal table.
    ///
    /// # Panics
    ///
    /// Never in practice: the built-in table is covered by tests.
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_sources(&default_sources()).expect("built-in source table is valid")
    }

    #[must_use]
    pub fn descriptors(&self) -> &[SourceDescriptor] {
        &self.descriptors
    }

    #[must_use]
    pub fn get(&self, source_id: &str) -> Option<&SourceDescriptor> {
        self.descriptors.iter().find(|d| d.source_id == source_id)
    }

    /// First descriptor whose host pattern matches `host`.
    #[must_use]
    pub fn find_by_host(&self, host: &str) -> Option<&SourceDescriptor> {
        self.descriptors.iter().find(|d| d.matches_host(host))
    }

    #[must_use]
    pub fn source_ids(&self) -> Vec<&str> {
        self.descriptors
            .iter()
            .map(|d| d.source_id.as_str())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
