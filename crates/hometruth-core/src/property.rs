//! Canonical property records produced by the extraction engine.
//!
//! Records serialize with camelCase keys so downstream consumers see the same
//! shape regardless of which portal the listing came from.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Untyped payload exactly as delivered by the fetch layer.
pub type RawPayload = serde_json::Map<String, Value>;

/// Globally unique listing key: a source id plus the source-local listing id.
///
/// Serializes as its canonical string form, e.g. `"rightmove-123456"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ListingIdentity {
    pub source_id: String,
    pub local_id: String,
}

impl ListingIdentity {
    #[must_use]
    pub fn new(source_id: impl Into<String>, local_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            local_id: local_id.into(),
        }
    }

    /// Canonical `"{source_id}-{local_id}"` form used as the dedup/cache key.
    #[must_use]
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ListingIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.source_id, self.local_id)
    }
}

impl FromStr for ListingIdentity {
    type Err = String;

    /// Source ids never contain `-`, so the first hyphen splits the two parts.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('-') {
            Some((source_id, local_id)) if !source_id.is_empty() && !local_id.is_empty() => {
                Ok(Self::new(source_id, local_id))
            }
            _ => Err(format!("invalid listing identity '{s}'")),
        }
    }
}

impl From<ListingIdentity> for String {
    fn from(identity: ListingIdentity) -> Self {
        identity.to_string()
    }
}

impl TryFrom<String> for ListingIdentity {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// UK legal ownership classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tenure {
    Freehold,
    Leasehold,
    ShareOfFreehold,
}

impl fmt::Display for Tenure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tenure::Freehold => write!(f, "freehold"),
            Tenure::Leasehold => write!(f, "leasehold"),
            Tenure::ShareOfFreehold => write!(f, "shareOfFreehold"),
        }
    }
}

/// Energy Performance Certificate bands, e.g. `current: "C"`, `potential: "B"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpcRating {
    pub current: Option<String>,
    pub potential: Option<String>,
}

/// Floor area as the portal printed it, e.g. `metric: "85 sq m"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorArea {
    pub metric: Option<String>,
    pub imperial: Option<String>,
}

/// A listing normalized into the portal-independent shape.
///
/// Every field after `url` is independently optional; a missing price never
/// prevents the bedrooms from being read, and so on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalProperty {
    pub id: ListingIdentity,
    /// Source id, e.g. `"zoopla"`.
    pub source: String,
    pub url: String,
    /// Asking price in whole pounds.
    pub price: Option<u64>,
    pub address: Option<String>,
    pub property_type: Option<String>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub reception_rooms: Option<u32>,
    pub description: Option<String>,
    /// Best-effort classification; see the extractor's tenure inference.
    pub tenure: Option<Tenure>,
    pub leasehold_years: Option<u32>,
    /// Passed through unchanged; portals disagree on its shape.
    pub ground_rent: Option<Value>,
    /// Passed through unchanged; portals disagree on its shape.
    pub service_charge: Option<Value>,
    pub epc_rating: Option<EpcRating>,
    /// Single uppercase letter, `A` to `I`.
    pub council_tax_band: Option<String>,
    pub features: Option<Vec<String>>,
    pub floor_area: Option<FloorArea>,
    pub listed_status: Option<bool>,
    pub conservation_area: Option<bool>,
    pub agent: Option<Value>,
    /// The payload this record was derived from, kept for forensic replay.
    #[serde(default)]
    pub raw_data: RawPayload,
}

impl CanonicalProperty {
    /// An identity-only record with every typed field unset.
    #[must_use]
    pub fn empty(id: ListingIdentity, url: impl Into<String>, raw_data: RawPayload) -> Self {
        Self {
            source: id.source_id.clone(),
            id,
            url: url.into(),
            price: None,
            address: None,
            property_type: None,
            bedrooms: None,
            bathrooms: None,
            reception_rooms: None,
            description: None,
            tenure: None,
            leasehold_years: None,
            ground_rent: None,
            service_charge: None,
            epc_rating: None,
            council_tax_band: None,
            features: None,
            floor_area: None,
            listed_status: None,
            conservation_area: None,
            agent: None,
            raw_data,
        }
    }

    /// Number of typed fields that carry a value.
    #[must_use]
    pub fn populated_fields(&self) -> usize {
        [
            self.price.is_some(),
            self.address.is_some(),
            self.property_type.is_some(),
            self.bedrooms.is_some(),
            self.bathrooms.is_some(),
            self.reception_rooms.is_some(),
            self.description.is_some(),
            self.tenure.is_some(),
            self.leasehold_years.is_some(),
            self.ground_rent.is_some(),
            self.service_charge.is_some(),
            self.epc_rating.is_some(),
            self.council_tax_band.is_some(),
            self.features.is_some(),
            self.floor_area.is_some(),
            self.listed_status.is_some(),
            self.conservation_area.is_some(),
            self.agent.is_some(),
        ]
        .into_iter()
        .filter(|populated| *populated)
        .count()
    }
}

/// Why a payload could not be turned into a [`CanonicalProperty`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    /// The URL host is not in the source registry, or the URL is unparsable
    /// and no registered source was named.
    UnsupportedSource,
    /// Known source, but the path is not an individual listing.
    NotListingPage,
    /// Listing-shaped path from which no listing id could be captured, or an
    /// unparsable URL for an explicitly named registered source.
    UnrecognizedListingPath,
    /// Normalization aborted after the identity was derived.
    AssemblyFailed,
}

impl FailureKind {
    /// Expected traffic such as index pages, as opposed to a fault worth alarming on.
    #[must_use]
    pub fn is_expected(self) -> bool {
        !matches!(self, FailureKind::AssemblyFailed)
    }
}

/// Degraded output that still carries whatever identity could be derived
/// together with the untouched payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialFailureRecord {
    pub id: Option<ListingIdentity>,
    pub source: Option<String>,
    pub url: String,
    /// Always `true`; lets JSON consumers branch on a single key.
    pub extraction_error: bool,
    pub error_message: String,
    pub failure: FailureKind,
    #[serde(default)]
    pub raw_data: RawPayload,
}

impl PartialFailureRecord {
    #[must_use]
    pub fn new(
        url: impl Into<String>,
        failure: FailureKind,
        error_message: impl Into<String>,
        raw_data: RawPayload,
    ) -> Self {
        Self {
            id: None,
            source: None,
            url: url.into(),
            extraction_error: true,
            error_message: error_message.into(),
            failure,
            raw_data,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source_id: impl Into<String>) -> Self {
        self.source = Some(source_id.into());
        self
    }

    #[must_use]
    pub fn with_identity(mut self, identity: ListingIdentity) -> Self {
        self.source = Some(identity.source_id.clone());
        self.id = Some(identity);
        self
    }
}

/// Result of running one payload through the record assembler.
///
/// Serializes untagged: the JSON is exactly one of the two record shapes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExtractionOutcome {
    Extracted(Box<CanonicalProperty>),
    Failed(PartialFailureRecord),
}

impl ExtractionOutcome {
    /// The listing identity, when one was derived.
    #[must_use]
    pub fn identity(&self) -> Option<&ListingIdentity> {
        match self {
            ExtractionOutcome::Extracted(property) => Some(&property.id),
            ExtractionOutcome::Failed(record) => record.id.as_ref(),
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            ExtractionOutcome::Extracted(property) => &property.url,
            ExtractionOutcome::Failed(record) => &record.url,
        }
    }

    #[must_use]
    pub fn raw_data(&self) -> &RawPayload {
        match self {
            ExtractionOutcome::Extracted(property) => &property.raw_data,
            ExtractionOutcome::Failed(record) => &record.raw_data,
        }
    }

    #[must_use]
    pub fn as_property(&self) -> Option<&CanonicalProperty> {
        match self {
            ExtractionOutcome::Extracted(property) => Some(property),
            ExtractionOutcome::Failed(_) => None,
        }
    }

    #[must_use]
    pub fn as_failure(&self) -> Option<&PartialFailureRecord> {
        match self {
            ExtractionOutcome::Extracted(_) => None,
            ExtractionOutcome::Failed(record) => Some(record),
        }
    }
}
