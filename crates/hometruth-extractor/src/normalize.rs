//! Per-field coercion from a [`RawPayload`] into canonical values.
//!
//! Every `extract_*` function is total: a missing key, a value of the wrong
//! type, or an unparsable string all yield `None` rather than an error. Fields
//! are independent, so one bad value never affects its neighbours.
//!
//! Keys are the camelCase names the portal extractors deliver (`price`,
//! `receptionRooms`, `epcRating`, ...).

use std::sync::LazyLock;

use hometruth_core::{EpcRating, FloorArea, RawPayload};
use regex::Regex;
use serde_json::Value;

/// Currency symbols (Unicode `Sc`), the mis-decoded `Â` that precedes `£` in
/// Latin-1 scrapes, and three-letter ISO codes such as `GBP`.
static CURRENCY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\p{Sc}|Â|\b[A-Z]{3}").expect("currency pattern is valid")
});

/// Parses a non-negative whole number from a JSON number or a display string.
///
/// Strings have currency symbols and codes, thousands separators, and
/// whitespace stripped, then the leading run of digits is read. `"425000.50"` therefore
/// yields `425000`, and `"3 bedrooms"` yields `3`. Fractional JSON numbers are
/// truncated toward zero.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub(crate) fn coerce_whole_number(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                return Some(v);
            }
            let f = n.as_f64()?;
            // u64::MAX as f64 rounds up to 2^64, so compare strictly.
            let in_range = f.is_finite() && f >= 0.0 && f < u64::MAX as f64;
            in_range.then(|| f.trunc() as u64)
        }
        Value::String(s) => {
            let cleaned: String = CURRENCY
                .replace_all(s, "")
                .chars()
                .filter(|c| *c != ',' && !c.is_whitespace())
                .collect();
            let unsigned = cleaned.strip_prefix('+').unwrap_or(&cleaned);
            let digits_end = unsigned
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(unsigned.len());
            unsigned[..digits_end].parse().ok()
        }
        _ => None,
    }
}

fn whole_number(payload: &RawPayload, key: &str) -> Option<u64> {
    payload.get(key).and_then(coerce_whole_number)
}

fn small_count(payload: &RawPayload, key: &str) -> Option<u32> {
    whole_number(payload, key).and_then(|n| u32::try_from(n).ok())
}

/// Trimmed, non-empty string value.
pub(crate) fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        _ => None,
    }
}

fn text(payload: &RawPayload, key: &str) -> Option<String> {
    payload.get(key).and_then(coerce_text)
}

/// Trimmed string or stringified number, for display-only values.
fn display_value(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Number(n) => Some(n.to_string()),
        other => coerce_text(other),
    }
}

/// JavaScript-style truthiness: everything except `null`, `false`, `0`, and `""`.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn passthrough(payload: &RawPayload, key: &str) -> Option<Value> {
    payload.get(key).filter(|v| is_truthy(v)).cloned()
}

/// Asking price in whole pounds. A price of `0` is the portals' "price on
/// application" placeholder and is treated as absent.
#[must_use]
pub fn extract_price(payload: &RawPayload) -> Option<u64> {
    whole_number(payload, "price").filter(|price| *price > 0)
}

#[must_use]
pub fn extract_address(payload: &RawPayload) -> Option<String> {
    text(payload, "address")
}

#[must_use]
pub fn extract_property_type(payload: &RawPayload) -> Option<String> {
    text(payload, "propertyType")
}

/// Room counts keep `0`, which is how studio flats are listed.
#[must_use]
pub fn extract_bedrooms(payload: &RawPayload) -> Option<u32> {
    small_count(payload, "bedrooms")
}

#[must_use]
pub fn extract_bathrooms(payload: &RawPayload) -> Option<u32> {
    small_count(payload, "bathrooms")
}

#[must_use]
pub fn extract_reception_rooms(payload: &RawPayload) -> Option<u32> {
    small_count(payload, "receptionRooms")
}

#[must_use]
pub fn extract_description(payload: &RawPayload) -> Option<String> {
    text(payload, "description")
}

/// Remaining lease term in years, from the explicit field only.
#[must_use]
pub fn extract_leasehold_years(payload: &RawPayload) -> Option<u32> {
    small_count(payload, "leaseholdYears")
}

#[must_use]
pub fn extract_ground_rent(payload: &RawPayload) -> Option<Value> {
    passthrough(payload, "groundRent")
}

#[must_use]
pub fn extract_service_charge(payload: &RawPayload) -> Option<Value> {
    passthrough(payload, "serviceCharge")
}

#[must_use]
pub fn extract_agent(payload: &RawPayload) -> Option<Value> {
    passthrough(payload, "agent")
}

fn epc_band(value: Option<&Value>) -> Option<String> {
    display_value(value).map(|band| band.to_ascii_uppercase())
}

/// EPC bands from an `epcRating` object or string, falling back to the
/// `epcCurrent`/`epcPotential` siblings.
#[must_use]
pub fn extract_epc_rating(payload: &RawPayload) -> Option<EpcRating> {
    let nested = match payload.get("epcRating") {
        Some(Value::Object(obj)) => EpcRating {
            current: epc_band(obj.get("current")),
            potential: epc_band(obj.get("potential")),
        },
        Some(bare @ Value::String(_)) => EpcRating {
            current: epc_band(Some(bare)),
            potential: None,
        },
        _ => EpcRating {
            current: None,
            potential: None,
        },
    };
    if nested.current.is_some() || nested.potential.is_some() {
        return Some(nested);
    }

    let siblings = EpcRating {
        current: epc_band(payload.get("epcCurrent")),
        potential: epc_band(payload.get("epcPotential")),
    };
    (siblings.current.is_some() || siblings.potential.is_some()).then_some(siblings)
}

/// Council tax band as a single letter `A` to `I`. Accepts `"d"` and `"Band D"`.
#[must_use]
pub fn extract_council_tax_band(payload: &RawPayload) -> Option<String> {
    let raw = text(payload, "councilTaxBand")?.to_ascii_uppercase();
    let band = raw
        .strip_prefix("BAND")
        .unwrap_or(&raw)
        .trim_start_matches(|c: char| c == ':' || c.is_whitespace());

    let mut chars = band.chars();
    match (chars.next(), chars.next()) {
        (Some(letter @ 'A'..='I'), None) => Some(letter.to_string()),
        _ => None,
    }
}

/// Feature bullets, in order. Non-string and blank entries are dropped; a
/// scalar is not promoted to a one-element list.
#[must_use]
pub fn extract_features(payload: &RawPayload) -> Option<Vec<String>> {
    match payload.get("features")? {
        Value::Array(items) => Some(items.iter().filter_map(coerce_text).collect()),
        _ => None,
    }
}

/// Floor area from a `floorArea` object, falling back to the
/// `floorAreaMetric`/`floorAreaImperial` siblings.
#[must_use]
pub fn extract_floor_area(payload: &RawPayload) -> Option<FloorArea> {
    if let Some(Value::Object(obj)) = payload.get("floorArea") {
        let nested = FloorArea {
            metric: display_value(obj.get("metric")),
            imperial: display_value(obj.get("imperial")),
        };
        if nested.metric.is_some() || nested.imperial.is_some() {
            return Some(nested);
        }
    }

    let siblings = FloorArea {
        metric: display_value(payload.get("floorAreaMetric")),
        imperial: display_value(payload.get("floorAreaImperial")),
    };
    (siblings.metric.is_some() || siblings.imperial.is_some()).then_some(siblings)
}

fn coerce_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "true" => Some(true),
            "no" | "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[must_use]
pub fn extract_listed_status(payload: &RawPayload) -> Option<bool> {
    payload.get("listedStatus").and_then(coerce_flag)
}

#[must_use]
pub fn extract_conservation_area(payload: &RawPayload) -> Option<bool> {
    payload.get("conservationArea").and_then(coerce_flag)
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
