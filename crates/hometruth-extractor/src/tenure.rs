//! Tenure classification for listings that do not label it explicitly.
//!
//! Three tiers, first hit wins:
//!
//! 1. the explicit `tenure` field, mapped by its leading phrase;
//! 2. keywords in `description`;
//! 3. keywords in the `features` bullets.
//!
//! Within tiers 2 and 3 the share-of-freehold phrases are tested before the
//! bare `freehold` keyword, which they contain.

use std::sync::LazyLock;

use hometruth_core::{RawPayload, Tenure};
use regex::Regex;
use serde_json::Value;

static SHARE_OF_FREEHOLD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bshare[\s-]+(?:of[\s-]+(?:the[\s-]+)?)?freehold\b")
        .expect("share-of-freehold pattern is valid")
});

static FREEHOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bfreehold\b").expect("freehold pattern is valid"));

static LEASEHOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bleasehold\b").expect("leasehold pattern is valid"));

/// Keyword patterns in priority order.
fn keyword_rules() -> [(&'static Regex, Tenure); 3] {
    [
        (&*SHARE_OF_FREEHOLD, Tenure::ShareOfFreehold),
        (&*FREEHOLD, Tenure::Freehold),
        (&*LEASEHOLD, Tenure::Leasehold),
    ]
}

/// Maps an explicit tenure label by its leading phrase, so trailing detail
/// such as `"Leasehold (125 years remaining)"` is ignored. Case and
/// punctuation are not significant; a tenure word that does not lead the
/// label is not recognized.
#[must_use]
pub fn parse_explicit_tenure(label: &str) -> Option<Tenure> {
    let lowered = label.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect();

    match words.as_slice() {
        ["shareoffreehold", ..]
        | ["share", "of", "freehold", ..]
        | ["share", "of", "the", "freehold", ..]
        | ["share", "freehold", ..] => Some(Tenure::ShareOfFreehold),
        ["freehold", ..] => Some(Tenure::Freehold),
        ["leasehold", ..] => Some(Tenure::Leasehold),
        _ => None,
    }
}

/// First keyword rule that matches anywhere in `text`.
#[must_use]
pub fn scan_text(text: &str) -> Option<Tenure> {
    keyword_rules()
        .into_iter()
        .find(|(pattern, _)| pattern.is_match(text))
        .map(|(_, tenure)| tenure)
}

/// Best-effort tenure for a payload. `None` means no tier produced a value.
#[must_use]
pub fn infer_tenure(payload: &RawPayload) -> Option<Tenure> {
    if let Some(Value::String(label)) = payload.get("tenure") {
        match parse_explicit_tenure(label) {
            Some(tenure) => return Some(tenure),
            None if !label.trim().is_empty() => {
                tracing::debug!(label = %label, "unrecognized explicit tenure, falling back to text");
            }
            None => {}
        }
    }

    if let Some(tenure) = payload
        .get("description")
        .and_then(Value::as_str)
        .and_then(scan_text)
    {
        return Some(tenure);
    }

    let features = match payload.get("features") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" "),
        _ => return None,
    };
    scan_text(&features)
}
