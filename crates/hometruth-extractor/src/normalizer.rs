//! Pluggable field normalization.
//!
//! [`PropertyNormalizer`] has one method per canonical field, each defaulting
//! to the rule in [`crate::normalize`] (or [`crate::tenure`]). Source-specific
//! normalizers override only the fields they need. A method that returns
//! `Err` costs that one field, never the record.

use hometruth_core::{
    CanonicalProperty, EpcRating, FloorArea, ListingIdentity, RawPayload, Tenure,
};
use serde_json::Value;

use crate::error::ExtractorError;
use crate::normalize;
use crate::tenure;

type FieldResult<T> = Result<Option<T>, ExtractorError>;

pub trait PropertyNormalizer: Send + Sync {
    fn price(&self, payload: &RawPayload) -> FieldResult<u64> {
        Ok(normalize::extract_price(payload))
    }

    fn address(&self, payload: &RawPayload) -> FieldResult<String> {
        Ok(normalize::extract_address(payload))
    }

    fn property_type(&self, payload: &RawPayload) -> FieldResult<String> {
        Ok(normalize::extract_property_type(payload))
    }

    fn bedrooms(&self, payload: &RawPayload) -> FieldResult<u32> {
        Ok(normalize::extract_bedrooms(payload))
    }

    fn bathrooms(&self, payload: &RawPayload) -> FieldResult<u32> {
        Ok(normalize::extract_bathrooms(payload))
    }

    fn reception_rooms(&self, payload: &RawPayload) -> FieldResult<u32> {
        Ok(normalize::extract_reception_rooms(payload))
    }

    fn description(&self, payload: &RawPayload) -> FieldResult<String> {
        Ok(normalize::extract_description(payload))
    }

    fn tenure(&self, payload: &RawPayload) -> FieldResult<Tenure> {
        Ok(tenure::infer_tenure(payload))
    }

    fn leasehold_years(&self, payload: &RawPayload) -> FieldResult<u32> {
        Ok(normalize::extract_leasehold_years(payload))
    }

    fn ground_rent(&self, payload: &RawPayload) -> FieldResult<Value> {
        Ok(normalize::extract_ground_rent(payload))
    }

    fn service_charge(&self, payload: &RawPayload) -> FieldResult<Value> {
        Ok(normalize::extract_service_charge(payload))
    }

    fn epc_rating(&self, payload: &RawPayload) -> FieldResult<EpcRating> {
        Ok(normalize::extract_epc_rating(payload))
    }

    fn council_tax_band(&self, payload: &RawPayload) -> FieldResult<String> {
        Ok(normalize::extract_council_tax_band(payload))
    }

    fn features(&self, payload: &RawPayload) -> FieldResult<Vec<String>> {
        Ok(normalize::extract_features(payload))
    }

    fn floor_area(&self, payload: &RawPayload) -> FieldResult<FloorArea> {
        Ok(normalize::extract_floor_area(payload))
    }

    fn listed_status(&self, payload: &RawPayload) -> FieldResult<bool> {
        Ok(normalize::extract_listed_status(payload))
    }

    fn conservation_area(&self, payload: &RawPayload) -> FieldResult<bool> {
        Ok(normalize::extract_conservation_area(payload))
    }

    fn agent(&self, payload: &RawPayload) -> FieldResult<Value> {
        Ok(normalize::extract_agent(payload))
    }
}

/// The default rule for every field.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardNormalizer;

impl PropertyNormalizer for StandardNormalizer {}

fn settle<T>(identity: &ListingIdentity, field: &'static str, result: FieldResult<T>) -> Option<T> {
    result.unwrap_or_else(|e| {
        tracing::warn!(listing = %identity, field, error = %e, "field normalization failed");
        None
    })
}

/// Runs every field through `normalizer`. `raw_data` is left empty for the
/// caller to fill, so the payload is never cloned here.
pub(crate) fn normalize_fields(
    normalizer: &dyn PropertyNormalizer,
    identity: &ListingIdentity,
    url: &str,
    payload: &RawPayload,
) -> CanonicalProperty {
    let id = identity;
    let mut property = CanonicalProperty::empty(identity.clone(), url, RawPayload::new());

    property.price = settle(id, "price", normalizer.price(payload));
    property.address = settle(id, "address", normalizer.address(payload));
    property.property_type = settle(id, "propertyType", normalizer.property_type(payload));
    property.bedrooms = settle(id, "bedrooms", normalizer.bedrooms(payload));
    property.bathrooms = settle(id, "bathrooms", normalizer.bathrooms(payload));
    property.reception_rooms = settle(id, "receptionRooms", normalizer.reception_rooms(payload));
    property.description = settle(id, "description", normalizer.description(payload));
    property.tenure = settle(id, "tenure", normalizer.tenure(payload));
    property.leasehold_years = settle(id, "leaseholdYears", normalizer.leasehold_years(payload));
    property.ground_rent = settle(id, "groundRent", normalizer.ground_rent(payload));
    property.service_charge = settle(id, "serviceCharge", normalizer.service_charge(payload));
    property.epc_rating = settle(id, "epcRating", normalizer.epc_rating(payload));
    property.council_tax_band = settle(id, "councilTaxBand", normalizer.council_tax_band(payload));
    property.features = settle(id, "features", normalizer.features(payload));
    property.floor_area = settle(id, "floorArea", normalizer.floor_area(payload));
    property.listed_status = settle(id, "listedStatus", normalizer.listed_status(payload));
    property.conservation_area =
        settle(id, "conservationArea", normalizer.conservation_area(payload));
    property.agent = settle(id, "agent", normalizer.agent(payload));

    property
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    struct StrictPrice;

    impl PropertyNormalizer for StrictPrice {
        fn price(&self, payload: &RawPayload) -> FieldResult<u64> {
            match payload.get("price") {
                Some(Value::Number(n)) => Ok(n.as_u64()),
                Some(other) => Err(ExtractorError::FieldCoercion {
                    field: "price",
                    reason: format!("expected a number, got {other}"),
                }),
                None => Ok(None),
            }
        }
    }

    fn payload() -> RawPayload {
        match json!({
            "price": "£425,000",
            "bedrooms": 3,
            "tenure": "freehold",
            "address": "1 High Street",
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn standard_normalizer_fills_every_rule() {
        let identity = ListingIdentity::new("rightmove", "1");
        let property = normalize_fields(&StandardNormalizer, &identity, "u", &payload());
        assert_eq!(property.price, Some(425_000));
        assert_eq!(property.bedrooms, Some(3));
        assert_eq!(property.tenure, Some(Tenure::Freehold));
        assert!(property.raw_data.is_empty());
    }

    #[test]
    fn failing_field_only_loses_that_field() {
        let identity = ListingIdentity::new("rightmove", "1");
        let property = normalize_fields(&StrictPrice, &identity, "u", &payload());
        assert_eq!(property.price, None);
        assert_eq!(property.bedrooms, Some(3));
        assert_eq!(property.address.as_deref(), Some("1 High Street"));
        assert_eq!(property.tenure, Some(Tenure::Freehold));
    }
}
