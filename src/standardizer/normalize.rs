//! Generic evaluation of a [`ProviderSchema`] against a raw record.

use super::schema::{CanonicalField, FieldMapping, ProviderSchema, ValueKind};
use crate::errors::StandardizationError;
use crate::models::{CanonicalPropertyRecord, RawProviderRecord};
use serde_json::{Map, Value};
use tracing::debug;

/// A coerced field value, ready to be placed on the canonical record.
#[derive(Debug, Clone, PartialEq)]
enum FieldValue {
    Text(String),
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
}

/// Map a provider's raw record onto the canonical shape.
///
/// Missing or unparseable values become `None`. Only a body whose
/// structure contradicts the schema (a non-object where an object is
/// required) is an error.
pub fn normalize(
    raw: &RawProviderRecord,
    schema: &ProviderSchema,
) -> Result<CanonicalPropertyRecord, StandardizationError> {
    let root = raw
        .as_value()
        .as_object()
        .ok_or_else(|| StandardizationError::UnparsableField {
            field: "record".to_string(),
        })?;

    let mut record = CanonicalPropertyRecord::default();

    let envelope = match descend(root, schema.envelope) {
        Ok(Some(obj)) => obj,
        Ok(None) => {
            debug!("Envelope {:?} absent, record is empty", schema.envelope);
            return Ok(record);
        }
        Err(segment) => {
            return Err(StandardizationError::UnparsableField {
                field: segment.to_string(),
            })
        }
    };

    for mapping in schema.fields {
        if let Some(value) = extract(envelope, mapping)? {
            assign(&mut record, mapping.field, value);
        }
    }

    Ok(record)
}

/// Follow `path` through nested objects.
///
/// `Ok(None)` when a segment is absent or null; `Err(segment)` when a
/// segment holds something other than an object.
fn descend<'a>(
    mut current: &'a Map<String, Value>,
    path: &[&'static str],
) -> Result<Option<&'a Map<String, Value>>, &'static str> {
    for segment in path {
        match lookup(current, segment) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Object(next)) => current = next,
            Some(_) => return Err(*segment),
        }
    }
    Ok(Some(current))
}

fn extract(
    envelope: &Map<String, Value>,
    mapping: &FieldMapping,
) -> Result<Option<FieldValue>, StandardizationError> {
    let Some((leaf, parents)) = mapping.source.split_last() else {
        return Ok(None);
    };

    let parent = match descend(envelope, parents) {
        Ok(Some(obj)) => obj,
        Ok(None) => return Ok(None),
        Err(_) => {
            return Err(StandardizationError::UnparsableField {
                field: mapping.field.name().to_string(),
            })
        }
    };

    let Some(value) = lookup(parent, leaf) else {
        return Ok(None);
    };

    let coerced = coerce(value, mapping);
    if coerced.is_none() && !value.is_null() {
        debug!(
            "Ignoring unparseable value for {}: {}",
            mapping.field.name(),
            value
        );
    }
    Ok(coerced)
}

/// Find `key` in `obj`, tolerating camelCase / PascalCase / snake_case.
fn lookup<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    if let Some(value) = obj.get(key) {
        return Some(value);
    }

    let wanted = fold_key(key);
    obj.iter()
        .find(|(candidate, _)| fold_key(candidate) == wanted)
        .map(|(_, value)| value)
}

fn fold_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn coerce(value: &Value, mapping: &FieldMapping) -> Option<FieldValue> {
    match mapping.field.kind() {
        ValueKind::Text => as_text(value).map(FieldValue::Text),
        ValueKind::Boolean => as_bool(value).map(FieldValue::Boolean),
        ValueKind::Decimal => as_number(value)
            .map(|n| mapping.conversion.apply(n))
            .map(FieldValue::Decimal),
        ValueKind::Integer => {
            let n = mapping.conversion.apply(as_number(value)?);
            if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                Some(FieldValue::Integer(n as i64))
            } else {
                None
            }
        }
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| *c != ',' && *c != '$')
                .collect();
            cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
        }
        _ => None,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn assign(record: &mut CanonicalPropertyRecord, field: CanonicalField, value: FieldValue) {
    match (field, value) {
        (CanonicalField::Address, FieldValue::Text(v)) => record.address = Some(v),
        (CanonicalField::PropertyType, FieldValue::Text(v)) => record.property_type = Some(v),
        (CanonicalField::SquareFootage, FieldValue::Integer(v)) => record.square_footage = Some(v),
        (CanonicalField::YearBuilt, FieldValue::Integer(v)) => record.year_built = Some(v),
        (CanonicalField::Bedrooms, FieldValue::Integer(v)) => record.bedrooms = Some(v),
        (CanonicalField::RoomCount, FieldValue::Integer(v)) => record.room_count = Some(v),
        (CanonicalField::LotSizeAcres, FieldValue::Decimal(v)) => record.lot_size_acres = Some(v),
        (CanonicalField::Bathrooms, FieldValue::Decimal(v)) => record.bathrooms = Some(v),
        (CanonicalField::SalePrice, FieldValue::Decimal(v)) => record.sale_price = Some(v),
        (CanonicalField::SepticSystem, FieldValue::Boolean(v)) => record.septic_system = Some(v),
        // coerce() always yields the field's own kind
        (field, value) => debug!("Kind mismatch for {}: {:?}", field.name(), value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{provider_one, provider_two};
    use crate::standardizer::schema::{Conversion, FieldMapping};
    use serde_json::json;

    fn raw(value: Value) -> RawProviderRecord {
        RawProviderRecord::new(value)
    }

    #[test]
    fn test_provider_one_body() {
        let body = json!({
            "data": {
                "formattedAddress": "123 Main St, Boston, MA 02101",
                "squareFootage": 1850,
                "lotSizeSqFt": 87120,
                "yearBuilt": 1994,
                "propertyType": "Single Family",
                "bedrooms": 3,
                "bathrooms": 2.5,
                "lastSalePrice": 625000,
                "features": { "roomCount": 7, "septicSystem": true }
            },
            "cached": false
        });

        let record = normalize(&raw(body), &provider_one::SCHEMA).unwrap();
        assert_eq!(record.address.as_deref(), Some("123 Main St, Boston, MA 02101"));
        assert_eq!(record.square_footage, Some(1850));
        assert_eq!(record.lot_size_acres, Some(2.0));
        assert_eq!(record.year_built, Some(1994));
        assert_eq!(record.bathrooms, Some(2.5));
        assert_eq!(record.room_count, Some(7));
        assert_eq!(record.septic_system, Some(true));
        assert_eq!(record.sale_price, Some(625000.0));
    }

    #[test]
    fn test_provider_two_body_keeps_acres() {
        let body = json!({
            "data": {
                "NormalizedAddress": "123 MAIN ST, BOSTON, MA 02101",
                "SquareFootage": 1850,
                "LotSizeAcres": 0.18,
                "YearConstructed": 1994,
                "PropertyType": "SFR",
                "Bedrooms": 3,
                "Bathrooms": 2,
                "RoomCount": 7,
                "SepticSystem": false,
                "SalePrice": 625000
            }
        });

        let record = normalize(&raw(body), &provider_two::SCHEMA).unwrap();
        assert_eq!(record.lot_size_acres, Some(0.18));
        assert_eq!(record.year_built, Some(1994));
        assert_eq!(record.bathrooms, Some(2.0));
        assert_eq!(record.septic_system, Some(false));
    }

    #[test]
    fn test_differently_cased_keys_agree() {
        let camel = json!({ "data": { "squareFootage": 2100 } });
        let pascal = json!({ "data": { "SquareFootage": 2100 } });

        let one = normalize(&raw(camel), &provider_one::SCHEMA).unwrap();
        let two = normalize(&raw(pascal), &provider_two::SCHEMA).unwrap();
        assert_eq!(one.square_footage, Some(2100));
        assert_eq!(one.square_footage, two.square_footage);

        // Each schema also tolerates the other convention.
        let swapped = json!({ "Data": { "SquareFootage": 2100, "square_footage": 1 } });
        let record = normalize(&raw(swapped), &provider_one::SCHEMA).unwrap();
        assert!(record.square_footage.is_some());
    }

    #[test]
    fn test_missing_fields_stay_null() {
        let body = json!({ "data": { "bedrooms": 0 } });
        let record = normalize(&raw(body), &provider_one::SCHEMA).unwrap();

        assert_eq!(record.bedrooms, Some(0));
        assert_eq!(record.septic_system, None);
        assert_eq!(record.lot_size_acres, None);
        assert_eq!(record.sale_price, None);
        assert_eq!(record.room_count, None);
    }

    #[test]
    fn test_missing_envelope_is_empty_record() {
        let record = normalize(&raw(json!({ "cached": true })), &provider_two::SCHEMA).unwrap();
        assert_eq!(record, CanonicalPropertyRecord::default());

        let record = normalize(&raw(json!({ "data": null })), &provider_two::SCHEMA).unwrap();
        assert_eq!(record, CanonicalPropertyRecord::default());
    }

    #[test]
    fn test_unparseable_values_become_null() {
        let body = json!({
            "data": {
                "squareFootage": "about two thousand",
                "bedrooms": 2.5,
                "yearBuilt": "1,994",
                "lastSalePrice": "$625,000",
                "features": { "septicSystem": "maybe", "roomCount": [] }
            }
        });

        let record = normalize(&raw(body), &provider_one::SCHEMA).unwrap();
        assert_eq!(record.square_footage, None);
        assert_eq!(record.bedrooms, None);
        assert_eq!(record.year_built, Some(1994));
        assert_eq!(record.sale_price, Some(625000.0));
        assert_eq!(record.septic_system, None);
        assert_eq!(record.room_count, None);
    }

    #[test]
    fn test_boolean_spellings() {
        for (input, expected) in [
            (json!("Yes"), Some(true)),
            (json!("n"), Some(false)),
            (json!(1), Some(true)),
            (json!(false), Some(false)),
            (json!("unknown"), None),
        ] {
            let body = json!({ "data": { "SepticSystem": input } });
            let record = normalize(&raw(body), &provider_two::SCHEMA).unwrap();
            assert_eq!(record.septic_system, expected);
        }
    }

    #[test]
    fn test_corrupt_structure_is_error() {
        let err = normalize(&raw(json!(["not", "an", "object"])), &provider_one::SCHEMA)
            .unwrap_err();
        assert_eq!(
            err,
            StandardizationError::UnparsableField {
                field: "record".to_string()
            }
        );

        let err = normalize(&raw(json!({ "data": "oops" })), &provider_one::SCHEMA).unwrap_err();
        assert_eq!(
            err,
            StandardizationError::UnparsableField {
                field: "data".to_string()
            }
        );

        let body = json!({ "data": { "features": 42 } });
        let err = normalize(&raw(body), &provider_one::SCHEMA).unwrap_err();
        assert_eq!(
            err,
            StandardizationError::UnparsableField {
                field: "roomCount".to_string()
            }
        );
    }

    #[test]
    fn test_conversion_on_custom_schema() {
        static FIELDS: [FieldMapping; 1] = [FieldMapping::new(
            CanonicalField::LotSizeAcres,
            &["lot", "sqft"],
        )
        .converted(Conversion::SquareFeetToAcres)];
        let schema = ProviderSchema {
            envelope: &[],
            fields: &FIELDS,
        };

        let record = normalize(&raw(json!({ "lot": { "sqft": "87,120" } })), &schema).unwrap();
        assert_eq!(record.lot_size_acres, Some(2.0));
    }
}
