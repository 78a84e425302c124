//! Declarative per-provider field tables.
//!
//! A [`ProviderSchema`] says where each canonical field lives in a
//! provider's body and which unit conversion applies. Every provider
//! module exports one as a `static`; the generic routine in
//! [`super::normalize`] evaluates it.

/// Square feet in one acre.
pub const SQUARE_FEET_PER_ACRE: f64 = 43_560.0;

/// The fields of the canonical property record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Address,
    SquareFootage,
    LotSizeAcres,
    YearBuilt,
    PropertyType,
    Bedrooms,
    Bathrooms,
    RoomCount,
    SepticSystem,
    SalePrice,
}

/// The value type a canonical field is coerced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Integer,
    Decimal,
    Boolean,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 10] = [
        CanonicalField::Address,
        CanonicalField::SquareFootage,
        CanonicalField::LotSizeAcres,
        CanonicalField::YearBuilt,
        CanonicalField::PropertyType,
        CanonicalField::Bedrooms,
        CanonicalField::Bathrooms,
        CanonicalField::RoomCount,
        CanonicalField::SepticSystem,
        CanonicalField::SalePrice,
    ];

    /// Canonical (camelCase) name, as used in errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            CanonicalField::Address => "address",
            CanonicalField::SquareFootage => "squareFootage",
            CanonicalField::LotSizeAcres => "lotSizeAcres",
            CanonicalField::YearBuilt => "yearBuilt",
            CanonicalField::PropertyType => "propertyType",
            CanonicalField::Bedrooms => "bedrooms",
            CanonicalField::Bathrooms => "bathrooms",
            CanonicalField::RoomCount => "roomCount",
            CanonicalField::SepticSystem => "septicSystem",
            CanonicalField::SalePrice => "salePrice",
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            CanonicalField::Address | CanonicalField::PropertyType => ValueKind::Text,
            CanonicalField::SquareFootage
            | CanonicalField::YearBuilt
            | CanonicalField::Bedrooms
            | CanonicalField::RoomCount => ValueKind::Integer,
            CanonicalField::LotSizeAcres | CanonicalField::Bathrooms | CanonicalField::SalePrice => {
                ValueKind::Decimal
            }
            CanonicalField::SepticSystem => ValueKind::Boolean,
        }
    }
}

/// Unit conversion applied to a numeric source value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Conversion {
    #[default]
    Identity,
    /// Square feet to acres, rounded to two decimal places.
    SquareFeetToAcres,
}

impl Conversion {
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            Conversion::Identity => value,
            Conversion::SquareFeetToAcres => round_to_hundredths(value / SQUARE_FEET_PER_ACRE),
        }
    }
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Where one canonical field comes from.
#[derive(Debug, Clone, Copy)]
pub struct FieldMapping {
    pub field: CanonicalField,
    /// Key path relative to the schema's envelope. Matching ignores case,
    /// underscores and hyphens.
    pub source: &'static [&'static str],
    pub conversion: Conversion,
}

impl FieldMapping {
    pub const fn new(field: CanonicalField, source: &'static [&'static str]) -> Self {
        Self {
            field,
            source,
            conversion: Conversion::Identity,
        }
    }

    pub const fn converted(self, conversion: Conversion) -> Self {
        Self { conversion, ..self }
    }
}

/// Field and unit table for one provider.
#[derive(Debug, Clone, Copy)]
pub struct ProviderSchema {
    /// Path from the body root to the object holding the fields.
    pub envelope: &'static [&'static str],
    pub fields: &'static [FieldMapping],
}
