//! Provider 1 property API.
//!
//! Bodies are camelCase, with room count and septic flag nested under
//! `data.features` and lot size reported in square feet:
//!
//! ```json
//! { "data": { "formattedAddress": "...", "lotSizeSqFt": 7841,
//!             "features": { "roomCount": 7, "septicSystem": false } },
//!   "cached": false }
//! ```

use anyhow::Result;
use async_trait::async_trait;

use super::http::HttpEndpoint;
use super::{PropertyProvider, ProviderSettings};
use crate::errors::ProviderError;
use crate::models::RawProviderRecord;
use crate::standardizer::{CanonicalField as F, Conversion, FieldMapping, ProviderSchema};

pub const DEFAULT_NAME: &str = "Provider 1";
pub const DEFAULT_BASE_URL: &str = "https://property-detail-api.fly.dev/provider-1/property";

pub static SCHEMA: ProviderSchema = ProviderSchema {
    envelope: &["data"],
    fields: &[
        FieldMapping::new(F::Address, &["formattedAddress"]),
        FieldMapping::new(F::SquareFootage, &["squareFootage"]),
        FieldMapping::new(F::LotSizeAcres, &["lotSizeSqFt"]).converted(Conversion::SquareFeetToAcres),
        FieldMapping::new(F::YearBuilt, &["yearBuilt"]),
        FieldMapping::new(F::PropertyType, &["propertyType"]),
        FieldMapping::new(F::Bedrooms, &["bedrooms"]),
        FieldMapping::new(F::Bathrooms, &["bathrooms"]),
        FieldMapping::new(F::RoomCount, &["features", "roomCount"]),
        FieldMapping::new(F::SepticSystem, &["features", "septicSystem"]),
        FieldMapping::new(F::SalePrice, &["lastSalePrice"]),
    ],
};

pub struct ProviderOne {
    id: String,
    name: String,
    endpoint: HttpEndpoint,
}

impl ProviderOne {
    pub fn new(settings: &ProviderSettings) -> Result<Self> {
        Ok(Self {
            id: settings.id.clone(),
            name: settings.name.clone(),
            endpoint: HttpEndpoint::new(settings)?,
        })
    }
}

#[async_trait]
impl PropertyProvider for ProviderOne {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> &'static ProviderSchema {
        &SCHEMA
    }

    async fn fetch_details(&self, address: &str) -> Result<RawProviderRecord, ProviderError> {
        let body = self.endpoint.get_json(address).await?;
        Ok(RawProviderRecord::new(body))
    }
}
