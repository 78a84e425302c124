//! Provider 2 property API.
//!
//! Bodies are PascalCase and flat under `data`; lot size already comes
//! in acres and the build year is called `YearConstructed`.

use anyhow::Result;
use async_trait::async_trait;

use super::http::HttpEndpoint;
use super::{PropertyProvider, ProviderSettings};
use crate::errors::ProviderError;
use crate::models::RawProviderRecord;
use crate::standardizer::{CanonicalField as F, FieldMapping, ProviderSchema};

pub const DEFAULT_NAME: &str = "Provider 2";
pub const DEFAULT_BASE_URL: &str = "https://property-detail-api.fly.dev/provider-2/property";

pub static SCHEMA: ProviderSchema = ProviderSchema {
    envelope: &["data"],
    fields: &[
        FieldMapping::new(F::Address, &["NormalizedAddress"]),
        FieldMapping::new(F::SquareFootage, &["SquareFootage"]),
        FieldMapping::new(F::LotSizeAcres, &["LotSizeAcres"]),
        FieldMapping::new(F::YearBuilt, &["YearConstructed"]),
        FieldMapping::new(F::PropertyType, &["PropertyType"]),
        FieldMapping::new(F::Bedrooms, &["Bedrooms"]),
        FieldMapping::new(F::Bathrooms, &["Bathrooms"]),
        FieldMapping::new(F::RoomCount, &["RoomCount"]),
        FieldMapping::new(F::SepticSystem, &["SepticSystem"]),
        FieldMapping::new(F::SalePrice, &["SalePrice"]),
    ],
};

pub struct ProviderTwo {
    id: String,
    name: String,
    endpoint: HttpEndpoint,
}

impl ProviderTwo {
    pub fn new(settings: &ProviderSettings) -> Result<Self> {
        Ok(Self {
            id: settings.id.clone(),
            name: settings.name.clone(),
            endpoint: HttpEndpoint::new(settings)?,
        })
    }
}

#[async_trait]
impl PropertyProvider for ProviderTwo {
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
