//! Data models for property aggregation.
//!
//! This module contains the canonical property record, the per-provider
//! outcome, and the aggregate response returned to callers, along with
//! the serialized payload shape consumed by the presentation layer.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The built-in provider variants that can be enabled in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// camelCase API with nested features and lot size in square feet.
    ProviderOne,
    /// PascalCase API with a flat body and lot size in acres.
    ProviderTwo,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::ProviderOne => write!(f, "provider_one"),
            ProviderKind::ProviderTwo => write!(f, "provider_two"),
        }
    }
}

/// Provider-specific response body, exactly as decoded from the wire.
///
/// Only the standardizer looks inside.
#[derive(Debug, Clone, PartialEq)]
pub struct RawProviderRecord(Value);

impl RawProviderRecord {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub(crate) fn as_value(&self) -> &Value {
        &self.0
    }
}

/// Unified property data, independent of any provider's schema or units.
///
/// Lot size is in acres, footage in square feet, money in whole dollars.
/// Anything a provider omits stays `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalPropertyRecord {
    pub address: Option<String>,
    pub square_footage: Option<i64>,
    #[serde(rename = "lotSize")]
    pub lot_size_acres: Option<f64>,
    pub year_built: Option<i64>,
    pub property_type: Option<String>,
    pub bedrooms: Option<i64>,
    pub bathrooms: Option<f64>,
    pub room_count: Option<i64>,
    pub septic_system: Option<bool>,
    pub sale_price: Option<f64>,
}

/// Outcome for one provider within one request.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderResult {
    /// Standardized data, either fresh or served from the response cache.
    Success {
        record: CanonicalPropertyRecord,
        cached: bool,
    },
    /// The provider could not produce data; `message` is safe to display.
    Error { message: String },
}

impl ProviderResult {
    pub fn fresh(record: CanonicalPropertyRecord) -> Self {
        Self::Success {
            record,
            cached: false,
        }
    }

    pub fn cached(record: CanonicalPropertyRecord) -> Self {
        Self::Success {
            record,
            cached: true,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn record(&self) -> Option<&CanonicalPropertyRecord> {
        match self {
            Self::Success { record, .. } => Some(record),
            Self::Error { .. } => None,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Success { cached: true, .. })
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error { message } => Some(message),
            Self::Success { .. } => None,
        }
    }
}

/// Merged outcome of one request across every configured provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateResponse {
    /// Display name to outcome, in configuration order.
    pub providers: IndexMap<String, ProviderResult>,
    /// First address reported by a successful provider, in configuration order.
    pub normalized_address: Option<String>,
}

impl AggregateResponse {
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, provider_name: &str) -> Option<&ProviderResult> {
        self.providers.get(provider_name)
    }

    /// Number of providers that ended in an error.
    pub fn failed_count(&self) -> usize {
        self.providers
            .values()
            .filter(|r| r.error_message().is_some())
            .count()
    }

    /// Build the wire payload handed to the presentation layer.
    pub fn to_payload(&self) -> ResponsePayload {
        let providers = self
            .providers
            .iter()
            .map(|(name, result)| {
                let slot = match result {
                    ProviderResult::Success { record, cached } => ProviderPayload {
                        record: record.clone(),
                        cached: *cached,
                        error: None,
                        normalized_address: self.normalized_address.clone(),
                    },
                    ProviderResult::Error { message } => ProviderPayload {
                        record: CanonicalPropertyRecord::default(),
                        cached: false,
                        error: Some(message.clone()),
                        normalized_address: self.normalized_address.clone(),
                    },
                };
                (name.clone(), slot)
            })
            .collect();

        ResponsePayload {
            normalized_address: self.normalized_address.clone(),
            providers,
        }
    }
}

/// Serialized shape of an [`AggregateResponse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePayload {
    pub normalized_address: Option<String>,
    pub providers: IndexMap<String, ProviderPayload>,
}

/// One provider's slot in the payload: every canonical field (null on error),
/// the cache flag, and an optional error string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderPayload {
    #[serde(flatten)]
    pub record: CanonicalPropertyRecord,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub normalized_address: Option<String>,
}
