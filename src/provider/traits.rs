//! Property provider trait definition.

use async_trait::async_trait;

use crate::errors::ProviderError;
use crate::models::RawProviderRecord;
use crate::standardizer::ProviderSchema;

/// A single external source of property details.
///
/// Implementations own one endpoint, its credentials and its response
/// decoding. They never rename fields or convert units (that is what
/// [`schema`](Self::schema) is for) and never retry: the aggregator
/// decides whether a failure is worth another attempt.
#[async_trait]
pub trait PropertyProvider: Send + Sync {
    /// Stable identity, used in cache keys and logs.
    fn id(&self) -> &str;

    /// Display name, used as the key in aggregate responses.
    fn name(&self) -> &str;

    /// Field and unit table used to standardize this provider's records.
    fn schema(&self) -> &'static ProviderSchema;

    /// Fetch the raw record for `address`.
    ///
    /// Performs exactly one outbound call, bounded by the provider's
    /// configured timeout.
    async fn fetch_details(&self, address: &str) -> Result<RawProviderRecord, ProviderError>;
}
