//! Property data providers.
//!
//! This module contains:
//! - The [`PropertyProvider`] trait every source implements
//! - Shared HTTP plumbing for JSON property APIs
//! - The built-in provider variants, selected by [`ProviderKind`]

pub mod http;
pub mod provider_one;
pub mod provider_two;
mod traits;

pub use traits::PropertyProvider;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use crate::models::ProviderKind;

/// Fully resolved settings for constructing one provider.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub id: String,
    pub name: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

/// Construct the provider variant named by `settings.kind`.
pub fn build_provider(settings: &ProviderSettings) -> Result<Arc<dyn PropertyProvider>> {
    let provider: Arc<dyn PropertyProvider> = match settings.kind {
        ProviderKind::ProviderOne => Arc::new(provider_one::ProviderOne::new(settings)?),
        ProviderKind::ProviderTwo => Arc::new(provider_two::ProviderTwo::new(settings)?),
    };
    Ok(provider)
}

/// Construct every provider in order.
pub fn build_providers(settings: &[ProviderSettings]) -> Result<Vec<Arc<dyn PropertyProvider>>> {
    settings.iter().map(build_provider).collect()
}
