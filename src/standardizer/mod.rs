//! Schema and unit standardization.
//!
//! Turns provider-specific bodies into [`crate::models::CanonicalPropertyRecord`]s
//! using a flat, declarative table per provider.

pub mod normalize;
pub mod schema;

pub use normalize::normalize;
pub use schema::{CanonicalField, Conversion, FieldMapping, ProviderSchema};
