//! Error types for provider access and standardization.
//!
//! Every error here is scoped to a single provider. The aggregator turns
//! them into error entries in the response using [`FetchError::user_message`],
//! which never exposes network, credential, or payload detail.

use thiserror::Error;

/// Failure while talking to a provider API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The call exceeded its deadline.
    #[error("Timeout: {provider}")]
    Timeout { provider: String },

    /// Connection failure or unexpected HTTP status.
    #[error("Network failure: {provider} - {detail}")]
    NetworkFailure { provider: String, detail: String },

    /// The provider rejected our credentials (HTTP 401/403).
    #[error("Authentication failed: {provider}")]
    AuthFailure { provider: String },

    /// The provider throttled the request (HTTP 429).
    #[error("Rate limited: {provider}")]
    RateLimited { provider: String },

    /// The provider answered but refused this lookup with a 4xx status
    /// other than auth or throttling (e.g. 404 for an unknown address).
    #[error("Client error: {provider} - HTTP {status}")]
    ClientError { provider: String, status: u16 },

    /// The body could not be decoded as JSON.
    #[error("Malformed response: {provider} - {detail}")]
    MalformedResponse { provider: String, detail: String },
}

impl ProviderError {
    /// Whether a later attempt might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::NetworkFailure { .. } | Self::RateLimited { .. }
        )
    }

    /// Short message that is safe to show to callers.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "Provider did not respond in time",
            Self::NetworkFailure { .. } => "Provider is unreachable",
            Self::AuthFailure { .. } => "Provider rejected the request",
            Self::RateLimited { .. } => "Provider is rate limiting requests, try again later",
            Self::ClientError { status: 404, .. } => "Provider has no record for this address",
            Self::ClientError { .. } => "Provider could not process this lookup",
            Self::MalformedResponse { .. } => "Provider returned an invalid response",
        }
    }
}

/// Failure while mapping a raw record onto the canonical shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StandardizationError {
    /// The record is structurally corrupt around this field.
    #[error("Unparsable field: {field}")]
    UnparsableField { field: String },
}

impl StandardizationError {
    pub fn user_message(&self) -> &'static str {
        "Provider returned data in an unexpected format"
    }
}

/// Anything that can end a single provider's task in failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Standardization(#[from] StandardizationError),
}

impl FetchError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Provider(e) => e.user_message(),
            Self::Standardization(e) => e.user_message(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_retryable(),
            Self::Standardization(_) => false,
        }
    }
}
