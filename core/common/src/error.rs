//! Common error types for vpcshare.

use thiserror::Error;

use crate::envelope::{ApiError, ErrorEnvelope};
use crate::reason::ReasonCode;

/// Top-level error type for provider and volume operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Requested provider identity is absent from the registry.
    #[error("Provider '{0}' is not registered")]
    NotRegistered(String),

    /// Every provider sub-config was absent or disabled.
    #[error("no providers registered")]
    NoProviders,

    /// Resource already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// No configured authentication scheme matches the provider.
    #[error("Insufficient authentication credentials: {0}")]
    InsufficientAuthentication(String),

    /// Token exchange or credential lookup failed.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Configuration could not be loaded or is inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request rejected before any network call.
    #[error("Invalid input ({reason}): {message}")]
    InvalidInput { reason: ReasonCode, message: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Volume exists but is not usable yet.
    #[error("Volume {id} is not ready (status: {status})")]
    NotReady { id: String, status: String },

    /// Volume reached a state it can never leave for a usable one.
    #[error("Volume {id} is unusable (status: {status})")]
    VolumeFailed { id: String, status: String },

    /// Upstream API error with a parsed envelope.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// Transport failure or unparseable upstream response.
    #[error("Network error: {0}")]
    Network(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation was cancelled by the caller.
    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Validation error with an explicit reason code.
    pub fn invalid(reason: ReasonCode, message: impl Into<String>) -> Self {
        Error::InvalidInput {
            reason,
            message: message.into(),
        }
    }

    /// Stable reason code for branching without string matching.
    pub fn reason_code(&self) -> ReasonCode {
        match self {
            Error::NotRegistered(_) => ReasonCode::ErrorProviderNotRegistered,
            Error::NoProviders => ReasonCode::ErrorNoProviders,
            Error::AlreadyExists(_) => ReasonCode::ErrorDuplicateProvider,
            Error::InsufficientAuthentication(_) => ReasonCode::ErrorInsufficientAuthentication,
            Error::Authentication(_) => ReasonCode::ErrorAuthenticationFailed,
            Error::Config(_) | Error::Io(_) => ReasonCode::ErrorConfiguration,
            Error::InvalidInput { reason, .. } => *reason,
            Error::NotFound(_) => ReasonCode::ErrorVolumeNotFound,
            Error::NotReady { .. } => ReasonCode::ErrorVolumeNotReady,
            Error::VolumeFailed { .. } => ReasonCode::ErrorVolumeFailed,
            Error::Api(err) => err.reason_code(),
            Error::Network(_) => ReasonCode::ErrorTransport,
            Error::Serialization(_) => ReasonCode::ErrorSerialization,
            Error::Cancelled => ReasonCode::ErrorCancelled,
        }
    }

    /// Upstream envelope, when this error came from one.
    pub fn envelope(&self) -> Option<&ErrorEnvelope> {
        match self {
            Error::Api(err) => Some(&err.envelope),
            _ => None,
        }
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_codes() {
        assert_eq!(
            Error::NotRegistered("vpc-file".to_string()).reason_code(),
            ReasonCode::ErrorProviderNotRegistered
        );
        assert_eq!(Error::NoProviders.reason_code(), ReasonCode::ErrorNoProviders);
        assert_eq!(
            Error::invalid(ReasonCode::ErrorInvalidCapacity, "zero").reason_code(),
            ReasonCode::ErrorInvalidCapacity
        );
        assert_eq!(
            Error::Network("reset".to_string()).reason_code(),
            ReasonCode::ErrorTransport
        );
    }

    #[test]
    fn test_api_error_preserves_upstream_reason() {
        let err: Error = ApiError::new(429, ErrorEnvelope::single("too_many_requests", "slow down")).into();

        assert_eq!(err.reason_code(), ReasonCode::ErrorRateLimited);
        assert_eq!(err.envelope().and_then(|e| e.first_code()), Some("too_many_requests"));
    }

    #[test]
    fn test_no_providers_message() {
        assert_eq!(Error::NoProviders.to_string(), "no providers registered");
    }
}
