//! Stable domain reason codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain-level error classifier, independent of upstream wording.
///
/// Every known upstream error code maps onto exactly one variant through
/// [`ReasonCode::from_upstream`]. Anything the table does not know about
/// lands on [`ReasonCode::ErrorUnclassified`], which is retryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReasonCode {
    ErrorUnclassified,
    ErrorProviderNotRegistered,
    ErrorNoProviders,
    ErrorDuplicateProvider,
    ErrorInsufficientAuthentication,
    ErrorAuthenticationFailed,
    ErrorConfiguration,
    ErrorRequiredFieldMissing,
    ErrorInvalidVolumeId,
    ErrorInvalidVolumeName,
    ErrorVolumeNameConflict,
    ErrorInvalidCapacity,
    ErrorInvalidIops,
    ErrorInvalidProfile,
    ErrorVolumeNotFound,
    ErrorVolumeNotReady,
    ErrorVolumeFailed,
    ErrorQuotaExceeded,
    ErrorRateLimited,
    ErrorUpstreamInternal,
    ErrorServiceUnavailable,
    ErrorTransport,
    ErrorSerialization,
    ErrorCancelled,
}

/// Upstream error codes known to the client, one entry per code.
const UPSTREAM_CODES: &[(&str, ReasonCode)] = &[
    ("validation_invalid_name", ReasonCode::ErrorInvalidVolumeName),
    ("shares_duplicate_name", ReasonCode::ErrorVolumeNameConflict),
    ("volume_id_invalid", ReasonCode::ErrorInvalidVolumeId),
    ("volume_capacity_max", ReasonCode::ErrorInvalidCapacity),
    ("volume_capacity_zero_or_negative", ReasonCode::ErrorInvalidCapacity),
    ("shares_profile_capacity_iops_invalid", ReasonCode::ErrorInvalidIops),
    ("volume_profile_iops_invalid", ReasonCode::ErrorInvalidIops),
    ("shares_profile_not_found", ReasonCode::ErrorInvalidProfile),
    ("missing_field", ReasonCode::ErrorRequiredFieldMissing),
    ("not_found", ReasonCode::ErrorVolumeNotFound),
    ("shares_not_found", ReasonCode::ErrorVolumeNotFound),
    ("over_quota", ReasonCode::ErrorQuotaExceeded),
    ("too_many_requests", ReasonCode::ErrorRateLimited),
    ("internal_error", ReasonCode::ErrorUpstreamInternal),
    ("invalid_route", ReasonCode::ErrorUpstreamInternal),
    ("service_unavailable", ReasonCode::ErrorServiceUnavailable),
];

impl ReasonCode {
    /// Map a raw upstream error code onto the domain vocabulary.
    pub fn from_upstream(code: &str) -> Self {
        UPSTREAM_CODES
            .iter()
            .find(|(upstream, _)| *upstream == code)
            .map(|(_, reason)| *reason)
            .unwrap_or(ReasonCode::ErrorUnclassified)
    }

    /// Whether a failure with this code can never succeed without the caller
    /// changing its request.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReasonCode::ErrorRequiredFieldMissing
                | ReasonCode::ErrorInvalidVolumeId
                | ReasonCode::ErrorInvalidVolumeName
                | ReasonCode::ErrorVolumeNameConflict
                | ReasonCode::ErrorInvalidCapacity
                | ReasonCode::ErrorInvalidIops
                | ReasonCode::ErrorInvalidProfile
                | ReasonCode::ErrorVolumeNotFound
                | ReasonCode::ErrorVolumeFailed
        )
    }

    /// Stable string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::ErrorUnclassified => "ErrorUnclassified",
            ReasonCode::ErrorProviderNotRegistered => "ErrorProviderNotRegistered",
            ReasonCode::ErrorNoProviders => "ErrorNoProviders",
            ReasonCode::ErrorDuplicateProvider => "ErrorDuplicateProvider",
            ReasonCode::ErrorInsufficientAuthentication => "ErrorInsufficientAuthentication",
            ReasonCode::ErrorAuthenticationFailed => "ErrorAuthenticationFailed",
            ReasonCode::ErrorConfiguration => "ErrorConfiguration",
            ReasonCode::ErrorRequiredFieldMissing => "ErrorRequiredFieldMissing",
            ReasonCode::ErrorInvalidVolumeId => "ErrorInvalidVolumeId",
            ReasonCode::ErrorInvalidVolumeName => "ErrorInvalidVolumeName",
            ReasonCode::ErrorVolumeNameConflict => "ErrorVolumeNameConflict",
            ReasonCode::ErrorInvalidCapacity => "ErrorInvalidCapacity",
            ReasonCode::ErrorInvalidIops => "ErrorInvalidIops",
            ReasonCode::ErrorInvalidProfile => "ErrorInvalidProfile",
            ReasonCode::ErrorVolumeNotFound => "ErrorVolumeNotFound",
            ReasonCode::ErrorVolumeNotReady => "ErrorVolumeNotReady",
            ReasonCode::ErrorVolumeFailed => "ErrorVolumeFailed",
            ReasonCode::ErrorQuotaExceeded => "ErrorQuotaExceeded",
            ReasonCode::ErrorRateLimited => "ErrorRateLimited",
            ReasonCode::ErrorUpstreamInternal => "ErrorUpstreamInternal",
            ReasonCode::ErrorServiceUnavailable => "ErrorServiceUnavailable",
            ReasonCode::ErrorTransport => "ErrorTransport",
            ReasonCode::ErrorSerialization => "ErrorSerialization",
            ReasonCode::ErrorCancelled => "ErrorCancelled",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
