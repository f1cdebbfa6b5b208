//! Common types and parsing helpers used throughout vpcshare.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::reason::ReasonCode;

/// Length of the canonical hyphenated UUID form.
const UUID_HYPHENATED_LEN: usize = 36;

/// Identifier of a file-share volume.
///
/// Only the canonical hyphenated UUID shape is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VolumeId(String);

impl VolumeId {
    /// Parse a volume identifier.
    ///
    /// # Errors
    /// - Returns `ErrorInvalidVolumeId` if `id` is not a hyphenated UUID
    pub fn parse(id: impl Into<String>) -> crate::Result<Self> {
        let id = id.into();
        if !is_valid_volume_id_format(&id) {
            return Err(crate::Error::invalid(
                ReasonCode::ErrorInvalidVolumeId,
                format!("'{}' is not a valid volume ID", id),
            ));
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether `id` has the canonical `8-4-4-4-12` UUID shape.
pub fn is_valid_volume_id_format(id: &str) -> bool {
    id.len() == UUID_HYPHENATED_LEN && Uuid::parse_str(id).is_ok()
}

/// Best-effort integer parse: anything that is not a base-10 integer is 0.
///
/// Only for advisory values where 0 is a legitimate default.
pub fn to_int(value: &str) -> i32 {
    value.parse().unwrap_or(0)
}

/// 64-bit variant of [`to_int`].
pub fn to_int64(value: &str) -> i64 {
    value.parse().unwrap_or(0)
}

/// Strict parse of a strictly positive quantity such as capacity or IOPS.
///
/// # Errors
/// - Returns `InvalidInput` carrying `reason` if `value` is not a positive integer
pub fn parse_positive(field: &str, value: &str, reason: ReasonCode) -> crate::Result<i64> {
    match value.trim().parse::<i64>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        Ok(parsed) => Err(crate::Error::invalid(
            reason,
            format!("{} must be positive, got {}", field, parsed),
        )),
        Err(e) => Err(crate::Error::invalid(
            reason,
            format!("{} is not a number ('{}'): {}", field, value, e),
        )),
    }
}

/// Secret string (API key, bearer token) that zeroizes on drop.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the secret value. Keep the borrow short.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret([REDACTED; {} chars])", self.0.len())
    }
}
