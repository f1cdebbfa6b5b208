//! Domain volume types and their mapping to and from the wire models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use vpcshare_client::{
    CreateShareRequest, EncryptionKeyRef, ListVolumeFilters, Profile, ResourceGroup, Volume, Zone,
};
use vpcshare_common::{parse_positive, to_int, Error, ReasonCode, Result};

/// Profile used when the caller does not name one.
pub const DEFAULT_PROFILE: &str = "dp2";

/// Lifecycle state reported by the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeStatus {
    Available,
    Stable,
    Pending,
    Updating,
    Deleting,
    Failed,
    Unknown(String),
}

impl VolumeStatus {
    pub fn from_state(state: &str) -> Self {
        match state {
            "available" => VolumeStatus::Available,
            "stable" => VolumeStatus::Stable,
            "pending" => VolumeStatus::Pending,
            "updating" => VolumeStatus::Updating,
            "deleting" => VolumeStatus::Deleting,
            "failed" => VolumeStatus::Failed,
            other => VolumeStatus::Unknown(other.to_string()),
        }
    }

    /// Whether a volume in this state can be handed to a caller.
    pub fn is_usable(&self) -> bool {
        matches!(self, VolumeStatus::Available | VolumeStatus::Stable)
    }

    /// Whether the volume can never become usable from this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, VolumeStatus::Failed | VolumeStatus::Deleting)
    }

    pub fn as_str(&self) -> &str {
        match self {
            VolumeStatus::Available => "available",
            VolumeStatus::Stable => "stable",
            VolumeStatus::Pending => "pending",
            VolumeStatus::Updating => "updating",
            VolumeStatus::Deleting => "deleting",
            VolumeStatus::Failed => "failed",
            VolumeStatus::Unknown(state) => state,
        }
    }
}

impl fmt::Display for VolumeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for VolumeStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A file-share volume as seen by callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeRecord {
    pub id: String,
    pub name: String,
    /// Capacity in GiB.
    pub capacity: i64,
    pub iops: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
    pub zone: Option<String>,
    pub status: VolumeStatus,
    pub resource_group: Option<String>,
    pub encryption_key_crn: Option<String>,
    pub profile: Option<String>,
    pub crn: Option<String>,
    pub tags: Vec<String>,
}

impl From<Volume> for VolumeRecord {
    fn from(volume: Volume) -> Self {
        Self {
            status: VolumeStatus::from_state(&volume.status),
            id: volume.id,
            name: volume.name,
            capacity: volume.capacity,
            iops: volume.iops,
            created_at: volume.created_at,
            zone: volume.zone.map(|z| z.name),
            resource_group: volume.resource_group.map(|rg| rg.id).filter(|id| !id.is_empty()),
            encryption_key_crn: volume.encryption_key.map(|k| k.crn),
            profile: volume.profile.map(|p| p.name),
            crn: volume.crn,
            tags: volume.user_tags,
        }
    }
}

/// Caller-supplied description of a volume to create.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct VolumeSpec {
    pub name: Option<String>,
    /// Capacity in GiB. Must be present and positive.
    pub capacity: Option<i64>,
    pub iops: Option<i64>,
    pub profile: Option<String>,
    pub zone: Option<String>,
    pub resource_group_id: Option<String>,
    pub encryption_key_crn: Option<String>,
    pub tags: Vec<String>,
}

impl VolumeSpec {
    pub fn new(name: impl Into<String>, capacity: i64) -> Self {
        Self {
            name: Some(name.into()),
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    /// Build from string parameters.
    ///
    /// Recognized keys: `capacity`, `iops`, `profile`, `zone`,
    /// `resource_group`, `encryption_key`, `tags` (comma-separated).
    ///
    /// # Errors
    /// - `capacity` or `iops` is present but not a positive integer
    pub fn from_parameters(name: impl Into<String>, parameters: &HashMap<String, String>) -> Result<Self> {
        let text = |key: &str| {
            parameters
                .get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let capacity = text("capacity")
            .map(|v| parse_positive("capacity", &v, ReasonCode::ErrorInvalidCapacity))
            .transpose()?;
        let iops = text("iops")
            .map(|v| parse_positive("iops", &v, ReasonCode::ErrorInvalidIops))
            .transpose()?;

        let tags = text("tags")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            name: Some(name.into()),
            capacity,
            iops,
            profile: text("profile"),
            zone: text("zone"),
            resource_group_id: text("resource_group"),
            encryption_key_crn: text("encryption_key"),
            tags,
        })
    }

    /// Check required fields without touching the network.
    ///
    /// # Errors
    /// - `ErrorRequiredFieldMissing` when name or capacity is absent
    /// - `ErrorInvalidVolumeName` when the name is blank
    /// - `ErrorInvalidCapacity` / `ErrorInvalidIops` for non-positive values
    pub fn validate(&self) -> Result<()> {
        match self.name.as_deref() {
            None => {
                return Err(Error::invalid(
                    ReasonCode::ErrorRequiredFieldMissing,
                    "volume name is required",
                ))
            }
            Some(name) if name.trim().is_empty() => {
                return Err(Error::invalid(
                    ReasonCode::ErrorInvalidVolumeName,
                    "volume name must not be empty",
                ))
            }
            Some(_) => {}
        }

        match self.capacity {
            None => {
                return Err(Error::invalid(
                    ReasonCode::ErrorRequiredFieldMissing,
                    "volume capacity is required",
                ))
            }
            Some(capacity) if capacity <= 0 => {
                return Err(Error::invalid(
                    ReasonCode::ErrorInvalidCapacity,
                    format!("volume capacity must be positive, got {}", capacity),
                ))
            }
            Some(_) => {}
        }

        if let Some(iops) = self.iops.filter(|iops| *iops <= 0) {
            return Err(Error::invalid(
                ReasonCode::ErrorInvalidIops,
                format!("volume iops must be positive, got {}", iops),
            ));
        }

        Ok(())
    }

    /// Validate and convert into the create payload.
    pub fn to_create_request(&self) -> Result<CreateShareRequest> {
        self.validate()?;

        let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());

        Ok(CreateShareRequest {
            name: self.name.clone().unwrap_or_default(),
            size: self.capacity.unwrap_or_default(),
            profile: Profile {
                name: non_empty(&self.profile).unwrap_or_else(|| DEFAULT_PROFILE.to_string()),
            },
            iops: self.iops,
            zone: non_empty(&self.zone).map(|name| Zone { name }),
            resource_group: non_empty(&self.resource_group_id).map(|id| ResourceGroup {
                id,
                name: String::new(),
            }),
            encryption_key: non_empty(&self.encryption_key_crn).map(|crn| EncryptionKeyRef { crn }),
            user_tags: self.tags.clone(),
        })
    }
}

/// Paging and filter arguments for a list call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListQuery {
    /// Page size; 0 means "upstream default".
    pub limit: u32,
    pub start: Option<String>,
    pub filters: ListVolumeFilters,
}

impl ListQuery {
    /// Build a query from string parameters.
    ///
    /// `limit` is advisory: anything that is not a positive number means no
    /// limit. Recognized keys: `limit`, `start`, `resource_group`, `tag`,
    /// `zone`, `name`.
    pub fn from_parameters(parameters: &HashMap<String, String>) -> Self {
        let text = |key: &str| parameters.get(key).cloned().filter(|v| !v.is_empty());

        let limit = parameters
            .get("limit")
            .map(|v| to_int(v.trim()))
            .filter(|limit| *limit > 0)
            .map(|limit| limit as u32)
            .unwrap_or(0);

        Self {
            limit,
            start: text("start"),
            filters: ListVolumeFilters {
                resource_group_id: text("resource_group"),
                tag: text("tag"),
                zone_name: text("zone"),
                volume_name: text("name"),
            },
        }
    }
}

/// One page of list results.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct VolumePage {
    pub volumes: Vec<VolumeRecord>,
    /// Cursor to pass back as `start` for the next page.
    pub next: Option<String>,
}

/// Result of a delete call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    /// The volume did not exist; nothing was removed.
    AlreadyAbsent,
}
