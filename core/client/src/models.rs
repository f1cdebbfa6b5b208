//! Wire models for the file-share REST API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Fixed API version sent with every request.
pub const API_VERSION: &str = "2023-07-11";

/// Shares collection path.
pub const SHARES_PATH: &str = "/v1/shares";

/// Item path for one share.
pub fn share_path(id: &str) -> String {
    format!("{}/{}", SHARES_PATH, id)
}

/// Zone reference.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
}

/// Resource group reference.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceGroup {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

/// Share profile reference.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
}

/// Customer-managed encryption key reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionKeyRef {
    pub crn: String,
}

/// Link to another page of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Href {
    pub href: String,
}

/// File share as returned by the API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Volume {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Capacity in GiB.
    #[serde(default, rename = "size")]
    pub capacity: i64,
    #[serde(default)]
    pub iops: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub zone: Option<Zone>,
    #[serde(default, rename = "lifecycle_state")]
    pub status: String,
    #[serde(default)]
    pub resource_group: Option<ResourceGroup>,
    #[serde(default)]
    pub encryption_key: Option<EncryptionKeyRef>,
    #[serde(default)]
    pub profile: Option<Profile>,
    #[serde(default)]
    pub crn: Option<String>,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub user_tags: Vec<String>,
}

/// Share creation payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateShareRequest {
    pub name: String,
    pub size: i64,
    pub profile: Profile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iops: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<Zone>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<ResourceGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_key: Option<EncryptionKeyRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub user_tags: Vec<String>,
}

/// Share update payload. Absent fields are left untouched upstream.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SharePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iops: Option<i64>,
}

/// One page of the shares collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolumeList {
    #[serde(default)]
    pub shares: Vec<Volume>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub first: Option<Href>,
    #[serde(default)]
    pub next: Option<Href>,
    #[serde(default)]
    pub total_count: Option<u32>,
}

impl VolumeList {
    /// Continuation cursor taken from the `start` parameter of `next.href`.
    pub fn next_start(&self) -> Option<String> {
        let href = &self.next.as_ref()?.href;
        let url = Url::parse(href)
            .or_else(|_| Url::parse("http://localhost/").and_then(|base| base.join(href)))
            .ok()?;
        url.query_pairs()
            .find(|(key, _)| key == "start")
            .map(|(_, value)| value.into_owned())
            .filter(|start| !start.is_empty())
    }
}

/// Optional predicates for list calls.
///
/// `None` and empty strings both mean "no constraint"; neither is sent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListVolumeFilters {
    #[serde(default)]
    pub resource_group_id: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub zone_name: Option<String>,
    #[serde(default)]
    pub volume_name: Option<String>,
}

impl ListVolumeFilters {
    /// Filter on volume name only.
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            volume_name: Some(name.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_deserialization() {
        let json = r#"{
            "id": "34c3ad36-34d9-4d3a-8463-5a176c75801c",
            "name": "share-1",
            "size": 10,
            "iops": 1000,
            "created_at": "2024-03-01T10:00:00Z",
            "zone": {"name": "us-south-1"},
            "lifecycle_state": "stable",
            "resource_group": {"id": "rg1", "name": "default"},
            "profile": {"name": "dp2"}
        }"#;

        let volume: Volume = serde_json::from_str(json).unwrap();
        assert_eq!(volume.capacity, 10);
        assert_eq!(volume.iops, Some(1000));
        assert_eq!(volume.status, "stable");
        assert_eq!(volume.zone.unwrap().name, "us-south-1");
        assert!(volume.encryption_key.is_none());
    }

    #[test]
    fn test_create_request_omits_absent_fields() {
        let request = CreateShareRequest {
            name: "share-1".to_string(),
            size: 10,
            profile: Profile { name: "dp2".to_string() },
            iops: None,
            zone: None,
            resource_group: None,
            encryption_key: None,
            user_tags: vec![],
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"name": "share-1", "size": 10, "profile": {"name": "dp2"}})
        );
    }

    #[test]
    fn test_next_start_from_absolute_href() {
        let list = VolumeList {
            next: Some(Href {
                href: "https://us-south.iaas.cloud.ibm.com/v1/shares?limit=2&start=r006-abc".to_string(),
            }),
            ..VolumeList::default()
        };
        assert_eq!(list.next_start().as_deref(), Some("r006-abc"));
    }

    #[test]
    fn test_next_start_from_relative_href() {
        let list = VolumeList {
            next: Some(Href {
                href: "/v1/shares?start=x-y-z".to_string(),
            }),
            ..VolumeList::default()
        };
        assert_eq!(list.next_start().as_deref(), Some("x-y-z"));
    }

    #[test]
    fn test_no_next_page() {
        assert!(VolumeList::default().next_start().is_none());
    }
}
