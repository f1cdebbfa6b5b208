//! File-share volume REST calls.

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

use vpcshare_common::{ApiError, Error, ErrorEnvelope, Result, Secret};

use crate::models::{
    share_path, CreateShareRequest, ListVolumeFilters, SharePatch, Volume, VolumeList,
    API_VERSION, SHARES_PATH,
};
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// Build the query for a list call.
///
/// Each rule applies independently: `limit > 0` adds `limit`, a non-empty
/// `start` adds `start`, and every non-empty filter adds its own key.
/// `version` is always present.
pub fn list_query(
    limit: u32,
    start: Option<&str>,
    filters: Option<&ListVolumeFilters>,
) -> Vec<(String, String)> {
    let mut query = vec![("version".to_string(), API_VERSION.to_string())];

    if limit > 0 {
        query.push(("limit".to_string(), limit.to_string()));
    }

    if let Some(start) = start.filter(|s| !s.is_empty()) {
        query.push(("start".to_string(), start.to_string()));
    }

    if let Some(filters) = filters {
        let pairs = [
            ("resource_group.id", &filters.resource_group_id),
            ("tag", &filters.tag),
            ("zone.name", &filters.zone_name),
            ("name", &filters.volume_name),
        ];
        for (key, value) in pairs {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                query.push((key.to_string(), value.to_string()));
            }
        }
    }

    query
}

/// Client for the shares collection of one endpoint.
///
/// Every method issues exactly one request.
pub struct VolumeService {
    transport: Arc<dyn Transport>,
    bearer: Option<Secret>,
}

impl VolumeService {
    pub fn new(transport: Arc<dyn Transport>, bearer: Option<Secret>) -> Self {
        Self { transport, bearer }
    }

    fn request(&self, method: Method, path: impl Into<String>) -> ApiRequest {
        ApiRequest::new(method, path)
            .with_query(vec![("version".to_string(), API_VERSION.to_string())])
            .with_bearer(self.bearer.clone())
    }

    /// `POST` a new share.
    pub async fn create_volume(&self, request: &CreateShareRequest) -> Result<Volume> {
        debug!(name = %request.name, size = request.size, "Creating share");
        let body = serde_json::to_value(request)
            .map_err(|e| Error::Serialization(format!("Failed to serialize share: {}", e)))?;

        let response = self
            .transport
            .execute(self.request(Method::POST, SHARES_PATH).with_json(body))
            .await?;

        parse_json(check_response(response)?)
    }

    /// `GET` one share.
    pub async fn get_volume(&self, id: &str) -> Result<Volume> {
        debug!(volume_id = %id, "Fetching share");
        let response = self
            .transport
            .execute(self.request(Method::GET, share_path(id)))
            .await?;

        parse_json(check_response(response)?)
    }

    /// `PATCH` one share.
    pub async fn update_volume(&self, id: &str, patch: &SharePatch) -> Result<Volume> {
        debug!(volume_id = %id, "Updating share");
        let body = serde_json::to_value(patch)
            .map_err(|e| Error::Serialization(format!("Failed to serialize patch: {}", e)))?;

        let response = self
            .transport
            .execute(self.request(Method::PATCH, share_path(id)).with_json(body))
            .await?;

        parse_json(check_response(response)?)
    }

    /// `DELETE` one share.
    pub async fn delete_volume(&self, id: &str) -> Result<()> {
        debug!(volume_id = %id, "Deleting share");
        let response = self
            .transport
            .execute(self.request(Method::DELETE, share_path(id)))
            .await?;

        check_response(response).map(|_| ())
    }

    /// `GET` one page of the shares collection.
    pub async fn list_volumes(
        &self,
        limit: u32,
        start: Option<&str>,
        filters: Option<&ListVolumeFilters>,
    ) -> Result<VolumeList> {
        let query = list_query(limit, start, filters);
        debug!(?query, "Listing shares");

        let response = self
            .transport
            .execute(
                ApiRequest::new(Method::GET, SHARES_PATH)
                    .with_query(query)
                    .with_bearer(self.bearer.clone()),
            )
            .await?;

        let response = check_response(response)?;
        if response.body.is_empty() {
            return Ok(VolumeList::default());
        }
        parse_json(response)
    }
}

/// Map non-success responses onto the error vocabulary.
fn check_response(response: ApiResponse) -> Result<ApiResponse> {
    if response.status.is_success() {
        return Ok(response);
    }

    if let Some(envelope) = ErrorEnvelope::from_slice(&response.body) {
        return Err(ApiError::new(response.status.as_u16(), envelope).into());
    }

    if response.status == StatusCode::NOT_FOUND {
        Err(Error::NotFound("Resource not found".to_string()))
    } else {
        Err(Error::Network(format!(
            "API error: {} - {}",
            response.status,
            response.text()
        )))
    }
}

fn parse_json<T: DeserializeOwned>(response: ApiResponse) -> Result<T> {
    serde_json::from_slice(&response.body)
        .map_err(|e| Error::Serialization(format!("Failed to parse response: {}", e)))
}
