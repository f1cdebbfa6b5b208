//! File-share session: validated volume operations under a retry policy.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

use vpcshare_client::{ListVolumeFilters, SharePatch, VolumeService};
use vpcshare_common::{Error, ReasonCode, Result, VolumeId};

use crate::provider::Session;
use crate::retry::{retry, RetryPolicy};
use crate::volume::{DeleteOutcome, VolumePage, VolumeRecord, VolumeSpec};

/// Session bound to one provider identity and one bearer token.
pub struct FileSession {
    provider_name: String,
    service: VolumeService,
    retry_policy: RetryPolicy,
}

impl FileSession {
    pub fn new(provider_name: impl Into<String>, service: VolumeService, retry_policy: RetryPolicy) -> Self {
        Self {
            provider_name: provider_name.into(),
            service,
            retry_policy,
        }
    }

    /// Poll a volume until it reports a usable status.
    ///
    /// Each poll is one retry attempt. A transitional status counts as a
    /// retryable `ErrorVolumeNotReady` failure; `failed` and `deleting` end
    /// the wait with `ErrorVolumeFailed`.
    pub async fn wait_for_available(&self, id: &str) -> Result<VolumeRecord> {
        let service = &self.service;
        retry(&self.retry_policy, move || async move {
            let record = VolumeRecord::from(service.get_volume(id).await?);
            debug!(volume_id = %id, status = %record.status, "Polled volume");
            ensure_usable(record)
        })
        .await
    }
}

/// Pass a usable volume through, otherwise classify why it is not.
fn ensure_usable(record: VolumeRecord) -> Result<VolumeRecord> {
    if record.status.is_usable() {
        return Ok(record);
    }

    let status = record.status.to_string();
    if record.status.is_terminal() {
        Err(Error::VolumeFailed {
            id: record.id,
            status,
        })
    } else {
        Err(Error::NotReady {
            id: record.id,
            status,
        })
    }
}

#[async_trait]
impl Session for FileSession {
    fn provider_name(&self) -> &str {
        &self.provider_name
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    fn set_retry_parameters(&mut self, max_attempts: u32, delay: Duration) -> Result<()> {
        self.retry_policy = RetryPolicy::new(max_attempts, delay)?;
        debug!(
            provider = %self.provider_name,
            max_attempts,
            ?delay,
            "Updated session retry policy"
        );
        Ok(())
    }

    async fn create_volume(&self, spec: &VolumeSpec) -> Result<VolumeRecord> {
        let request = spec.to_create_request()?;
        info!(
            provider = %self.provider_name,
            name = %request.name,
            capacity = request.size,
            "Creating volume"
        );

        let service = &self.service;
        let request = &request;
        let created = VolumeRecord::from(
            retry(&self.retry_policy, move || service.create_volume(request)).await?,
        );

        if created.status.is_usable() || created.status.is_terminal() {
            return ensure_usable(created);
        }

        debug!(volume_id = %created.id, status = %created.status, "Waiting for new volume");
        self.wait_for_available(&created.id).await
    }

    async fn get_volume(&self, id: &str) -> Result<VolumeRecord> {
        let id = VolumeId::parse(id)?;
        let id = id.as_str();
        let service = &self.service;
        let volume = retry(&self.retry_policy, move || service.get_volume(id)).await?;
        Ok(volume.into())
    }

    async fn expand_volume(&self, id: &str, capacity: i64) -> Result<VolumeRecord> {
        let id = VolumeId::parse(id)?;
        if capacity <= 0 {
            return Err(Error::invalid(
                ReasonCode::ErrorInvalidCapacity,
                format!("volume capacity must be positive, got {}", capacity),
            ));
        }
        info!(provider = %self.provider_name, volume_id = %id, capacity, "Expanding volume");

        let patch = SharePatch {
            size: Some(capacity),
            ..SharePatch::default()
        };
        let id = id.as_str();
        let service = &self.service;
        let patch = &patch;
        let volume = retry(&self.retry_policy, move || service.update_volume(id, patch)).await?;
        Ok(volume.into())
    }

    async fn delete_volume(&self, id: &str) -> Result<DeleteOutcome> {
        let id = VolumeId::parse(id)?;
        info!(provider = %self.provider_name, volume_id = %id, "Deleting volume");

        let id = id.as_str();
        let service = &self.service;
        match retry(&self.retry_policy, move || service.delete_volume(id)).await {
            Ok(()) => Ok(DeleteOutcome::Deleted),
            Err(err) if err.reason_code() == ReasonCode::ErrorVolumeNotFound => {
                debug!(volume_id = %id, "Volume already absent");
                Ok(DeleteOutcome::AlreadyAbsent)
            }
            Err(err) => Err(err),
        }
    }

    async fn list_volumes(
        &self,
        limit: u32,
        start: Option<&str>,
        filters: &ListVolumeFilters,
    ) -> Result<VolumePage> {
        let service = &self.service;
        let list = retry(&self.retry_policy, move || {
            service.list_volumes(limit, start, Some(filters))
        })
        .await?;

        let next = list.next_start();
        Ok(VolumePage {
            volumes: list.shares.into_iter().map(VolumeRecord::from).collect(),
            next,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::VolumeStatus;
    use reqwest::{Method, StatusCode};
    use std::sync::Arc;
    use vpcshare_client::{MockTransport, RequestBody};
    use vpcshare_common::Secret;

    const VOLUME_ID: &str = "34c3ad36-34d9-4d3a-8463-5a176c75801c";

    fn session(transport: &Arc<MockTransport>, max_attempts: u32) -> FileSession {
        FileSession::new(
            "vpc-file",
            VolumeService::new(transport.clone(), Some(Secret::new("token"))),
            RetryPolicy::new(max_attempts, Duration::from_millis(1)).unwrap(),
        )
    }

    fn share(state: &str) -> serde_json::Value {
        serde_json::json!({
            "id": VOLUME_ID,
            "name": "share-1",
            "size": 10,
            "lifecycle_state": state
        })
    }

    #[tokio::test]
    async fn test_create_without_positive_capacity_sends_nothing() {
        let transport = Arc::new(MockTransport::new());
        let session = session(&transport, 3);

        let result = session.create_volume(&VolumeSpec::new("share-1", 0)).await;
        assert_eq!(
            result.unwrap_err().reason_code(),
            ReasonCode::ErrorInvalidCapacity
        );

        let spec = VolumeSpec {
            name: Some("share-1".to_string()),
            ..VolumeSpec::default()
        };
        assert!(session.create_volume(&spec).await.is_err());
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_create_returns_usable_volume_immediately() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(StatusCode::CREATED, &share("stable"));

        let record = session(&transport, 3)
            .create_volume(&VolumeSpec::new("share-1", 10))
            .await
            .unwrap();

        assert_eq!(record.id, VOLUME_ID);
        assert_eq!(record.status, VolumeStatus::Stable);
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_create_waits_for_pending_volume() {
        let transport = Arc::new(MockTransport::new());
        transport
            .push_json(StatusCode::CREATED, &share("pending"))
            .push_json(StatusCode::OK, &share("pending"))
            .push_json(StatusCode::OK, &share("available"));

        let record = session(&transport, 3)
            .create_volume(&VolumeSpec::new("share-1", 10))
            .await
            .unwrap();

        assert_eq!(record.status, VolumeStatus::Available);
        let methods: Vec<_> = transport.requests().into_iter().map(|r| r.method).collect();
        assert_eq!(methods, vec![Method::POST, Method::GET, Method::GET]);
    }

    #[tokio::test]
    async fn test_create_of_never_ready_volume_is_an_error() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(StatusCode::CREATED, &share("pending"));
        transport.set_fallback(StatusCode::OK, share("pending").to_string());

        let err = session(&transport, 2)
            .create_volume(&VolumeSpec::new("share-1", 10))
            .await
            .unwrap_err();

        assert_eq!(err.reason_code(), ReasonCode::ErrorVolumeNotReady);
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn test_create_of_failed_volume_stops_immediately() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(StatusCode::CREATED, &share("failed"));
        transport.set_fallback(StatusCode::OK, share("failed").to_string());

        let err = session(&transport, 5)
            .create_volume(&VolumeSpec::new("share-1", 10))
            .await
            .unwrap_err();

        assert_eq!(err.reason_code(), ReasonCode::ErrorVolumeFailed);
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_volume_failing_while_pending_stops_polling() {
        let transport = Arc::new(MockTransport::new());
        transport
            .push_json(StatusCode::CREATED, &share("pending"))
            .push_json(StatusCode::OK, &share("pending"));
        transport.set_fallback(StatusCode::OK, share("failed").to_string());

        let err = session(&transport, 5)
            .create_volume(&VolumeSpec::new("share-1", 10))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::VolumeFailed { ref status, .. } if status == "failed"));
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn test_create_retries_transient_failure() {
        let transport = Arc::new(MockTransport::new());
        transport
            .push_network_failure("connection reset")
            .push_json(StatusCode::CREATED, &share("stable"));

        let record = session(&transport, 3)
            .create_volume(&VolumeSpec::new("share-1", 10))
            .await
            .unwrap();

        assert_eq!(record.name, "share-1");
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_create_terminal_error_is_not_retried() {
        let transport = Arc::new(MockTransport::new());
        transport.set_fallback(
            StatusCode::BAD_REQUEST,
            r#"{"errors":[{"code":"validation_invalid_name","message":"bad name"}],"trace":"t"}"#,
        );

        let err = session(&transport, 5)
            .create_volume(&VolumeSpec::new("Share_1", 10))
            .await
            .unwrap_err();

        assert_eq!(err.reason_code(), ReasonCode::ErrorInvalidVolumeName);
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_get_rejects_malformed_id_before_request() {
        let transport = Arc::new(MockTransport::new());
        let err = session(&transport, 3).get_volume("test-id").await.unwrap_err();

        assert_eq!(err.reason_code(), ReasonCode::ErrorInvalidVolumeId);
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_get_missing_volume() {
        let transport = Arc::new(MockTransport::new());
        transport.set_fallback(
            StatusCode::NOT_FOUND,
            r#"{"errors":[{"code":"shares_not_found","message":"Share not found"}],"trace":"t"}"#,
        );

        let err = session(&transport, 3).get_volume(VOLUME_ID).await.unwrap_err();
        assert_eq!(err.reason_code(), ReasonCode::ErrorVolumeNotFound);
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_absent_volume_is_not_retried() {
        let transport = Arc::new(MockTransport::new());
        transport.set_fallback(StatusCode::NOT_FOUND, "");

        let session = session(&transport, 5);
        assert_eq!(
            session.delete_volume(VOLUME_ID).await.unwrap(),
            DeleteOutcome::AlreadyAbsent
        );
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_not_found_with_unlisted_code_is_not_retried() {
        let transport = Arc::new(MockTransport::new());
        transport.set_fallback(
            StatusCode::NOT_FOUND,
            r#"{"errors":[{"code":"share_gone","message":"gone"}],"trace":"t"}"#,
        );

        let err = session(&transport, 5).get_volume(VOLUME_ID).await.unwrap_err();
        assert_eq!(err.reason_code(), ReasonCode::ErrorVolumeNotFound);
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_delete_outcomes() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(StatusCode::NO_CONTENT, "");
        transport.push_response(
            StatusCode::NOT_FOUND,
            r#"{"errors":[{"code":"shares_not_found","message":"Share not found"}]}"#,
        );

        let session = session(&transport, 3);
        assert_eq!(session.delete_volume(VOLUME_ID).await.unwrap(), DeleteOutcome::Deleted);
        assert_eq!(
            session.delete_volume(VOLUME_ID).await.unwrap(),
            DeleteOutcome::AlreadyAbsent
        );
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_expand_sends_size_patch() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(
            StatusCode::OK,
            &serde_json::json!({"id": VOLUME_ID, "name": "share-1", "size": 40, "lifecycle_state": "updating"}),
        );

        let session = session(&transport, 3);
        let record = session.expand_volume(VOLUME_ID, 40).await.unwrap();
        assert_eq!(record.capacity, 40);

        let sent = transport.last_request().unwrap();
        assert_eq!(sent.method, Method::PATCH);
        assert_eq!(sent.body, Some(RequestBody::Json(serde_json::json!({"size": 40}))));

        let err = session.expand_volume(VOLUME_ID, 0).await.unwrap_err();
        assert_eq!(err.reason_code(), ReasonCode::ErrorInvalidCapacity);
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_list_maps_page_and_cursor() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(
            StatusCode::OK,
            &serde_json::json!({
                "shares": [share("stable")],
                "next": {"href": "https://example.test/v1/shares?start=page2"}
            }),
        );

        let page = session(&transport, 3)
            .list_volumes(1, None, &ListVolumeFilters::default())
            .await
            .unwrap();

        assert_eq!(page.volumes.len(), 1);
        assert_eq!(page.next.as_deref(), Some("page2"));
    }

    #[tokio::test]
    async fn test_list_all_follows_cursors() {
        let transport = Arc::new(MockTransport::new());
        transport
            .push_json(
                StatusCode::OK,
                &serde_json::json!({
                    "shares": [share("stable")],
                    "next": {"href": "/v1/shares?start=page2"}
                }),
            )
            .push_json(
                StatusCode::OK,
                &serde_json::json!({"shares": [share("available")]}),
            );

        let volumes = session(&transport, 3)
            .list_all_volumes(&ListVolumeFilters::default())
            .await
            .unwrap();

        assert_eq!(volumes.len(), 2);
        let requests = transport.requests();
        assert_eq!(requests[1].query_map().get("start").map(String::as_str), Some("page2"));
    }

    #[tokio::test]
    async fn test_list_all_stops_on_repeated_cursor() {
        let transport = Arc::new(MockTransport::new());
        transport.set_fallback(
            StatusCode::OK,
            serde_json::json!({
                "shares": [share("stable")],
                "next": {"href": "/v1/shares?start=stuck"}
            })
            .to_string(),
        );

        let volumes = session(&transport, 3)
            .list_all_volumes(&ListVolumeFilters::default())
            .await
            .unwrap();

        assert_eq!(volumes.len(), 2);
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_get_volume_by_name() {
        let transport = Arc::new(MockTransport::new());
        transport
            .push_json(StatusCode::OK, &serde_json::json!({"shares": [share("stable")]}))
            .push_json(StatusCode::OK, &serde_json::json!({"shares": []}));

        let session = session(&transport, 3);
        let record = session.get_volume_by_name("share-1").await.unwrap();
        assert_eq!(record.id, VOLUME_ID);
        assert_eq!(
            transport.last_request().unwrap().query_map().get("name").map(String::as_str),
            Some("share-1")
        );

        let err = session.get_volume_by_name("share-1").await.unwrap_err();
        assert_eq!(err.reason_code(), ReasonCode::ErrorVolumeNotFound);
    }

    #[tokio::test]
    async fn test_retry_parameters_are_per_session() {
        let transport = Arc::new(MockTransport::new());
        let mut first = session(&transport, 3);
        let second = session(&transport, 3);

        first
            .set_retry_parameters(7, Duration::from_secs(2))
            .unwrap();
        assert_eq!(first.retry_policy().max_attempts(), 7);
        assert_eq!(second.retry_policy().max_attempts(), 3);

        assert!(first.set_retry_parameters(0, Duration::ZERO).is_err());
        assert_eq!(first.retry_policy().max_attempts(), 7);
    }
}
