//! Provider and session trait definitions.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use vpcshare_client::ListVolumeFilters;
use vpcshare_common::{Error, ReasonCode, Result};

use crate::credentials::{ContextCredentials, ContextCredentialsFactory};
use crate::retry::RetryPolicy;
use crate::volume::{DeleteOutcome, VolumePage, VolumeRecord, VolumeSpec};

/// A registered provider implementation.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider identity (e.g., "vpc-file").
    fn name(&self) -> &str;

    /// Capability for producing context credentials.
    fn context_credentials_factory(&self) -> Result<Arc<dyn ContextCredentialsFactory>>;

    /// Open a session with resolved (or deferred) credentials.
    ///
    /// # Errors
    /// - Credentials are expired or cannot be completed
    async fn open_session(&self, credentials: ContextCredentials) -> Result<Box<dyn Session>>;
}

/// A live handle bound to one provider identity and its credentials.
///
/// Validation happens before any request; network calls are wrapped in the
/// session's retry policy.
#[async_trait]
pub trait Session: Send + Sync {
    fn provider_name(&self) -> &str;

    fn retry_policy(&self) -> RetryPolicy;

    /// Replace this session's retry policy. Other sessions are unaffected.
    ///
    /// # Errors
    /// - `max_attempts` is zero
    fn set_retry_parameters(&mut self, max_attempts: u32, delay: Duration) -> Result<()>;

    /// Create a volume and return it once it is usable.
    ///
    /// # Preconditions
    /// - `spec` has a non-empty name and a positive capacity
    ///
    /// # Errors
    /// - Validation failure (no request sent)
    /// - Upstream failure after retries
    /// - Volume did not become usable
    async fn create_volume(&self, spec: &VolumeSpec) -> Result<VolumeRecord>;

    /// Fetch one volume. A missing volume is `ErrorVolumeNotFound`.
    async fn get_volume(&self, id: &str) -> Result<VolumeRecord>;

    /// Grow a volume to `capacity` GiB.
    async fn expand_volume(&self, id: &str, capacity: i64) -> Result<VolumeRecord>;

    /// Delete a volume. Deleting an absent volume is not an error; the
    /// outcome says which case applied.
    async fn delete_volume(&self, id: &str) -> Result<DeleteOutcome>;

    /// One page of volumes, in upstream order.
    async fn list_volumes(
        &self,
        limit: u32,
        start: Option<&str>,
        filters: &ListVolumeFilters,
    ) -> Result<VolumePage>;

    /// First volume with exactly this name.
    async fn get_volume_by_name(&self, name: &str) -> Result<VolumeRecord> {
        if name.is_empty() {
            return Err(Error::invalid(
                ReasonCode::ErrorRequiredFieldMissing,
                "volume name is required",
            ));
        }

        let page = self
            .list_volumes(0, None, &ListVolumeFilters::by_name(name))
            .await?;
        page.volumes
            .into_iter()
            .find(|v| v.name == name)
            .ok_or_else(|| Error::NotFound(format!("Volume named '{}' not found", name)))
    }

    /// Every volume matching `filters`, following continuation cursors until
    /// none is returned or one repeats.
    async fn list_all_volumes(&self, filters: &ListVolumeFilters) -> Result<Vec<VolumeRecord>> {
        let mut all = Vec::new();
        let mut start: Option<String> = None;

        loop {
            let page = self.list_volumes(0, start.as_deref(), filters).await?;
            all.extend(page.volumes);

            match page.next {
                // A repeated cursor would page forever.
                Some(cursor) if start.as_deref() != Some(cursor.as_str()) => start = Some(cursor),
                _ => break,
            }
        }

        Ok(all)
    }
}
