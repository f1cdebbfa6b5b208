//! Context credentials and authentication strategy selection.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::info;

use vpcshare_common::{Error, Result, Secret};

use crate::config::FileConfig;

/// How the credential material was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthType {
    /// Bearer token exchanged from a configured API key.
    IamAccessToken,
    /// Empty placeholder; the session open step fetches credentials itself.
    Deferred,
}

/// Resolved authentication material for one session.
///
/// Produced fresh for every session open and never cached.
#[derive(Debug, Clone)]
pub struct ContextCredentials {
    pub auth_type: AuthType,
    pub credential: Secret,
    /// Provider identity the credentials were resolved for.
    pub provider_id: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ContextCredentials {
    pub fn iam_access_token(
        provider_id: impl Into<String>,
        token: Secret,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            auth_type: AuthType::IamAccessToken,
            credential: token,
            provider_id: provider_id.into(),
            expires_at,
        }
    }

    /// Empty sentinel meaning "resolve later inside the session open call".
    pub fn deferred(provider_id: impl Into<String>) -> Self {
        Self {
            auth_type: AuthType::Deferred,
            credential: Secret::default(),
            provider_id: provider_id.into(),
            expires_at: None,
        }
    }

    pub fn is_deferred(&self) -> bool {
        self.auth_type == AuthType::Deferred
    }

    /// Expired, or expiring within five minutes. Credentials without an
    /// expiry never expire.
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|at| at < Utc::now() + Duration::minutes(5))
            .unwrap_or(false)
    }
}

/// Capability a provider exposes for producing credentials.
#[async_trait]
pub trait ContextCredentialsFactory: Send + Sync {
    /// Exchange an API key for IAM access-token credentials.
    async fn for_iam_access_token(&self, api_key: &Secret) -> Result<ContextCredentials>;
}

/// Pick the authentication strategy for `provider_id` and resolve it.
///
/// Evaluated in order, first match wins:
/// 1. token-scheme sub-config tagged `provider_id`: ask `factory` for a token
/// 2. deferred-scheme sub-config tagged `provider_id`: return the empty sentinel
/// 3. otherwise `InsufficientAuthentication`
///
/// Factory failures are returned unmodified.
pub async fn generate_context_credentials(
    conf: &FileConfig,
    provider_id: &str,
    factory: &dyn ContextCredentialsFactory,
) -> Result<ContextCredentials> {
    info!(provider_id, "Generating context credentials");

    if let Some(vpc) = conf.vpc.as_ref().filter(|c| c.provider_type == provider_id) {
        info!(provider_id, "Using IAM access token strategy");
        return factory.for_iam_access_token(&vpc.api_key).await;
    }

    if conf.iks.as_ref().is_some_and(|c| c.provider_name == provider_id) {
        info!(provider_id, "Deferring credentials to session open");
        return Ok(ContextCredentials::deferred(provider_id));
    }

    Err(Error::InsufficientAuthentication(format!(
        "no configured authentication scheme for provider '{}'",
        provider_id
    )))
}
