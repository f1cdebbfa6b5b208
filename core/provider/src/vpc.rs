//! VPC file-share provider.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use vpcshare_client::{HttpTransport, Transport, VolumeService};
use vpcshare_common::{Error, Result, Secret};

use crate::auth::{IamTokenExchanger, VpcCredentialsFactory};
use crate::config::{FileConfig, DEFAULT_IAM_URL};
use crate::credentials::{AuthType, ContextCredentials, ContextCredentialsFactory};
use crate::provider::{Provider, Session};
use crate::session::FileSession;

/// Provider serving file shares from the VPC regional endpoint.
pub struct VpcFileProvider {
    name: String,
    config: FileConfig,
    transport: Arc<dyn Transport>,
    iam_transport: Arc<dyn Transport>,
}

impl VpcFileProvider {
    /// Create a provider registered as `name`.
    ///
    /// # Errors
    /// - Endpoint or IAM URL is invalid
    pub fn new(name: impl Into<String>, config: FileConfig) -> Result<Self> {
        let timeout = config.api.timeout();
        let transport = HttpTransport::new(&config.api.endpoint_url, timeout)?;
        let iam_transport = HttpTransport::new(&iam_url(&config), timeout)?;

        Ok(Self::with_transports(
            name,
            config,
            Arc::new(transport),
            Arc::new(iam_transport),
        ))
    }

    /// Create a provider over explicit transports.
    pub fn with_transports(
        name: impl Into<String>,
        config: FileConfig,
        transport: Arc<dyn Transport>,
        iam_transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            transport,
            iam_transport,
        }
    }

    fn exchanger(&self) -> IamTokenExchanger {
        IamTokenExchanger::new(self.iam_transport.clone())
    }

    /// Complete deferred credentials from the configured environment variable.
    async fn resolve_deferred(&self) -> Result<ContextCredentials> {
        let env_name = self
            .config
            .iks
            .as_ref()
            .map(|c| c.api_key_env.clone())
            .ok_or_else(|| {
                Error::InsufficientAuthentication(format!(
                    "no deferred authentication configured for provider '{}'",
                    self.name
                ))
            })?;

        let api_key = std::env::var(&env_name)
            .map(Secret::new)
            .map_err(|_| Error::Authentication(format!("environment variable {} is not set", env_name)))?;

        debug!(provider = %self.name, env = %env_name, "Fetching deferred credentials");
        let token = self.exchanger().exchange_api_key(&api_key).await?;
        Ok(ContextCredentials::iam_access_token(
            self.name.clone(),
            token.access_token,
            Some(token.expires_at),
        ))
    }
}

/// IAM endpoint from whichever scheme is configured; the token scheme wins.
fn iam_url(config: &FileConfig) -> String {
    config
        .vpc
        .as_ref()
        .map(|c| c.iam_url.clone())
        .or_else(|| config.iks.as_ref().map(|c| c.iam_url.clone()))
        .unwrap_or_else(|| DEFAULT_IAM_URL.to_string())
}

#[async_trait]
impl Provider for VpcFileProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn context_credentials_factory(&self) -> Result<Arc<dyn ContextCredentialsFactory>> {
        Ok(Arc::new(VpcCredentialsFactory::new(
            self.name.clone(),
            self.exchanger(),
        )))
    }

    async fn open_session(&self, credentials: ContextCredentials) -> Result<Box<dyn Session>> {
        let credentials = match credentials.auth_type {
            AuthType::Deferred => self.resolve_deferred().await?,
            AuthType::IamAccessToken => credentials,
        };

        if credentials.credential.is_empty() {
            return Err(Error::Authentication("access token is empty".to_string()));
        }
        if credentials.is_expired() {
            return Err(Error::Authentication("access token is expired or about to expire".to_string()));
        }

        let retry_policy = self.config.api.retry_policy()?;
        info!(
            provider = %self.name,
            max_attempts = retry_policy.max_attempts(),
            "Opened provider session"
        );

        let service = VolumeService::new(self.transport.clone(), Some(credentials.credential));
        Ok(Box::new(FileSession::new(self.name.clone(), service, retry_policy)))
    }
}
