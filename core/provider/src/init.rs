//! Startup registration and session opening.

use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use vpcshare_common::{Error, ReasonCode, Result};

use crate::config::FileConfig;
use crate::credentials::generate_context_credentials;
use crate::provider::Session;
use crate::registry::ProviderRegistry;
use crate::vpc::VpcFileProvider;

/// Failure to open a provider session.
///
/// `fatal` tells the caller whether retrying the whole open is pointless.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct OpenSessionError {
    pub fatal: bool,
    #[source]
    pub source: Error,
}

impl OpenSessionError {
    fn fatal(source: Error) -> Self {
        Self {
            fatal: true,
            source,
        }
    }

    pub fn reason_code(&self) -> ReasonCode {
        self.source.reason_code()
    }
}

/// Build the registry from every enabled provider sub-config.
///
/// # Errors
/// - `NoProviders` if no sub-config is enabled
/// - `AlreadyExists` if two enabled sub-configs claim the same identity
pub fn init_providers(conf: &FileConfig) -> Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();

    if let Some(vpc) = conf.enabled_vpc() {
        info!(provider = %vpc.provider_type, "Registering VPC file provider");
        let provider = VpcFileProvider::new(vpc.provider_type.clone(), conf.clone())?;
        registry.register(vpc.provider_type.clone(), Arc::new(provider))?;
    }

    if let Some(iks) = conf.enabled_iks() {
        info!(provider = %iks.provider_name, "Registering VPC file provider with deferred credentials");
        let provider = VpcFileProvider::new(iks.provider_name.clone(), conf.clone())?;
        registry.register(iks.provider_name.clone(), Arc::new(provider))?;
    }

    if registry.is_empty() {
        error!("No providers enabled in configuration");
        return Err(Error::NoProviders);
    }

    info!(providers = ?registry.providers(), "Providers initialized");
    Ok(registry)
}

/// Look up `provider_id`, resolve its credentials and open a session.
pub async fn open_provider_session(
    conf: &FileConfig,
    registry: &ProviderRegistry,
    provider_id: &str,
) -> std::result::Result<Box<dyn Session>, OpenSessionError> {
    open_provider_session_with_cancel(CancellationToken::new(), conf, registry, provider_id).await
}

/// Cancellable variant of [`open_provider_session`].
///
/// Every failure is fatal; session opening is never retried here.
/// Cancellation before completion yields `Error::Cancelled`.
pub async fn open_provider_session_with_cancel(
    cancel: CancellationToken,
    conf: &FileConfig,
    registry: &ProviderRegistry,
    provider_id: &str,
) -> std::result::Result<Box<dyn Session>, OpenSessionError> {
    info!(provider_id, "Opening provider session");

    let provider = registry.get(provider_id).map_err(|e| {
        error!(provider_id, "Provider not registered");
        OpenSessionError::fatal(e)
    })?;

    let factory = provider.context_credentials_factory().map_err(|e| {
        error!(provider_id, error = %e, "Failed to obtain credentials factory");
        OpenSessionError::fatal(e)
    })?;

    let open = async {
        let credentials = generate_context_credentials(conf, provider_id, factory.as_ref()).await?;
        provider.open_session(credentials).await
    };

    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = open => result,
    };

    result.map_err(|e| {
        error!(provider_id, reason = %e.reason_code(), error = %e, "Failed to open provider session");
        OpenSessionError::fatal(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IksConfig, VpcConfig, DEFAULT_API_KEY_ENV, DEFAULT_IAM_URL};
    use crate::credentials::{ContextCredentials, ContextCredentialsFactory};
    use crate::provider::Provider;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use vpcshare_client::MockTransport;
    use vpcshare_common::Secret;

    fn vpc(provider_type: &str, enabled: bool) -> VpcConfig {
        VpcConfig {
            enabled,
            provider_type: provider_type.to_string(),
            api_key: Secret::new("key"),
            iam_url: DEFAULT_IAM_URL.to_string(),
        }
    }

    fn iks(provider_name: &str, enabled: bool) -> IksConfig {
        IksConfig {
            enabled,
            provider_name: provider_name.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            iam_url: DEFAULT_IAM_URL.to_string(),
        }
    }

    #[test]
    fn test_single_enabled_provider_is_registered() {
        let conf = FileConfig {
            vpc: Some(vpc("vpc-file", true)),
            iks: Some(iks("iks-file", false)),
            ..FileConfig::default()
        };

        let registry = init_providers(&conf).unwrap();
        assert_eq!(registry.providers(), vec!["vpc-file".to_string()]);
        assert!(matches!(registry.get("iks-file"), Err(Error::NotRegistered(_))));

        let conf = FileConfig {
            iks: Some(iks("iks-file", true)),
            ..FileConfig::default()
        };
        let registry = init_providers(&conf).unwrap();
        assert_eq!(registry.providers(), vec!["iks-file".to_string()]);
        assert!(matches!(registry.get("vpc-file"), Err(Error::NotRegistered(_))));
    }

    #[test]
    fn test_no_enabled_provider_fails() {
        let conf = FileConfig {
            vpc: Some(vpc("vpc-file", false)),
            iks: Some(iks("iks-file", false)),
            ..FileConfig::default()
        };
        let err = init_providers(&conf).err().unwrap();
        assert_eq!(err.to_string(), "no providers registered");

        assert!(matches!(init_providers(&FileConfig::default()), Err(Error::NoProviders)));
    }

    #[test]
    fn test_both_schemes_on_one_identity_fail() {
        let conf = FileConfig {
            vpc: Some(vpc("vpc-file", true)),
            iks: Some(iks("vpc-file", true)),
            ..FileConfig::default()
        };
        assert!(matches!(init_providers(&conf), Err(Error::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_unregistered_provider_is_fatal() {
        let conf = FileConfig {
            vpc: Some(vpc("vpc-file", true)),
            ..FileConfig::default()
        };
        let registry = init_providers(&conf).unwrap();

        let err = open_provider_session(&conf, &registry, "missing")
            .await
            .err()
            .unwrap();
        assert!(err.fatal);
        assert_eq!(err.reason_code(), ReasonCode::ErrorProviderNotRegistered);
        assert_eq!(err.to_string(), "Provider 'missing' is not registered");
    }

    fn mocked_registry(conf: &FileConfig, name: &str) -> (ProviderRegistry, Arc<MockTransport>, Arc<MockTransport>) {
        let api = Arc::new(MockTransport::new());
        let iam = Arc::new(MockTransport::new());
        let provider = VpcFileProvider::with_transports(name, conf.clone(), api.clone(), iam.clone());

        let mut registry = ProviderRegistry::new();
        registry.register(name, Arc::new(provider)).unwrap();
        (registry, api, iam)
    }

    #[tokio::test]
    async fn test_open_session_exchanges_configured_key() {
        let conf = FileConfig {
            vpc: Some(vpc("vpc-file", true)),
            ..FileConfig::default()
        };
        let (registry, api, iam) = mocked_registry(&conf, "vpc-file");
        iam.push_json(
            StatusCode::OK,
            &serde_json::json!({"access_token": "iam-token", "expires_in": 3600}),
        );
        api.push_json(StatusCode::OK, &serde_json::json!({"shares": []}));

        let session = open_provider_session(&conf, &registry, "vpc-file")
            .await
            .map_err(|e| e.to_string())
            .unwrap();
        session
            .list_volumes(0, None, &Default::default())
            .await
            .unwrap();

        assert_eq!(iam.request_count(), 1);
        assert_eq!(api.last_request().unwrap().bearer.unwrap().expose(), "iam-token");
    }

    #[tokio::test]
    async fn test_unconfigured_scheme_is_fatal() {
        let conf = FileConfig {
            vpc: Some(vpc("vpc-file", true)),
            ..FileConfig::default()
        };
        let (registry, _, iam) = mocked_registry(&conf, "other");

        let err = open_provider_session(&conf, &registry, "other")
            .await
            .err()
            .unwrap();
        assert!(err.fatal);
        assert_eq!(err.reason_code(), ReasonCode::ErrorInsufficientAuthentication);
        assert_eq!(iam.request_count(), 0);
    }

    #[tokio::test]
    async fn test_token_exchange_failure_is_fatal() {
        let conf = FileConfig {
            vpc: Some(vpc("vpc-file", true)),
            ..FileConfig::default()
        };
        let (registry, _, iam) = mocked_registry(&conf, "vpc-file");
        iam.push_response(StatusCode::SERVICE_UNAVAILABLE, "unavailable");

        let err = open_provider_session(&conf, &registry, "vpc-file")
            .await
            .err()
            .unwrap();
        assert!(err.fatal);
        assert_eq!(err.reason_code(), ReasonCode::ErrorAuthenticationFailed);
        assert_eq!(iam.request_count(), 1);
    }

    struct BrokenFactoryProvider;

    #[async_trait]
    impl Provider for BrokenFactoryProvider {
        fn name(&self) -> &str {
            "broken"
        }

        fn context_credentials_factory(&self) -> Result<Arc<dyn ContextCredentialsFactory>> {
            Err(Error::Config("credentials factory unavailable".to_string()))
        }

        async fn open_session(&self, _credentials: ContextCredentials) -> Result<Box<dyn Session>> {
            Err(Error::Config("unreachable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_factory_failure_is_fatal() {
        let conf = FileConfig {
            vpc: Some(vpc("broken", true)),
            ..FileConfig::default()
        };
        let mut registry = ProviderRegistry::new();
        registry
            .register("broken", Arc::new(BrokenFactoryProvider))
            .unwrap();

        let err = open_provider_session(&conf, &registry, "broken")
            .await
            .err()
            .unwrap();
        assert!(err.fatal);
        assert_eq!(err.reason_code(), ReasonCode::ErrorConfiguration);
        assert_eq!(
            err.to_string(),
            "Configuration error: credentials factory unavailable"
        );
    }

    #[tokio::test]
    async fn test_cancelled_open_is_fatal() {
        let conf = FileConfig {
            vpc: Some(vpc("vpc-file", true)),
            ..FileConfig::default()
        };
        let registry = init_providers(&conf).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = open_provider_session_with_cancel(cancel, &conf, &registry, "vpc-file")
            .await
            .err()
            .unwrap();
        assert!(err.fatal);
        assert!(matches!(err.source, Error::Cancelled));
    }
}
