//! IAM token exchange.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Method;
use serde::Deserialize;
use std::sync::Arc;

use vpcshare_client::{ApiRequest, Transport};
use vpcshare_common::{Error, Result, Secret};

use crate::credentials::{ContextCredentials, ContextCredentialsFactory};

/// Token endpoint path on the IAM service.
const TOKEN_PATH: &str = "/identity/token";

/// Grant type for API key exchange.
const APIKEY_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Lifetime assumed when the token response omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// IAM access token and its absolute expiry.
#[derive(Debug, Clone)]
pub struct IamToken {
    pub access_token: Secret,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IamErrorBody {
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    error_message: String,
}

/// Exchanges API keys for IAM access tokens.
pub struct IamTokenExchanger {
    transport: Arc<dyn Transport>,
}

impl IamTokenExchanger {
    /// Create an exchanger talking to the IAM service behind `transport`.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Exchange an API key for an access token.
    ///
    /// # Errors
    /// - Empty API key (no request is sent)
    /// - IAM rejected the key or could not be reached
    pub async fn exchange_api_key(&self, api_key: &Secret) -> Result<IamToken> {
        if api_key.is_empty() {
            return Err(Error::Authentication("API key is empty".to_string()));
        }

        let request = ApiRequest::new(Method::POST, TOKEN_PATH).with_form(vec![
            ("grant_type".to_string(), APIKEY_GRANT_TYPE.to_string()),
            ("apikey".to_string(), api_key.expose().to_string()),
        ]);

        let response = self
            .transport
            .execute(request)
            .await
            .map_err(|e| Error::Authentication(format!("Token exchange failed: {}", e)))?;

        if !response.status.is_success() {
            let detail = serde_json::from_slice::<IamErrorBody>(&response.body)
                .map(|body| format!("{} {}", body.error_code, body.error_message))
                .unwrap_or_else(|_| response.text());
            return Err(Error::Authentication(format!(
                "Token exchange failed: {} - {}",
                response.status,
                detail.trim()
            )));
        }

        let token: TokenResponse = serde_json::from_slice(&response.body)
            .map_err(|e| Error::Authentication(format!("Invalid token response: {}", e)))?;

        let expires_in = token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        tracing::debug!(expires_in, "Obtained IAM access token");

        Ok(IamToken {
            access_token: Secret::new(token.access_token),
            expires_at: Utc::now() + Duration::seconds(expires_in),
        })
    }
}

/// Credentials factory backed by IAM API key exchange.
pub struct VpcCredentialsFactory {
    provider_id: String,
    exchanger: IamTokenExchanger,
}

impl VpcCredentialsFactory {
    pub fn new(provider_id: impl Into<String>, exchanger: IamTokenExchanger) -> Self {
        Self {
            provider_id: provider_id.into(),
            exchanger,
        }
    }
}

#[async_trait]
impl ContextCredentialsFactory for VpcCredentialsFactory {
    async fn for_iam_access_token(&self, api_key: &Secret) -> Result<ContextCredentials> {
        let token = self.exchanger.exchange_api_key(api_key).await?;
        Ok(ContextCredentials::iam_access_token(
            self.provider_id.clone(),
            token.access_token,
            Some(token.expires_at),
        ))
    }
}
