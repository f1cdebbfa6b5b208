//! Provider configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use vpcshare_common::{Error, Result, Secret};

use crate::retry::RetryPolicy;

/// Default regional VPC endpoint.
pub const DEFAULT_ENDPOINT_URL: &str = "https://us-south.iaas.cloud.ibm.com";

/// Default IAM token service.
pub const DEFAULT_IAM_URL: &str = "https://iam.cloud.ibm.com";

/// Environment variable the deferred scheme reads its API key from.
pub const DEFAULT_API_KEY_ENV: &str = "IBMCLOUD_API_KEY";

fn default_iam_url() -> String {
    DEFAULT_IAM_URL.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

/// Token scheme: exchange a configured API key for an IAM access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VpcConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Provider identity this scheme serves.
    pub provider_type: String,
    #[serde(default)]
    pub api_key: Secret,
    #[serde(default = "default_iam_url")]
    pub iam_url: String,
}

/// Deferred scheme: credentials are fetched while the session opens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IksConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Provider identity this scheme serves.
    pub provider_name: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_iam_url")]
    pub iam_url: String,
}

/// Endpoint and retry settings shared by every provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub endpoint_url: String,
    pub timeout_secs: u64,
    /// Total attempts per call, including the first.
    pub max_retry_attempt: u32,
    /// Delay between attempts, in seconds.
    pub max_retry_gap_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_ENDPOINT_URL.to_string(),
            timeout_secs: 30,
            max_retry_attempt: 10,
            max_retry_gap_secs: 60,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Startup default retry policy for sessions.
    pub fn retry_policy(&self) -> Result<RetryPolicy> {
        RetryPolicy::new(
            self.max_retry_attempt,
            Duration::from_secs(self.max_retry_gap_secs),
        )
    }
}

/// Complete configuration bundle.
///
/// Holds at most one sub-config per authentication scheme.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub vpc: Option<VpcConfig>,
    #[serde(default)]
    pub iks: Option<IksConfig>,
    #[serde(default)]
    pub api: ApiConfig,
}

impl FileConfig {
    /// Enabled token-scheme sub-config, if any.
    pub fn enabled_vpc(&self) -> Option<&VpcConfig> {
        self.vpc.as_ref().filter(|c| c.enabled)
    }

    /// Enabled deferred-scheme sub-config, if any.
    pub fn enabled_iks(&self) -> Option<&IksConfig> {
        self.iks.as_ref().filter(|c| c.enabled)
    }

    /// Serialize configuration to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(format!("Invalid configuration: {}", e)))
    }

    /// Load configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read configuration {}: {}", path.display(), e))
        })?;
        Self::from_json(&contents)
    }
}
