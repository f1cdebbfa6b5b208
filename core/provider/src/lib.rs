//! Provider sessions for VPC file-share volumes.
//!
//! This crate selects a registered provider, resolves credentials for it,
//! opens a session and exposes the volume operations on that session.
//!
//! # Design Principles
//! - Credential selection is first-match and order-sensitive
//! - Every failure while opening a session is reported with a fatal flag
//! - Validation happens before any network call and never consumes retries
//! - Retry policy is owned by each session, not by the process

pub mod auth;
pub mod config;
pub mod credentials;
pub mod init;
pub mod provider;
pub mod registry;
pub mod retry;
pub mod session;
pub mod volume;
pub mod vpc;

pub use auth::{IamToken, IamTokenExchanger, VpcCredentialsFactory};
pub use config::{ApiConfig, FileConfig, IksConfig, VpcConfig};
pub use credentials::{
    generate_context_credentials, AuthType, ContextCredentials, ContextCredentialsFactory,
};
pub use init::{
    init_providers, open_provider_session, open_provider_session_with_cancel, OpenSessionError,
};
pub use provider::{Provider, Session};
pub use registry::ProviderRegistry;
pub use retry::{retry, skip_retry, RetryPolicy};
pub use session::FileSession;
pub use volume::{DeleteOutcome, ListQuery, VolumePage, VolumeRecord, VolumeSpec, VolumeStatus};
pub use vpc::VpcFileProvider;
pub use vpcshare_client::ListVolumeFilters;
