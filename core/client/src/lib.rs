//! REST client for the VPC file-share API.
//!
//! This crate owns the wire format: request construction, query parameters
//! for list calls, JSON models and the mapping of non-success responses onto
//! the common error vocabulary. It performs exactly one request per call and
//! never retries; retry policy belongs to the session layer.

pub mod mock;
pub mod models;
pub mod transport;
pub mod volume;

pub use mock::MockTransport;
pub use models::{
    CreateShareRequest, EncryptionKeyRef, Href, ListVolumeFilters, Profile, ResourceGroup,
    SharePatch, Volume, VolumeList, Zone, API_VERSION, SHARES_PATH,
};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, RequestBody, Transport};
pub use volume::{list_query, VolumeService};
