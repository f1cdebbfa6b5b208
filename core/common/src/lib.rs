//! Common utilities and types shared across the vpcshare crates.
//!
//! This module provides the error vocabulary (domain errors, reason codes and
//! the upstream error envelope) and the small parsing helpers every layer
//! relies on.

pub mod envelope;
pub mod error;
pub mod reason;
pub mod types;

pub use envelope::{ApiError, ErrorEnvelope, ErrorItem};
pub use error::{Error, Result};
pub use reason::ReasonCode;
pub use types::{is_valid_volume_id_format, parse_positive, to_int, to_int64, Secret, VolumeId};
