//! Upstream API error body.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::reason::ReasonCode;

/// One `{code, message}` item of an upstream error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorItem {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub more_info: Option<String>,
}

impl ErrorItem {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            more_info: None,
        }
    }
}

/// The upstream API's structured error body.
///
/// Only bodies carrying at least one item are considered envelopes; see
/// [`ErrorEnvelope::from_slice`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub errors: Vec<ErrorItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl ErrorEnvelope {
    /// Envelope with a single item.
    pub fn single(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            errors: vec![ErrorItem::new(code, message)],
            trace: None,
        }
    }

    /// Parse a response body. Returns `None` when the body is not JSON, has
    /// no `errors` array, or the array is empty.
    pub fn from_slice(body: &[u8]) -> Option<Self> {
        serde_json::from_slice::<Self>(body)
            .ok()
            .filter(|envelope| !envelope.errors.is_empty())
    }

    /// Code of the first item.
    pub fn first_code(&self) -> Option<&str> {
        self.errors.first().map(|item| item.code.as_str())
    }

    /// Message of the first item.
    pub fn first_message(&self) -> Option<&str> {
        self.errors.first().map(|item| item.message.as_str())
    }
}

/// A non-success response from the REST endpoint that carried an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status code.
    pub status: u16,
    pub envelope: ErrorEnvelope,
}

impl ApiError {
    pub fn new(status: u16, envelope: ErrorEnvelope) -> Self {
        Self { status, envelope }
    }

    /// Reason code of the first envelope item, falling back to the HTTP status
    /// for 404s whose code is not in the upstream table.
    pub fn reason_code(&self) -> ReasonCode {
        let reason = ReasonCode::from_upstream(self.envelope.first_code().unwrap_or_default());
        if reason == ReasonCode::ErrorUnclassified && self.is_not_found() {
            ReasonCode::ErrorVolumeNotFound
        } else {
            reason
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Trace Code:{}, {} Please check ",
            self.envelope.trace.as_deref().unwrap_or_default(),
            self.envelope.first_message().unwrap_or_default()
        )
    }
}

impl std::error::Error for ApiError {}
