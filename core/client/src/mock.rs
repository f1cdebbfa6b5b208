//! Scripted transport for testing.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::VecDeque;
use std::sync::Mutex;

use vpcshare_common::{Error, Result};

use crate::transport::{ApiRequest, ApiResponse, Transport};

#[derive(Debug, Clone)]
enum Scripted {
    Response(ApiResponse),
    NetworkFailure(String),
}

/// In-memory transport that replays scripted responses in order and records
/// every request it receives.
///
/// Once the script is exhausted the fallback response (if any) is returned
/// for every further request; without a fallback the call fails with a
/// network error.
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Scripted>>,
    fallback: Mutex<Option<ApiResponse>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response with a raw body.
    pub fn push_response(&self, status: StatusCode, body: impl Into<String>) -> &Self {
        self.lock_script()
            .push_back(Scripted::Response(ApiResponse::new(status, body.into())));
        self
    }

    /// Queue a JSON response.
    pub fn push_json(&self, status: StatusCode, body: &serde_json::Value) -> &Self {
        self.push_response(status, body.to_string())
    }

    /// Queue a transport-level failure.
    pub fn push_network_failure(&self, message: impl Into<String>) -> &Self {
        self.lock_script()
            .push_back(Scripted::NetworkFailure(message.into()));
        self
    }

    /// Response returned once the script runs out.
    pub fn set_fallback(&self, status: StatusCode, body: impl Into<String>) -> &Self {
        *self.fallback.lock().unwrap_or_else(|e| e.into_inner()) =
            Some(ApiResponse::new(status, body.into()));
        self
    }

    /// All requests received so far.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// The most recent request.
    pub fn last_request(&self) -> Option<ApiRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<Scripted>> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        let next = self.lock_script().pop_front();
        match next {
            Some(Scripted::Response(response)) => Ok(response),
            Some(Scripted::NetworkFailure(message)) => Err(Error::Network(message)),
            None => self
                .fallback
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone()
                .ok_or_else(|| Error::Network("no scripted response left".to_string())),
        }
    }
}
