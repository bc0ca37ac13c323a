//! Blocking HTTP transport for [`AdminApi`](super::AdminApi).
use serde_json::Value;
use std::time::Duration;

use super::{AdminApi, request_body};
use crate::error::ApiError;

/// Default endpoint of the admin API.
pub const DEFAULT_ENDPOINT: &str = "https://admin.aurorasigner.xyz/api.js";

pub struct HttpApi {
    endpoint: String,
    agent: ureq::Agent,
}

impl HttpApi {
    pub fn new(endpoint: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(30))
            .build();
        Self {
            endpoint: endpoint.to_string(),
            agent,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl AdminApi for HttpApi {
    fn call(&self, action: &str, payload: Value) -> Result<Value, ApiError> {
        tracing::debug!(action, endpoint = %self.endpoint, "admin api call");
        let resp = self
            .agent
            .post(&self.endpoint)
            .set("Content-Type", "application/json")
            .send_json(request_body(action, payload));

        match resp {
            Ok(r) => r
                .into_json::<Value>()
                .map_err(|e| ApiError::Decode(e.to_string())),
            Err(ureq::Error::Status(code, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                tracing::warn!(action, code, "admin api returned error status");
                Err(ApiError::Status { code, body })
            }
            Err(e) => {
                tracing::warn!(action, error = %e, "admin api request failed");
                Err(ApiError::Transport(e.to_string()))
            }
        }
    }
}
