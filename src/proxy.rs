//! Dispatch proxy: the final hop to a selected backend.

use std::time::Duration;

use serde_json::Value;

use crate::error::GatewayError;

/// Outer bound on a single backend call. Generation-heavy backends are
/// slow; anything beyond this is treated as unavailable.
const FORWARD_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Default)]
pub struct DispatchProxy {
    http: reqwest::Client,
}

impl DispatchProxy {
    pub fn new() -> Self {
        Self::default()
    }

    /// POSTs `payload` to `endpoint` and returns the backend's JSON reply.
    /// Transport failures, non-success statuses, and undecodable bodies all
    /// collapse into [`GatewayError::BackendUnavailable`]. The proxy never
    /// retries and never relays a partial response.
    pub async fn forward(&self, endpoint: &str, payload: &Value) -> Result<Value, GatewayError> {
        let response = self
            .http
            .post(endpoint)
            .timeout(FORWARD_TIMEOUT)
            .json(payload)
            .send()
            .await
            .map_err(|err| {
                tracing::warn!(endpoint, error = %err, "backend unreachable");
                GatewayError::BackendUnavailable(err.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::warn!(endpoint, status = %status, "backend rejected the request");
            return Err(GatewayError::BackendUnavailable(format!(
                "{endpoint} answered {status}: {detail}"
            )));
        }

        response.json().await.map_err(|err| {
            GatewayError::BackendUnavailable(format!("{endpoint} returned a non-JSON body: {err}"))
        })
    }
}

// ---------------------------------------------------------------------------
