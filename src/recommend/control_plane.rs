//! Outbound client for the recommendation control plane.
//!
//! The control plane is advisory. Every failure mode here, whether
//! transport, timeout, non-2xx status, or a malformed body, collapses to
//! `None` with a warning, and the caller degrades to static routing
//! instead of failing the request.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::RecommendRequest;

const RECOMMEND_TIMEOUT: Duration = Duration::from_secs(5);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

/// HTTP client pinned to one control-plane base URL.
#[derive(Debug, Clone)]
pub struct ControlPlaneClient {
    base: Url,
    http: reqwest::Client,
}

impl ControlPlaneClient {
    pub fn new(base: Url) -> Self {
        Self {
            base,
            http: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base.as_str().trim_end_matches('/'), path)
    }

    /// Asks the control plane for a recommendation. Any failure returns
    /// `None`; the caller decides what unavailability means.
    pub async fn recommend(&self, request: &RecommendRequest) -> Option<RemoteRecommendation> {
        let url = self.endpoint("recommend");
        let response = match self
            .http
            .post(&url)
            .timeout(RECOMMEND_TIMEOUT)
            .json(request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "control plane recommendation failed");
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::warn!(
                url = %url,
                status = %response.status(),
                "control plane rejected recommendation request"
            );
            return None;
        }
        match response.json::<RemoteRecommendation>().await {
            Ok(remote) => Some(remote),
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "control plane sent a malformed recommendation");
                None
            }
        }
    }

    /// Upstream health status, when reachable and well-formed.
    pub async fn health(&self) -> Option<String> {
        let url = self.endpoint("health");
        let response = self
            .http
            .get(&url)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        let body: Value = response.json().await.ok()?;
        Some(
            body.get("status")
                .and_then(Value::as_str)
                .unwrap_or("ok")
                .to_string(),
        )
    }
}

/// A `/recommend` reply, parsed leniently. The resolver validates the
/// parts it needs and logs whatever is missing.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteRecommendation {
    #[serde(default)]
    pub model: Value,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub rationale: Vec<String>,
}

impl RemoteRecommendation {
    /// Recommended model id. A blank id counts as missing.
    pub fn model_id(&self) -> Option<&str> {
        self.model
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    /// Endpoint named by the reply. A blank value counts as missing, and
    /// the caller resolves the endpoint from its own catalog instead.
    pub fn endpoint(&self) -> Option<&str> {
        self.model
            .get("endpoint")
            .and_then(Value::as_str)
            .filter(|endpoint| !endpoint.is_empty())
    }
}

// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Priority, TaskKind};
    use serde_json::json;

    fn request() -> RecommendRequest {
        RecommendRequest {
            task: TaskKind::Chat,
            context_tokens: 0,
            priority: Priority::Balanced,
            allow_cloud: false,
        }
    }

    #[test]
    fn base_url_joining_tolerates_trailing_slashes() {
        let client = ControlPlaneClient::new(Url::parse("http://cp:7000/").unwrap());
        assert_eq!(client.endpoint("recommend"), "http://cp:7000/recommend");

        let client = ControlPlaneClient::new(Url::parse("http://cp:7000/api/").unwrap());
        assert_eq!(client.endpoint("health"), "http://cp:7000/api/health");
    }

    #[test]
    fn remote_reply_parsing_is_lenient() {
        let remote: RemoteRecommendation = serde_json::from_value(json!({
            "model": {"id": "m1", "endpoint": "http://m1.local/infer"},
            "score": 1.5,
            "rationale": ["Local bonus +0.2"],
        }))
        .unwrap();
        assert_eq!(remote.model_id(), Some("m1"));
        assert_eq!(remote.endpoint(), Some("http://m1.local/infer"));
        assert_eq!(remote.score, Some(1.5));

        let sparse: RemoteRecommendation = serde_json::from_value(json!({"model": {}})).unwrap();
        assert_eq!(sparse.model_id(), None);
        assert_eq!(sparse.endpoint(), None);
        assert!(sparse.rationale.is_empty());
    }

    #[test]
    fn blank_model_fields_count_as_missing() {
        let remote: RemoteRecommendation = serde_json::from_value(json!({
            "model": {"id": "", "endpoint": ""},
        }))
        .unwrap();
        assert_eq!(remote.model_id(), None);
        assert_eq!(remote.endpoint(), None);
    }

    #[tokio::test]
    async fn unreachable_control_plane_yields_none() {
        // Bind then drop so the port is known to refuse connections.
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let client = ControlPlaneClient::new(Url::parse(&format!("http://{addr}")).unwrap());
        assert!(client.recommend(&request()).await.is_none());
        assert!(client.health().await.is_none());
    }
}
