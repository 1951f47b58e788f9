//! Routing resolution: from an inbound request to a concrete backend.
//!
//! Per request the resolver walks a short pipeline: look up the task's
//! policy, try the control-plane recommendation when the policy opts in,
//! and otherwise fall back to the static per-task selector. Dynamic
//! failures (unreachable control plane, nonsense replies, unknown models)
//! never surface to the caller; the static path always produces an answer
//! or a typed error.

pub mod selector;

pub use selector::TaskSelector;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::{GatewayConfig, Priority, TaskKind, TaskPolicy};
use crate::error::GatewayError;
use crate::recommend::{ControlPlaneClient, RecommendRequest, RemoteRecommendation};

/// An inbound routing request. `payload` rides along untouched; resolution
/// only reads the hints.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteRequest {
    pub task: TaskKind,
    #[serde(default)]
    pub context_tokens: Option<u32>,
    /// Estimated complexity from 0.0 (trivial) to 1.0 (advanced).
    #[serde(default)]
    pub complexity: Option<f64>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub payload: Option<Value>,
}

/// Origin of a routing decision, reported as `source` in the metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// A control-plane recommendation drove the decision.
    ControlPlane,
    /// A static per-task selector drove the decision.
    Static,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ControlPlane => "control-plane",
            Self::Static => "static",
        }
    }
}

/// A routing decision ready to execute: which model, where it lives, and
/// the metadata trail explaining the choice.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub model: String,
    pub endpoint: String,
    pub metadata: Value,
}

pub struct RouteResolver {
    control_plane: Option<ControlPlaneClient>,
}

impl RouteResolver {
    pub fn new(control_plane: Option<ControlPlaneClient>) -> Self {
        Self { control_plane }
    }

    /// Resolves `request` against a single configuration snapshot. Hints
    /// outside their documented range are rejected before any lookup.
    pub async fn resolve(
        &self,
        config: &GatewayConfig,
        request: &RouteRequest,
    ) -> Result<Resolution, GatewayError> {
        if let Some(complexity) = request.complexity {
            if !(0.0..=1.0).contains(&complexity) {
                return Err(GatewayError::InvalidComplexity(complexity));
            }
        }
        let policy = config
            .policy(request.task)
            .ok_or(GatewayError::UnsupportedTask(request.task))?;

        if policy.dynamic {
            if let Some(resolution) = self.dynamic_attempt(config, policy, request).await {
                return Ok(resolution);
            }
        }
        static_select(config, policy, request)
    }

    /// Consults the control plane. `None` means "use the static path"; the
    /// reasons are logged here so callers do not have to care.
    async fn dynamic_attempt(
        &self,
        config: &GatewayConfig,
        policy: &TaskPolicy,
        request: &RouteRequest,
    ) -> Option<Resolution> {
        let client = self.control_plane.as_ref()?;
        let recommend_request = RecommendRequest {
            task: request.task,
            context_tokens: request.context_tokens.unwrap_or(0),
            priority: request.priority.unwrap_or_default(),
            allow_cloud: policy.allow_cloud,
        };
        let remote = client.recommend(&recommend_request).await?;

        let Some(model_id) = remote.model_id().map(str::to_string) else {
            tracing::warn!(task = %request.task, "control plane reply names no model id");
            return None;
        };
        let endpoint = remote
            .endpoint()
            .map(str::to_string)
            .or_else(|| config.models.get(&model_id).map(|spec| spec.endpoint.clone()));
        let Some(endpoint) = endpoint else {
            tracing::warn!(model = %model_id, "no endpoint known for the recommended model");
            return None;
        };

        let RemoteRecommendation {
            model,
            score,
            rationale,
        } = remote;
        let mut fields = match model {
            Value::Object(fields) => fields,
            _ => serde_json::Map::new(),
        };
        fields.insert("score".to_string(), score.map_or(Value::Null, Value::from));
        fields.insert("rationale".to_string(), json!(rationale));
        fields.insert(
            "source".to_string(),
            json!(Provenance::ControlPlane.as_str()),
        );

        tracing::debug!(
            task = %request.task,
            model = %model_id,
            source = Provenance::ControlPlane.as_str(),
            "route resolved"
        );
        Some(Resolution {
            model: model_id,
            endpoint,
            metadata: Value::Object(fields),
        })
    }
}

fn static_select(
    config: &GatewayConfig,
    policy: &TaskPolicy,
    request: &RouteRequest,
) -> Result<Resolution, GatewayError> {
    let model_id = TaskSelector::for_task(request.task).select(policy, request)?;
    let spec = config
        .models
        .get(&model_id)
        .ok_or_else(|| GatewayError::DanglingModel(model_id.clone()))?;

    let mut metadata = serde_json::to_value(spec).map_err(|err| {
        GatewayError::Config(format!("cannot serialize catalog entry {model_id}: {err}"))
    })?;
    if let Some(fields) = metadata.as_object_mut() {
        fields.insert("source".to_string(), json!(Provenance::Static.as_str()));
    }

    tracing::debug!(
        task = %request.task,
        model = %model_id,
        source = Provenance::Static.as_str(),
        "route resolved"
    );
    Ok(Resolution {
        model: model_id,
        endpoint: spec.endpoint.clone(),
        metadata,
    })
}

// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    const SAMPLE: &str = r#"
[models.fast]
label = "Fast"
provider = "local"
task = "chat"
latency_ms = 120
memory_gb = 2.0
endpoint = "http://fast.local/generate"

[models.accurate]
label = "Accurate"
provider = "local"
task = "chat"
memory_gb = 12.0
endpoint = "http://accurate.local/generate"

[models.coder]
label = "Coder"
provider = "local"
task = "code"
endpoint = "http://coder.local/generate"

[profiles.default]

[policies.chat]
default = "fast"
complex = "accurate"
balanced = "fast"

[policies.code]
default = "coder"
long_context = "coder"
dynamic = true

[policies.vision]
default = "ghost"
"#;

    fn config() -> GatewayConfig {
        toml::from_str(SAMPLE).unwrap()
    }

    fn request(task: TaskKind) -> RouteRequest {
        RouteRequest {
            task,
            context_tokens: None,
            complexity: None,
            priority: None,
            payload: None,
        }
    }

    #[tokio::test]
    async fn static_resolution_tags_its_provenance() {
        let resolver = RouteResolver::new(None);
        let config = config();

        let mut req = request(TaskKind::Chat);
        req.complexity = Some(0.9);
        let resolution = resolver.resolve(&config, &req).await.unwrap();
        assert_eq!(resolution.model, "accurate");
        assert_eq!(resolution.endpoint, "http://accurate.local/generate");
        assert_eq!(resolution.metadata["source"], "static");
        assert_eq!(resolution.metadata["provider"], "local");
    }

    #[tokio::test]
    async fn out_of_range_complexity_is_rejected() {
        let resolver = RouteResolver::new(None);
        let config = config();

        for complexity in [5.0, -3.0] {
            let mut req = request(TaskKind::Chat);
            req.complexity = Some(complexity);
            let err = resolver.resolve(&config, &req).await.unwrap_err();
            assert!(matches!(err, GatewayError::InvalidComplexity(got) if got == complexity));
        }

        // Both bounds are inclusive.
        let mut req = request(TaskKind::Chat);
        req.complexity = Some(1.0);
        let resolution = resolver.resolve(&config, &req).await.unwrap();
        assert_eq!(resolution.model, "accurate");
        req.complexity = Some(0.0);
        let resolution = resolver.resolve(&config, &req).await.unwrap();
        assert_eq!(resolution.model, "fast");
    }

    #[tokio::test]
    async fn task_without_a_policy_is_unsupported() {
        let resolver = RouteResolver::new(None);
        let err = resolver
            .resolve(&config(), &request(TaskKind::Tts))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::UnsupportedTask(TaskKind::Tts)));
    }

    #[tokio::test]
    async fn policy_pointing_at_a_missing_model_is_a_defect() {
        let resolver = RouteResolver::new(None);
        let err = resolver
            .resolve(&config(), &request(TaskKind::Vision))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::DanglingModel(id) if id == "ghost"));
    }

    #[tokio::test]
    async fn dead_control_plane_falls_back_to_static() {
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let client = ControlPlaneClient::new(Url::parse(&format!("http://{addr}")).unwrap());
        let resolver = RouteResolver::new(Some(client));

        // code has dynamic = true; the request must still succeed.
        let resolution = resolver
            .resolve(&config(), &request(TaskKind::Code))
            .await
            .unwrap();
        assert_eq!(resolution.model, "coder");
        assert_eq!(resolution.metadata["source"], "static");
    }

    #[tokio::test]
    async fn dynamic_is_skipped_when_the_policy_opts_out() {
        // A configured control plane is irrelevant for chat (dynamic = false).
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let client = ControlPlaneClient::new(Url::parse(&format!("http://{addr}")).unwrap());
        let resolver = RouteResolver::new(Some(client));

        let resolution = resolver
            .resolve(&config(), &request(TaskKind::Chat))
            .await
            .unwrap();
        assert_eq!(resolution.model, "fast");
        assert_eq!(resolution.metadata["source"], "static");
    }
}
