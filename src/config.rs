//! Declarative routing configuration.
//!
//! A single TOML file declares the model catalog, the named routing
//! profiles, and the per-task policies. [`GatewayConfig`] is the parsed
//! form; the policy store owns the live copy and hands out snapshots.

use std::fmt;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

// ---------------------------------------------------------------------------
// Tasks and priorities
// ---------------------------------------------------------------------------

/// Category of inference request.
///
/// The set is closed: a task outside this enum is rejected when the request
/// is deserialized instead of silently falling through unrouted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Chat,
    Code,
    Vision,
    Asr,
    Tts,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Code => "code",
            Self::Vision => "vision",
            Self::Asr => "asr",
            Self::Tts => "tts",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "chat" => Some(Self::Chat),
            "code" => Some(Self::Code),
            "vision" => Some(Self::Vision),
            "asr" => Some(Self::Asr),
            "tts" => Some(Self::Tts),
            _ => None,
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scoring preference attached to a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Speed,
    Cost,
    Quality,
    #[default]
    Balanced,
}

// ---------------------------------------------------------------------------
// Model catalog
// ---------------------------------------------------------------------------

/// One backend in the model catalog. The catalog key is the model id;
/// everything else lives here. Absent numeric fields mean "unknown", not
/// zero; the recommendation engine substitutes its own defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Human-readable name shown in admin listings.
    pub label: String,
    /// Provider class. Cloud providers are namespaced `cloud:<vendor>`;
    /// anything else counts as locally hosted.
    pub provider: String,
    /// Optional hosting service within the provider (e.g. `ollama`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    /// Task this model serves. A model serves exactly one task.
    pub task: TaskKind,
    /// Maximum context window in tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<u32>,
    /// Typical request latency in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u32>,
    /// Cost per million units, in whatever currency the operator tracks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_per_million: Option<f64>,
    /// Resident memory footprint in gigabytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_gb: Option<f64>,
    /// Inference endpoint requests are proxied to.
    pub endpoint: String,
    /// Optional health-check URL pinged at startup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<String>,
    /// Name of the environment variable holding this backend's credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_env: Option<String>,
}

impl ModelSpec {
    pub fn is_cloud(&self) -> bool {
        self.provider.starts_with("cloud")
    }
}

/// Catalog entry in its wire form, with the id folded back in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    #[serde(flatten)]
    pub spec: ModelSpec,
}

// ---------------------------------------------------------------------------
// Profiles and policies
// ---------------------------------------------------------------------------

/// Named bundle of task-to-model routing overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Task name → model id.
    #[serde(default)]
    pub routing: IndexMap<String, String>,
}

/// Numeric cutoffs consulted by the static selectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Requests above this many context tokens prefer the long-context model.
    #[serde(default = "default_context_cutoff")]
    pub context_tokens: u32,
    /// Complexity at or above this picks the "complex" chat alternate.
    #[serde(default = "default_complexity_cutoff")]
    pub complexity: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            context_tokens: default_context_cutoff(),
            complexity: default_complexity_cutoff(),
        }
    }
}

fn default_context_cutoff() -> u32 {
    8_000
}

fn default_complexity_cutoff() -> f64 {
    0.6
}

/// Static routing policy for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPolicy {
    /// Model used when no specialized branch applies.
    #[serde(rename = "default")]
    pub default_model: String,
    /// Alternate for requests that exceed the context-token cutoff.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_context: Option<String>,
    /// Alternate for speed-priority chat requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lightweight: Option<String>,
    /// Alternate for high-complexity chat requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complex: Option<String>,
    /// Alternate for everyday chat requests below the complexity cutoff.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balanced: Option<String>,
    /// Whether dynamic recommendations may hand this task to a cloud model.
    #[serde(default)]
    pub allow_cloud: bool,
    /// Whether to consult the recommendation collaborator before the
    /// static selector.
    #[serde(default)]
    pub dynamic: bool,
    #[serde(default)]
    pub thresholds: Thresholds,
}

// ---------------------------------------------------------------------------
// Top-level configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Model id → catalog entry. Declaration order is preserved and gives
    /// the recommendation engine its stable iteration order.
    pub models: IndexMap<String, ModelSpec>,
    /// Profile name → routing overrides.
    pub profiles: IndexMap<String, ProfileConfig>,
    /// Task name → static routing policy.
    pub policies: IndexMap<String, TaskPolicy>,
}

impl GatewayConfig {
    /// Reads and validates the configuration file. Any failure here is
    /// fatal at startup: the gateway refuses to serve with a bad config.
    pub fn load(path: &Path) -> Result<Self, GatewayError> {
        let raw = fs::read_to_string(path).map_err(|err| {
            GatewayError::Config(format!("cannot read {}: {err}", path.display()))
        })?;
        let config: Self = toml::from_str(&raw).map_err(|err| {
            GatewayError::Config(format!("malformed {}: {err}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the whole configuration back, replacing the previous file.
    /// Goes through a sibling temp file so a crash mid-write never leaves
    /// a truncated config behind.
    pub fn save(&self, path: &Path) -> Result<(), GatewayError> {
        let rendered = toml::to_string_pretty(self)
            .map_err(|err| GatewayError::Config(format!("cannot serialize config: {err}")))?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, rendered).map_err(|err| {
            GatewayError::Config(format!("cannot write {}: {err}", tmp.display()))
        })?;
        fs::rename(&tmp, path).map_err(|err| {
            GatewayError::Config(format!("cannot replace {}: {err}", path.display()))
        })?;
        Ok(())
    }

    /// Cross-reference checks beyond what the parse itself enforces:
    /// policy and routing keys must be known tasks, and every routing
    /// target must exist in the catalog. Policy model ids are deliberately
    /// not checked here; a dangling policy reference surfaces at
    /// resolution time as a server-side defect.
    pub fn validate(&self) -> Result<(), GatewayError> {
        for task in self.policies.keys() {
            if TaskKind::parse(task).is_none() {
                return Err(GatewayError::Config(format!(
                    "policies section declares unknown task {task:?}"
                )));
            }
        }
        for (name, profile) in &self.profiles {
            for (task, model_id) in &profile.routing {
                if TaskKind::parse(task).is_none() {
                    return Err(GatewayError::Config(format!(
                        "profile {name:?} routes unknown task {task:?}"
                    )));
                }
                if !self.models.contains_key(model_id) {
                    return Err(GatewayError::Config(format!(
                        "profile {name:?} routes task {task:?} to unknown model {model_id:?}"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn policy(&self, task: TaskKind) -> Option<&TaskPolicy> {
        self.policies.get(task.as_str())
    }

    pub fn descriptor(&self, id: &str) -> Option<ModelDescriptor> {
        self.models.get(id).map(|spec| ModelDescriptor {
            id: id.to_string(),
            spec: spec.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
