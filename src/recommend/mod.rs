//! Recommendation engine: pure scoring of catalog models.
//!
//! Scoring is a function of the configuration snapshot and the request
//! alone. No clocks, no I/O, no randomness, so identical inputs always
//! produce the identical winner, score, and rationale text. Candidates
//! are walked in catalog declaration order and a later candidate only
//! displaces the current best on a strictly greater score, which lands
//! ties on the first-declared model.
//!
//! Rules, in evaluation order:
//! 1. only models declared for the requested task are candidates;
//! 2. a declared context window smaller than the requested context
//!    disqualifies the model outright;
//! 3. the priority picks the base formula (speed, cost, quality, or the
//!    balanced blend), substituting defaults for undeclared metadata;
//! 4. cloud providers pay a flat penalty, or are disqualified when the
//!    request forbids cloud; local providers get a flat bonus.

pub mod control_plane;

pub use control_plane::{ControlPlaneClient, RemoteRecommendation};

use serde::{Deserialize, Serialize};

use crate::config::{GatewayConfig, ModelDescriptor, ModelSpec, Priority, TaskKind};
use crate::error::GatewayError;

/// Sentinel score reported for disqualified models. Selection never keys
/// off it: eligibility is tracked separately, so a disqualified candidate
/// cannot win even if every score in the pool is the sentinel.
pub const DISQUALIFIED: f64 = -1e9;

const DEFAULT_LATENCY_MS: u32 = 10_000;
const DEFAULT_MEMORY_GB: f64 = 1.0;
const CLOUD_PENALTY: f64 = 0.5;
const LOCAL_BONUS: f64 = 0.2;

/// What a caller asks the engine for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendRequest {
    pub task: TaskKind,
    #[serde(default = "default_context_tokens")]
    pub context_tokens: u32,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default = "default_allow_cloud")]
    pub allow_cloud: bool,
}

fn default_context_tokens() -> u32 {
    4096
}

fn default_allow_cloud() -> bool {
    true
}

/// Scoring verdict for a single model.
#[derive(Debug, Clone)]
pub struct ScoreOutcome {
    pub score: f64,
    /// False once any rule disqualifies the model.
    pub eligible: bool,
    /// One entry per applied rule, in application order.
    pub rationale: Vec<String>,
}

impl ScoreOutcome {
    fn disqualified(reason: &str, mut rationale: Vec<String>) -> Self {
        rationale.push(reason.to_string());
        Self {
            score: DISQUALIFIED,
            eligible: false,
            rationale,
        }
    }
}

/// Scores one model against a request. Pure and cheap; safe to call for
/// every catalog entry on every request.
pub fn score_model(model: &ModelSpec, request: &RecommendRequest) -> ScoreOutcome {
    let mut score = 0.0;
    let mut rationale = Vec::new();

    // Context fit comes first: a window too small ends the evaluation.
    if let Some(context) = model.context {
        if context < request.context_tokens {
            return ScoreOutcome::disqualified("Insufficient context window", rationale);
        }
    }

    match request.priority {
        Priority::Speed => {
            let latency = model.latency_ms.unwrap_or(DEFAULT_LATENCY_MS);
            score -= f64::from(latency) / 1_000.0;
            rationale.push(format!("Speed priority latency={latency}ms"));
        }
        Priority::Cost => {
            let cost = model.cost_per_million.unwrap_or(0.0);
            score -= cost;
            rationale.push(format!("Cost priority cost={cost}"));
        }
        Priority::Quality => {
            // Resident footprint stands in for model quality.
            let memory = model.memory_gb.unwrap_or(DEFAULT_MEMORY_GB);
            score += memory;
            rationale.push(format!("Quality priority memory={memory}GB"));
        }
        Priority::Balanced => {
            let latency = model.latency_ms.unwrap_or(DEFAULT_LATENCY_MS);
            let cost = model.cost_per_million.unwrap_or(0.0);
            score += model.memory_gb.unwrap_or(DEFAULT_MEMORY_GB) * 0.6;
            score -= f64::from(latency) / 1_500.0;
            score -= cost * 0.2;
            rationale.push(format!("Balanced score latency={latency} cost={cost}"));
        }
    }

    if model.is_cloud() {
        if !request.allow_cloud {
            return ScoreOutcome::disqualified("Cloud models disabled", rationale);
        }
        score -= CLOUD_PENALTY;
        rationale.push(format!("Cloud penalty -{CLOUD_PENALTY}"));
    } else {
        score += LOCAL_BONUS;
        rationale.push(format!("Local bonus +{LOCAL_BONUS}"));
    }

    ScoreOutcome {
        score,
        eligible: true,
        rationale,
    }
}

/// The engine's answer: the winning model with its score and the rationale
/// trail that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub model: ModelDescriptor,
    pub score: f64,
    pub rationale: Vec<String>,
}

/// Picks the best catalog model for `request`.
///
/// Returns [`GatewayError::NoCandidates`] when the catalog has nothing
/// declared for the task at all, and [`GatewayError::NoSuitableModel`]
/// when candidates existed but every one was disqualified, so callers can
/// tell "wrong task" apart from "nothing currently eligible".
pub fn recommend(
    config: &GatewayConfig,
    request: &RecommendRequest,
) -> Result<Recommendation, GatewayError> {
    let mut best: Option<(ModelDescriptor, ScoreOutcome)> = None;
    let mut saw_candidate = false;

    for (id, spec) in &config.models {
        if spec.task != request.task {
            continue;
        }
        saw_candidate = true;

        let outcome = score_model(spec, request);
        tracing::debug!(
            model = %id,
            score = outcome.score,
            eligible = outcome.eligible,
            "scored candidate"
        );
        if !outcome.eligible {
            continue;
        }
        if best
            .as_ref()
            .is_none_or(|(_, current)| outcome.score > current.score)
        {
            let descriptor = ModelDescriptor {
                id: id.clone(),
                spec: spec.clone(),
            };
            best = Some((descriptor, outcome));
        }
    }

    if !saw_candidate {
        return Err(GatewayError::NoCandidates(request.task));
    }
    let (model, outcome) = best.ok_or(GatewayError::NoSuitableModel)?;
    Ok(Recommendation {
        model,
        score: outcome.score,
        rationale: outcome.rationale,
    })
}

// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn model(task: TaskKind, provider: &str) -> ModelSpec {
        ModelSpec {
            label: provider.to_string(),
            provider: provider.to_string(),
            service: None,
            task,
            context: None,
            latency_ms: None,
            cost_per_million: None,
            memory_gb: None,
            endpoint: "http://backend.local/infer".to_string(),
            health: None,
            auth_env: None,
        }
    }

    fn request(task: TaskKind) -> RecommendRequest {
        RecommendRequest {
            task,
            context_tokens: 4096,
            priority: Priority::Balanced,
            allow_cloud: true,
        }
    }

    fn catalog(entries: Vec<(&str, ModelSpec)>) -> GatewayConfig {
        GatewayConfig {
            models: entries
                .into_iter()
                .map(|(id, spec)| (id.to_string(), spec))
                .collect(),
            profiles: IndexMap::new(),
            policies: IndexMap::new(),
        }
    }

    const ALL_PRIORITIES: [Priority; 4] = [
        Priority::Speed,
        Priority::Cost,
        Priority::Quality,
        Priority::Balanced,
    ];

    #[test]
    fn small_context_disqualifies_under_every_priority() {
        for priority in ALL_PRIORITIES {
            for provider in ["local", "cloud:openai"] {
                let spec = ModelSpec {
                    context: Some(2_048),
                    ..model(TaskKind::Chat, provider)
                };
                let outcome = score_model(
                    &spec,
                    &RecommendRequest {
                        priority,
                        ..request(TaskKind::Chat)
                    },
                );
                assert!(!outcome.eligible);
                assert_eq!(outcome.score, DISQUALIFIED);
                assert_eq!(outcome.rationale, vec!["Insufficient context window"]);
            }
        }
    }

    #[test]
    fn disqualified_model_never_beats_an_eligible_one() {
        let config = catalog(vec![
            (
                "huge",
                ModelSpec {
                    context: Some(1_000),
                    memory_gb: Some(64.0),
                    ..model(TaskKind::Chat, "local")
                },
            ),
            (
                "small",
                ModelSpec {
                    context: Some(8_192),
                    ..model(TaskKind::Chat, "local")
                },
            ),
        ]);
        let got = recommend(&config, &request(TaskKind::Chat)).unwrap();
        assert_eq!(got.model.id, "small");
    }

    #[test]
    fn exhausted_candidates_differ_from_absent_candidates() {
        let config = catalog(vec![(
            "tiny",
            ModelSpec {
                context: Some(1_024),
                ..model(TaskKind::Chat, "local")
            },
        )]);

        let err = recommend(&config, &request(TaskKind::Chat)).unwrap_err();
        assert!(matches!(err, GatewayError::NoSuitableModel));

        let err = recommend(&config, &request(TaskKind::Tts)).unwrap_err();
        assert!(matches!(err, GatewayError::NoCandidates(TaskKind::Tts)));
    }

    #[test]
    fn cloud_is_never_returned_when_disallowed() {
        let config = catalog(vec![
            (
                "api",
                ModelSpec {
                    memory_gb: Some(64.0),
                    latency_ms: Some(10),
                    ..model(TaskKind::Chat, "cloud:openai")
                },
            ),
            (
                "llama",
                ModelSpec {
                    memory_gb: Some(2.0),
                    latency_ms: Some(400),
                    ..model(TaskKind::Chat, "local")
                },
            ),
        ]);
        for priority in ALL_PRIORITIES {
            let got = recommend(
                &config,
                &RecommendRequest {
                    priority,
                    allow_cloud: false,
                    ..request(TaskKind::Chat)
                },
            )
            .unwrap();
            assert_eq!(got.model.id, "llama");
            assert!(!got.model.spec.is_cloud());
        }

        let cloud_only = catalog(vec![("api", model(TaskKind::Chat, "cloud:openai"))]);
        let err = recommend(
            &cloud_only,
            &RecommendRequest {
                allow_cloud: false,
                ..request(TaskKind::Chat)
            },
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::NoSuitableModel));
    }

    #[test]
    fn balanced_prefers_local_when_penalties_outweigh_memory() {
        let config = catalog(vec![
            (
                "gpt",
                ModelSpec {
                    memory_gb: Some(5.0),
                    latency_ms: Some(100),
                    cost_per_million: Some(2.0),
                    ..model(TaskKind::Chat, "cloud:openai")
                },
            ),
            (
                "qwen",
                ModelSpec {
                    memory_gb: Some(4.0),
                    latency_ms: Some(200),
                    cost_per_million: Some(0.0),
                    ..model(TaskKind::Chat, "local")
                },
            ),
        ]);
        let got = recommend(
            &config,
            &RecommendRequest {
                context_tokens: 1_024,
                ..request(TaskKind::Chat)
            },
        )
        .unwrap();
        assert_eq!(got.model.id, "qwen");
        let expected = 4.0 * 0.6 - 200.0 / 1_500.0 + LOCAL_BONUS;
        assert!((got.score - expected).abs() < 1e-9);
    }

    #[test]
    fn speed_priority_rewards_low_latency() {
        let config = catalog(vec![
            (
                "slow",
                ModelSpec {
                    latency_ms: Some(900),
                    ..model(TaskKind::Chat, "local")
                },
            ),
            (
                "quick",
                ModelSpec {
                    latency_ms: Some(80),
                    ..model(TaskKind::Chat, "local")
                },
            ),
        ]);
        let got = recommend(
            &config,
            &RecommendRequest {
                priority: Priority::Speed,
                ..request(TaskKind::Chat)
            },
        )
        .unwrap();
        assert_eq!(got.model.id, "quick");
        assert_eq!(
            got.rationale,
            vec!["Speed priority latency=80ms", "Local bonus +0.2"]
        );
    }

    #[test]
    fn quality_priority_uses_memory_as_proxy() {
        let config = catalog(vec![
            (
                "big-api",
                ModelSpec {
                    memory_gb: Some(8.0),
                    ..model(TaskKind::Chat, "cloud:openai")
                },
            ),
            (
                "mid-local",
                ModelSpec {
                    memory_gb: Some(4.0),
                    ..model(TaskKind::Chat, "local")
                },
            ),
        ]);
        // Cloud still wins on sheer footprint once the penalty is paid.
        let got = recommend(
            &config,
            &RecommendRequest {
                priority: Priority::Quality,
                ..request(TaskKind::Chat)
            },
        )
        .unwrap();
        assert_eq!(got.model.id, "big-api");
        assert!((got.score - (8.0 - CLOUD_PENALTY)).abs() < 1e-9);
    }

    #[test]
    fn ties_go_to_the_first_declared_candidate() {
        let config = catalog(vec![
            ("first", model(TaskKind::Code, "local")),
            ("second", model(TaskKind::Code, "local")),
        ]);
        let got = recommend(&config, &request(TaskKind::Code)).unwrap();
        assert_eq!(got.model.id, "first");
    }

    #[test]
    fn missing_metadata_falls_back_to_defaults() {
        let outcome = score_model(&model(TaskKind::Chat, "local"), &request(TaskKind::Chat));
        let expected = DEFAULT_MEMORY_GB * 0.6 - 10_000.0 / 1_500.0 + LOCAL_BONUS;
        assert!((outcome.score - expected).abs() < 1e-9);
        assert_eq!(
            outcome.rationale,
            vec!["Balanced score latency=10000 cost=0", "Local bonus +0.2"]
        );
    }

    #[test]
    fn identical_inputs_yield_identical_recommendations() {
        let config = catalog(vec![
            (
                "a",
                ModelSpec {
                    memory_gb: Some(3.0),
                    latency_ms: Some(150),
                    ..model(TaskKind::Chat, "local")
                },
            ),
            (
                "b",
                ModelSpec {
                    memory_gb: Some(6.0),
                    latency_ms: Some(700),
                    cost_per_million: Some(1.1),
                    ..model(TaskKind::Chat, "cloud:anthropic")
                },
            ),
        ]);
        let first = recommend(&config, &request(TaskKind::Chat)).unwrap();
        let second = recommend(&config, &request(TaskKind::Chat)).unwrap();
        assert_eq!(first.model.id, second.model.id);
        assert_eq!(first.score.to_bits(), second.score.to_bits());
        assert_eq!(first.rationale, second.rationale);
    }

    #[test]
    fn request_defaults_follow_the_wire_contract() {
        let req: RecommendRequest = serde_json::from_str(r#"{"task":"chat"}"#).unwrap();
        assert_eq!(req.context_tokens, 4096);
        assert_eq!(req.priority, Priority::Balanced);
        assert!(req.allow_cloud);
    }
}
