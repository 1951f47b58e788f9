//! Request handlers for the gateway's inbound surface.

use std::fs;

use axum::Json;
use axum::extract::{Path, State};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::{ModelDescriptor, Priority, TaskKind};
use crate::error::GatewayError;
use crate::recommend::{self as engine, RecommendRequest, Recommendation};
use crate::routing::{Resolution, RouteRequest};
use crate::state::AppState;

/// Liveness check. Reports the control plane's status when one is wired,
/// with `degraded` standing in for an unreachable or broken upstream.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let mut body = json!({ "status": "ok" });
    if let Some(control_plane) = &state.control_plane {
        let upstream = control_plane
            .health()
            .await
            .unwrap_or_else(|| "degraded".to_string());
        body["control_plane"] = Value::String(upstream);
    }
    Json(body)
}

/// Resolves a backend for the request without calling it.
pub async fn route(
    State(state): State<AppState>,
    Json(request): Json<RouteRequest>,
) -> Result<Json<Resolution>, GatewayError> {
    let snapshot = state.store.snapshot();
    let resolution = state.resolver.resolve(&snapshot, &request).await?;
    Ok(Json(resolution))
}

/// Proxy request body: routing hints plus the payload to forward.
#[derive(Debug, Deserialize)]
pub struct ProxyRequest {
    pub task: TaskKind,
    pub payload: Value,
    #[serde(default)]
    pub context_tokens: Option<u32>,
    #[serde(default)]
    pub complexity: Option<f64>,
    #[serde(default)]
    pub priority: Option<Priority>,
}

/// Resolves a backend and forwards the payload to it in one call.
pub async fn proxy(
    State(state): State<AppState>,
    Json(request): Json<ProxyRequest>,
) -> Result<Json<Value>, GatewayError> {
    let snapshot = state.store.snapshot();
    let route_request = RouteRequest {
        task: request.task,
        context_tokens: request.context_tokens,
        complexity: request.complexity,
        priority: request.priority,
        payload: None,
    };
    let resolution = state.resolver.resolve(&snapshot, &route_request).await?;
    let response = state
        .proxy
        .forward(&resolution.endpoint, &request.payload)
        .await?;
    Ok(Json(json!({
        "model": resolution.model,
        "endpoint": resolution.endpoint,
        "response": response,
    })))
}

/// Runs the recommendation engine against the local catalog.
pub async fn recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendRequest>,
) -> Result<Json<Recommendation>, GatewayError> {
    let snapshot = state.store.snapshot();
    let recommendation = engine::recommend(&snapshot, &request)?;
    Ok(Json(recommendation))
}

/// Lists the model catalog with ids inlined.
pub async fn list_models(State(state): State<AppState>) -> Json<Vec<ModelDescriptor>> {
    let snapshot = state.store.snapshot();
    let models = snapshot
        .models
        .iter()
        .map(|(id, spec)| ModelDescriptor {
            id: id.clone(),
            spec: spec.clone(),
        })
        .collect();
    Json(models)
}

#[derive(Debug, Serialize)]
pub struct ProfileEntry {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub routing: IndexMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct ProfilesResponse {
    pub active_profile: String,
    pub profiles: Vec<ProfileEntry>,
}

/// Lists routing profiles plus which one is active.
pub async fn list_profiles(State(state): State<AppState>) -> Json<ProfilesResponse> {
    let snapshot = state.store.snapshot();
    let profiles = snapshot
        .profiles
        .iter()
        .map(|(name, profile)| ProfileEntry {
            name: name.clone(),
            description: profile.description.clone(),
            routing: profile.routing.clone(),
        })
        .collect();
    Json(ProfilesResponse {
        active_profile: state.profiles.active_profile(),
        profiles,
    })
}

/// Activates a named profile. The change is durable before the reply.
pub async fn activate_profile(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, GatewayError> {
    state.profiles.activate(&name)?;
    Ok(Json(json!({ "status": "ok", "active_profile": name })))
}

#[derive(Debug, Deserialize)]
pub struct RoutingUpdate {
    pub task: TaskKind,
    pub model_id: String,
}

/// Rewires one task in a profile's routing table and returns the updated
/// table.
pub async fn update_routing(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(update): Json<RoutingUpdate>,
) -> Result<Json<Value>, GatewayError> {
    let routing = state
        .profiles
        .set_routing(&name, update.task, &update.model_id)
        .await?;
    Ok(Json(json!({
        "status": "ok",
        "profile": name,
        "routing": routing,
    })))
}

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub model_id: String,
}

/// Schedules a model download by dropping a marker file for the download
/// worker to pick up. The path id and body id must agree.
pub async fn schedule_download(
    State(state): State<AppState>,
    Path(model_id): Path<String>,
    Json(request): Json<DownloadRequest>,
) -> Result<Json<Value>, GatewayError> {
    if request.model_id != model_id {
        return Err(GatewayError::ModelIdMismatch);
    }
    let snapshot = state.store.snapshot();
    if !snapshot.models.contains_key(&model_id) {
        return Err(GatewayError::UnknownModel(model_id));
    }

    fs::create_dir_all(&state.downloads_dir).map_err(|err| {
        GatewayError::Config(format!(
            "cannot create {}: {err}",
            state.downloads_dir.display()
        ))
    })?;
    let marker = state.downloads_dir.join(format!("{model_id}.pending"));
    fs::write(&marker, b"").map_err(|err| {
        GatewayError::Config(format!("cannot write {}: {err}", marker.display()))
    })?;

    tracing::info!(model = %model_id, marker = %marker.display(), "download scheduled");
    Ok(Json(json!({ "status": "scheduled", "model_id": model_id })))
}
