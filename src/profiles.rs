//! Active-profile tracking.
//!
//! Exactly one named profile is active at a time. The selection lives in a
//! tiny JSON state file that is read on every query and replaced wholesale
//! on activation, so a restart (or a second process sharing the state
//! file) always picks up the last activation.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::TaskKind;
use crate::error::GatewayError;
use crate::store::PolicyStore;

/// Profile assumed when no activation has ever been persisted.
pub const DEFAULT_PROFILE: &str = "default";

#[derive(Debug, Serialize, Deserialize)]
struct ActiveProfileState {
    active_profile: String,
}

pub struct ProfileManager {
    store: Arc<PolicyStore>,
    state_path: PathBuf,
}

impl ProfileManager {
    pub fn new(store: Arc<PolicyStore>, state_path: impl Into<PathBuf>) -> Self {
        Self {
            store,
            state_path: state_path.into(),
        }
    }

    /// Name of the currently active profile. Falls back to
    /// [`DEFAULT_PROFILE`] when the state file is missing or unreadable.
    pub fn active_profile(&self) -> String {
        fs::read_to_string(&self.state_path)
            .ok()
            .and_then(|raw| serde_json::from_str::<ActiveProfileState>(&raw).ok())
            .map(|state| state.active_profile)
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string())
    }

    /// Makes `name` the active profile, durably, before returning.
    /// Re-activating the already-active profile succeeds and changes
    /// nothing.
    pub fn activate(&self, name: &str) -> Result<(), GatewayError> {
        if !self.store.snapshot().profiles.contains_key(name) {
            return Err(GatewayError::UnknownProfile(name.to_string()));
        }
        let state = ActiveProfileState {
            active_profile: name.to_string(),
        };
        let rendered = serde_json::to_string_pretty(&state)
            .map_err(|err| GatewayError::Config(format!("cannot serialize profile state: {err}")))?;
        if let Some(parent) = self.state_path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                GatewayError::Config(format!("cannot create {}: {err}", parent.display()))
            })?;
        }
        fs::write(&self.state_path, rendered).map_err(|err| {
            GatewayError::Config(format!("cannot write {}: {err}", self.state_path.display()))
        })?;
        tracing::info!(profile = name, "profile activated");
        Ok(())
    }

    /// Rewires one task inside a profile's routing table. Persistence and
    /// snapshot invalidation are owned by the policy store.
    pub async fn set_routing(
        &self,
        profile: &str,
        task: TaskKind,
        model_id: &str,
    ) -> Result<IndexMap<String, String>, GatewayError> {
        self.store.update_routing(profile, task, model_id).await
    }
}

// ---------------------------------------------------------------------------
