//! Policy store: the live configuration and its snapshot discipline.
//!
//! The store owns the parsed [`GatewayConfig`] behind an atomically
//! swappable handle. Request handlers take one snapshot and evaluate the
//! whole request against it; administrative updates clone the current
//! config, apply the change, persist the file, then swap the handle.
//! Readers never observe a half-applied configuration.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;
use tokio::sync::Mutex;

use crate::config::{GatewayConfig, TaskKind};
use crate::error::GatewayError;

#[derive(Debug)]
pub struct PolicyStore {
    path: PathBuf,
    /// Current snapshot. Readers clone the Arc and drop the lock right away.
    snapshot: RwLock<Arc<GatewayConfig>>,
    /// Serializes mutations end to end, including the file write.
    write_guard: Mutex<()>,
}

impl PolicyStore {
    /// Parses the configuration file and seeds the first snapshot.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, GatewayError> {
        let path = path.into();
        let config = GatewayConfig::load(&path)?;
        Ok(Self {
            snapshot: RwLock::new(Arc::new(config)),
            write_guard: Mutex::new(()),
            path,
        })
    }

    /// Returns the current configuration snapshot. The handle stays valid
    /// (and unchanged) for as long as the caller holds it, even if an
    /// update swaps the store underneath.
    pub fn snapshot(&self) -> Arc<GatewayConfig> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Points `task` at `model_id` inside `profile`, persists the whole
    /// configuration file, then swaps the snapshot. The update is keyed:
    /// entries for other tasks in the same profile are untouched, and
    /// concurrent updates are serialized rather than lost.
    pub async fn update_routing(
        &self,
        profile: &str,
        task: TaskKind,
        model_id: &str,
    ) -> Result<IndexMap<String, String>, GatewayError> {
        let _guard = self.write_guard.lock().await;

        let mut config = self.snapshot().as_ref().clone();
        let entry = config
            .profiles
            .get_mut(profile)
            .ok_or_else(|| GatewayError::UnknownProfile(profile.to_string()))?;
        if !config.models.contains_key(model_id) {
            return Err(GatewayError::UnknownModel(model_id.to_string()));
        }
        entry
            .routing
            .insert(task.as_str().to_string(), model_id.to_string());
        let routing = entry.routing.clone();

        config.save(&self.path)?;
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(config);

        tracing::info!(profile, task = %task, model = model_id, "routing table updated");
        Ok(routing)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

// ---------------------------------------------------------------------------
