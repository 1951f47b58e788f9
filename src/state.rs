//! Shared per-process state threaded through the HTTP handlers.

use std::path::PathBuf;
use std::sync::Arc;

use crate::profiles::ProfileManager;
use crate::proxy::DispatchProxy;
use crate::recommend::ControlPlaneClient;
use crate::routing::RouteResolver;
use crate::store::PolicyStore;

/// Everything a handler needs, cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<PolicyStore>,
    pub profiles: Arc<ProfileManager>,
    pub resolver: Arc<RouteResolver>,
    pub proxy: Arc<DispatchProxy>,
    /// Present when a control-plane URL was configured. The health
    /// endpoint uses it to report upstream status.
    pub control_plane: Option<ControlPlaneClient>,
    /// Directory download markers are dropped into.
    pub downloads_dir: PathBuf,
}

impl AppState {
    pub fn new(
        store: PolicyStore,
        state_path: PathBuf,
        control_plane: Option<ControlPlaneClient>,
        downloads_dir: PathBuf,
    ) -> Self {
        let store = Arc::new(store);
        Self {
            profiles: Arc::new(ProfileManager::new(store.clone(), state_path)),
            resolver: Arc::new(RouteResolver::new(control_plane.clone())),
            proxy: Arc::new(DispatchProxy::new()),
            control_plane,
            downloads_dir,
            store,
        }
    }
}
