//! HTTP surface assembly.

pub mod handlers;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Builds the gateway router with every inbound endpoint wired.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/route", post(handlers::route))
        .route("/proxy", post(handlers::proxy))
        .route("/recommend", post(handlers::recommend))
        .route("/models", get(handlers::list_models))
        .route("/models/{model_id}/download", post(handlers::schedule_download))
        .route("/profiles", get(handlers::list_profiles))
        .route("/profiles/{name}/activate", post(handlers::activate_profile))
        .route("/profiles/{name}/routing", post(handlers::update_routing))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
