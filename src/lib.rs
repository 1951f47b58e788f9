//! Crossbar routes inference requests (chat, code, vision, speech) across
//! local and cloud model backends.
//!
//! A request moves through three stages. The [`store::PolicyStore`] hands
//! out an immutable configuration snapshot. The [`routing::RouteResolver`]
//! picks a backend for the request's task, consulting the control plane
//! when the task's policy opts in and falling back to a static per-task
//! selector otherwise. The [`proxy::DispatchProxy`] then forwards the
//! payload to the chosen endpoint. The admin surface mutates profiles and
//! routing tables through the same store, so readers always see whole
//! configurations.

pub mod api;
pub mod config;
pub mod error;
pub mod profiles;
pub mod proxy;
pub mod recommend;
pub mod routing;
pub mod state;
pub mod store;
pub mod warmup;

pub use config::{GatewayConfig, TaskKind};
pub use error::GatewayError;
pub use state::AppState;
