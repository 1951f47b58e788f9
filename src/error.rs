//! Gateway error taxonomy and its HTTP surface.
//!
//! Every fallible path in the crate funnels into [`GatewayError`]. Handlers
//! return it directly; the [`IntoResponse`] impl renders the structured JSON
//! body that clients see.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::config::TaskKind;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Configuration could not be read, parsed, or validated.
    #[error("configuration error: {0}")]
    Config(String),

    /// No routing policy exists for the requested task.
    #[error("unsupported task: {0}")]
    UnsupportedTask(TaskKind),

    /// The named profile does not exist in the policy store.
    #[error("unknown profile: {0}")]
    UnknownProfile(String),

    /// The named model does not exist in the catalog.
    #[error("unknown model: {0}")]
    UnknownModel(String),

    /// A policy selected a model id that is missing from the catalog.
    #[error("model {0} is referenced by a routing policy but not configured")]
    DanglingModel(String),

    /// A policy is missing the alternate slot a selector branch requires.
    #[error("policy for task {task} has no {slot} model configured")]
    IncompletePolicy { task: TaskKind, slot: &'static str },

    /// The catalog has no models at all for the requested task.
    #[error("no models available for task {0}")]
    NoCandidates(TaskKind),

    /// Candidates existed but every one was disqualified.
    #[error("no suitable model found")]
    NoSuitableModel,

    /// The selected backend could not be reached or answered abnormally.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A complexity hint fell outside its documented range.
    #[error("complexity must be between 0.0 and 1.0, got {0}")]
    InvalidComplexity(f64),

    /// Download request body names a different model than the path.
    #[error("model id in body does not match path")]
    ModelIdMismatch,
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Config(_) | Self::DanglingModel(_) | Self::IncompletePolicy { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::UnsupportedTask(_)
            | Self::UnknownProfile(_)
            | Self::UnknownModel(_)
            | Self::NoCandidates(_) => StatusCode::NOT_FOUND,
            Self::NoSuitableModel => StatusCode::SERVICE_UNAVAILABLE,
            Self::BackendUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::InvalidComplexity(_) | Self::ModelIdMismatch => StatusCode::BAD_REQUEST,
        }
    }

    /// Machine-readable discriminant for the JSON error body.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_error",
            Self::UnsupportedTask(_) => "unsupported_task",
            Self::UnknownProfile(_) => "unknown_profile",
            Self::UnknownModel(_) => "unknown_model",
            Self::DanglingModel(_) => "dangling_model",
            Self::IncompletePolicy { .. } => "incomplete_policy",
            Self::NoCandidates(_) => "no_candidates",
            Self::NoSuitableModel => "no_suitable_model",
            Self::BackendUnavailable(_) => "backend_unavailable",
            Self::InvalidComplexity(_) => "invalid_complexity",
            Self::ModelIdMismatch => "model_id_mismatch",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), "{self}");
        }
        let body = json!({
            "error": {
                "message": self.to_string(),
                "type": self.kind(),
                "code": status.as_u16(),
            }
        });
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(
            GatewayError::UnsupportedTask(TaskKind::Tts).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::UnknownProfile("nope".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::DanglingModel("ghost".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            GatewayError::NoCandidates(TaskKind::Chat).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::NoSuitableModel.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            GatewayError::BackendUnavailable("timeout".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            GatewayError::InvalidComplexity(5.0).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::ModelIdMismatch.status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn kind_is_stable_for_clients() {
        assert_eq!(GatewayError::NoSuitableModel.kind(), "no_suitable_model");
        assert_eq!(
            GatewayError::IncompletePolicy {
                task: TaskKind::Chat,
                slot: "complex",
            }
            .kind(),
            "incomplete_policy"
        );
    }
}
