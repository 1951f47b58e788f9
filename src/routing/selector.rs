//! Static per-task model selection.
//!
//! One selector variant per task that has specialized logic, plus an
//! explicit default variant for everything else, so an unhandled task can
//! never fall through a lookup silently.

use crate::config::{Priority, TaskKind, TaskPolicy};
use crate::error::GatewayError;

use super::RouteRequest;

/// Complexity assumed when a chat request does not state one.
const DEFAULT_COMPLEXITY: f64 = 0.3;

/// Which selection algorithm serves a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSelector {
    /// Context-window and priority aware code routing.
    Code,
    /// Complexity-banded chat routing with a lightweight fast path.
    Chat,
    /// Straight to the policy's default model.
    Default,
}

impl TaskSelector {
    pub fn for_task(task: TaskKind) -> Self {
        match task {
            TaskKind::Code => Self::Code,
            TaskKind::Chat => Self::Chat,
            TaskKind::Vision | TaskKind::Asr | TaskKind::Tts => Self::Default,
        }
    }

    /// Picks a model id for the request out of the task's policy. A branch
    /// landing on an unconfigured alternate slot is a policy defect and
    /// surfaces as [`GatewayError::IncompletePolicy`].
    pub fn select(
        &self,
        policy: &TaskPolicy,
        request: &RouteRequest,
    ) -> Result<String, GatewayError> {
        match self {
            Self::Code => select_code(policy, request),
            Self::Chat => select_chat(policy, request),
            Self::Default => Ok(policy.default_model.clone()),
        }
    }
}

fn select_code(policy: &TaskPolicy, request: &RouteRequest) -> Result<String, GatewayError> {
    let over_cutoff = request
        .context_tokens
        .is_some_and(|tokens| tokens > policy.thresholds.context_tokens);
    if over_cutoff {
        return required(policy.long_context.as_ref(), request.task, "long_context");
    }
    if request.priority == Some(Priority::Speed) {
        // TODO: the long-context entry doubles as the "faster" alternative
        // here. Confirm with product whether speed-priority code requests
        // really want the long-context model before changing it.
        return required(policy.long_context.as_ref(), request.task, "long_context");
    }
    Ok(policy.default_model.clone())
}

fn select_chat(policy: &TaskPolicy, request: &RouteRequest) -> Result<String, GatewayError> {
    if request.priority == Some(Priority::Speed) {
        if let Some(lightweight) = &policy.lightweight {
            return Ok(lightweight.clone());
        }
    }
    let complexity = request.complexity.unwrap_or(DEFAULT_COMPLEXITY);
    if complexity >= policy.thresholds.complexity {
        required(policy.complex.as_ref(), request.task, "complex")
    } else {
        required(policy.balanced.as_ref(), request.task, "balanced")
    }
}

fn required(
    slot: Option<&String>,
    task: TaskKind,
    name: &'static str,
) -> Result<String, GatewayError> {
    slot.cloned()
        .ok_or(GatewayError::IncompletePolicy { task, slot: name })
}

// ---------------------------------------------------------------------------
