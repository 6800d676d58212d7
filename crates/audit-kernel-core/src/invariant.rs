//! Invariants: named predicates over full event history.
//!
//! The kernel evaluates every registered invariant after each append and
//! records failures as `invariant.failed` events. Severity is advisory at
//! this level; halting policy belongs to the kernel's caller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::crypto::RunId;
use crate::event::{Event, EventType};
use crate::payload::EventPayload;

/// How bad a violation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warn,
    Error,
    Fatal,
}

/// Outcome of one invariant check.
#[derive(Debug, Clone, PartialEq)]
pub struct InvariantResult {
    pub valid: bool,
    pub message: Option<String>,
    pub severity: Severity,
}

impl InvariantResult {
    /// A passing check.
    pub fn ok() -> Self {
        Self {
            valid: true,
            message: None,
            severity: Severity::Warn,
        }
    }

    /// A failing check with a diagnostic.
    pub fn violation(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: Some(message.into()),
            severity,
        }
    }
}

/// A named, described predicate over `(full event history, run id)`.
///
/// Implementations must be stateless between invocations except for reading
/// the history they are handed.
#[async_trait]
pub trait Invariant: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    async fn check(&self, events: &[Event], run_id: &RunId) -> InvariantResult;
}

/// Reference rule: every tool request must cite a decision in its causes.
///
/// Checks the most recently appended event; if it is a `tool.requested`,
/// at least one of its causes must resolve to a `decision.made`.
pub struct PlanBeforeAction;

#[async_trait]
impl Invariant for PlanBeforeAction {
    fn name(&self) -> &str {
        "plan_before_action"
    }

    fn description(&self) -> &str {
        "All tool requests must be preceded by a recorded decision."
    }

    async fn check(&self, events: &[Event], _run_id: &RunId) -> InvariantResult {
        let Some(last) = events.last() else {
            return InvariantResult::ok();
        };
        if last.event_type != EventType::ToolRequested {
            return InvariantResult::ok();
        }

        let has_decision = last.causes.iter().any(|cause_id| {
            events
                .iter()
                .any(|e| e.id == *cause_id && e.event_type == EventType::DecisionMade)
        });
        if has_decision {
            return InvariantResult::ok();
        }

        let tool = match last.typed_payload() {
            Ok(EventPayload::ToolRequested(req)) => req.tool,
            _ => "<unknown>".to_string(),
        };
        InvariantResult::violation(
            Severity::Error,
            format!("tool {tool} requested without a decision cause"),
        )
    }
}
