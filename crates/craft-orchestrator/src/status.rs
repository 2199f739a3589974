//! Combined status of an orchestration run.

use std::fmt;

use craft_core::error::FailureReason;
use craft_core::types::{ActionKey, TransactionHandle};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OrchestrationStatus {
    #[default]
    Idle,
    /// Step `i` is being submitted.
    AwaitingStep(usize),
    /// Step `i` was submitted and is waiting for finality.
    Confirming(usize),
    Succeeded,
    Failed(FailureReason),
}

impl OrchestrationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrchestrationStatus::Succeeded | OrchestrationStatus::Failed(_))
    }
}

impl fmt::Display for OrchestrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrchestrationStatus::Idle => write!(f, "idle"),
            OrchestrationStatus::AwaitingStep(i) => write!(f, "submitting step {}", i + 1),
            OrchestrationStatus::Confirming(i) => write!(f, "confirming step {}", i + 1),
            OrchestrationStatus::Succeeded => write!(f, "succeeded"),
            OrchestrationStatus::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Outcome of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub key: ActionKey,
    /// `Succeeded` or `Failed`.
    pub status: OrchestrationStatus,
    /// One handle per submitted step, in order.
    pub handles: Vec<TransactionHandle>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.status == OrchestrationStatus::Succeeded
    }
}
