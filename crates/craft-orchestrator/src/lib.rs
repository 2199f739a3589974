//! # craft-orchestrator: Transaction Orchestrator.
//!
//! Sequences dependent writes for one logical action:
//! `Idle -> AwaitingStep(i) -> Confirming(i) -> ... -> Succeeded | Failed`.
//! Step `i + 1` is submitted only after step `i` is confirmed. Preconditions
//! are checked against one fresh cache snapshot before anything is submitted,
//! and at most one run per action key is active at a time.

pub mod actions;
pub mod machine;
pub mod status;

pub use actions::{Delegate, MintGamePiece};
pub use machine::{Action, Orchestrator, RunHandle};
pub use status::{OrchestrationStatus, RunReport};
