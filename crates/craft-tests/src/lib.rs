//! Integration test suite for the craft client.
//!
//! The tests in `tests/` wire the cache, the watcher and the orchestrator to
//! an in-memory [`MockChain`](craft_core::testing::MockChain) and check the
//! client-level guarantees: one block per observation, no submission on a
//! failed precondition, and strictly sequenced approve-then-act runs.

pub mod helpers;
