//! # craft-sync: Contract State Cache.
//!
//! Keeps contract reads consistent with the chain head:
//! - every registered view contributes a [`ReadBatch`]; a refresh unions and
//!   deduplicates them into one gateway batch pinned at one block height
//! - a new block height invalidates every result at once; snapshots are
//!   swapped atomically so an observation never mixes blocks
//! - gateway failures keep the last snapshot and mark the cache degraded
//!
//! [`BlockWatcher`] drives refreshes from a tokio interval.

pub mod cache;
pub mod views;
pub mod watcher;

pub use cache::{ContractStateCache, Observation, ViewReads};
pub use views::ReadBatch;
pub use watcher::BlockWatcher;
