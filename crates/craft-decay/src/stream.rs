//! Monthly stream rate of a slowlock checkpoint.

use alloy_primitives::U256;
use craft_core::constants::STREAM_RATE_HORIZON_SECS;
use craft_core::error::DecayError;
use craft_core::types::{DecayCheckpoint, Timestamp};

use crate::engine::DecayEngine;

/// Amount released between `now` and `now + 30 days`.
pub fn monthly_emission(
    engine: &DecayEngine,
    checkpoint: &DecayCheckpoint,
    now: Timestamp,
) -> Result<U256, DecayError> {
    let current = engine.decayed_value(checkpoint, now)?;
    let target = engine.decayed_value(checkpoint, now.saturating_add(STREAM_RATE_HORIZON_SECS))?;
    Ok(stream_rate_from_pair(target, current))
}

/// Rate from the `(target, current)` pair `decayedBalanceAt(now + 30 days)` returns.
pub fn stream_rate_from_pair(target: U256, current: U256) -> U256 {
    current.saturating_sub(target)
}
