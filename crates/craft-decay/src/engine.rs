//! Decay engine: the decayed value of a checkpoint at any time.
//!
//! `value * 2^(-elapsed / half_life)` in X96 fixed point. Whole half-lives
//! are an exact right shift, the remainder is composed from the table, and
//! the result is floored once. No transcendental computation at call time.

use alloy_primitives::U256;
use craft_core::constants::X96_BITS;
use craft_core::error::DecayError;
use craft_core::types::{DecayCheckpoint, Timestamp};

use crate::table::DecayTable;
use crate::wide::{narrow, widen};

/// Evaluates decayed values against one precomputed [`DecayTable`].
#[derive(Debug, Clone)]
pub struct DecayEngine {
    table: DecayTable,
}

impl DecayEngine {
    /// Engine with the on-chain table layout for `half_life_seconds`.
    pub fn new(half_life_seconds: u64) -> Result<Self, DecayError> {
        Ok(Self { table: DecayTable::for_half_life(half_life_seconds)? })
    }

    pub fn with_table(table: DecayTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &DecayTable {
        &self.table
    }

    /// Value of `checkpoint` at `at_time`.
    ///
    /// Before the checkpoint the value grows back; growth past `U256` is
    /// [`DecayError::ArithmeticOverflow`].
    pub fn decayed_value(
        &self,
        checkpoint: &DecayCheckpoint,
        at_time: Timestamp,
    ) -> Result<U256, DecayError> {
        if checkpoint.half_life_seconds() != self.table.half_life_seconds() {
            return Err(DecayError::HalfLifeMismatch {
                table: self.table.half_life_seconds(),
                checkpoint: checkpoint.half_life_seconds(),
            });
        }
        let balance = checkpoint.checkpoint_balance();
        let start = checkpoint.checkpoint_time();
        if at_time >= start {
            Ok(self.decay(balance, at_time - start))
        } else {
            self.grow(balance, start - at_time)
        }
    }

    /// `balance * 2^(-elapsed / half_life)`, floored. Never fails; underflow is zero.
    pub fn decay(&self, balance: U256, elapsed: u64) -> U256 {
        let half_life = self.table.half_life_seconds();
        let halvings = elapsed / half_life;
        if halvings >= 256 || balance.is_zero() {
            return U256::ZERO;
        }
        let factor = self.table.remainder_factor(elapsed % half_life);
        let scaled = (widen(balance) * factor) >> (X96_BITS + halvings as usize);
        // balance * factor / 2^96 <= balance
        narrow(scaled).unwrap_or(U256::MAX)
    }

    /// `balance * 2^(elapsed / half_life)`, floored.
    pub fn grow(&self, balance: U256, elapsed: u64) -> Result<U256, DecayError> {
        if balance.is_zero() {
            return Ok(U256::ZERO);
        }
        let half_life = self.table.half_life_seconds();
        let halvings = elapsed / half_life;
        if halvings as usize + balance.bit_len() > 256 {
            return Err(DecayError::ArithmeticOverflow);
        }
        let factor = self.table.remainder_factor(elapsed % half_life);
        if factor.is_zero() {
            return Err(DecayError::ArithmeticOverflow);
        }
        let scaled = (widen(balance) << (halvings as usize + X96_BITS)) / factor;
        narrow(scaled).ok_or(DecayError::ArithmeticOverflow)
    }
}

/// Value of `checkpoint` at `at_time`, with a table generated for its half-life.
///
/// Table generation dominates the cost; hold a [`DecayEngine`] for repeated use.
pub fn decayed_value(checkpoint: &DecayCheckpoint, at_time: Timestamp) -> Result<U256, DecayError> {
    DecayEngine::new(checkpoint.half_life_seconds())?.decayed_value(checkpoint, at_time)
}
