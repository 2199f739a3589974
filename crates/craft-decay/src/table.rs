//! Decay factor tables.
//!
//! Entry `i` of a table is `floor(2^(-2^i / half_life) * 2^96)`: the X96
//! factor for an elapsed time of `2^i` seconds. The slowlock contract stores
//! the same 32 entries and composes them bit by bit, so generation here must
//! be exact. Factors are computed with integer series at 192 fractional bits
//! and floored once.

use alloy_primitives::{U256, U512};
use craft_core::constants::{DECAY_TABLE_SIZE, X96_BITS};
use craft_core::error::DecayError;
use tracing::debug;

use crate::wide::{narrow, one_shl, shr, WORK_BITS};

/// Largest supported table: elapsed times up to `2^63` seconds.
pub const MAX_TABLE_SIZE: usize = 64;

/// `ln(2)` at [`WORK_BITS`] fractional bits, as `sum_{k>=1} 1 / (k * 2^k)`.
fn ln2_scaled() -> U512 {
    let one = one_shl(WORK_BITS);
    let mut sum = U512::ZERO;
    let mut k = 1usize;
    loop {
        let term = one / (U512::from(k) << k);
        if term.is_zero() {
            return sum;
        }
        sum += term;
        k += 1;
    }
}

/// `exp(-y)` for `0 <= y < 1`, both at [`WORK_BITS`] fractional bits.
fn exp_neg_scaled(y: U512) -> U512 {
    let one = one_shl(WORK_BITS);
    let mut positive = one;
    let mut negative = U512::ZERO;
    let mut term = one;
    let mut n = 1u64;
    loop {
        term = term * y / one / U512::from(n);
        if term.is_zero() {
            return positive - negative;
        }
        if n % 2 == 1 {
            negative += term;
        } else {
            positive += term;
        }
        n += 1;
    }
}

/// `2^(-elapsed / half_life)` at [`WORK_BITS`] fractional bits.
///
/// `2^(-q - r/h) = 2^(-q) * exp(-(r/h) * ln 2)` with `q`, `r` the quotient and
/// remainder of `elapsed / half_life`.
pub(crate) fn exp2_neg_ratio_scaled(elapsed: u64, half_life: u64, ln2: U512) -> U512 {
    let q = elapsed / half_life;
    let r = elapsed % half_life;
    let y = U512::from(r) * ln2 / U512::from(half_life);
    shr(exp_neg_scaled(y), q)
}

/// `2^(-elapsed / half_life)` at 192 fractional bits, computed directly.
///
/// The reference the composed table lookups are checked against.
pub fn exact_factor_x192(elapsed: u64, half_life: u64) -> Result<U512, DecayError> {
    if half_life == 0 {
        return Err(DecayError::ZeroHalfLife);
    }
    Ok(exp2_neg_ratio_scaled(elapsed, half_life, ln2_scaled()))
}

/// `floor(2^(-2^i / half_life) * 2^96)` for `i in [0, count)`.
pub fn decay_factors_x96(half_life_seconds: u64, count: usize) -> Result<Vec<U256>, DecayError> {
    if half_life_seconds == 0 {
        return Err(DecayError::ZeroHalfLife);
    }
    if count == 0 || count > MAX_TABLE_SIZE {
        return Err(DecayError::InvalidTableSize(count));
    }
    let ln2 = ln2_scaled();
    (0..count)
        .map(|i| {
            let scaled = exp2_neg_ratio_scaled(1u64 << i, half_life_seconds, ln2);
            narrow(scaled >> (WORK_BITS - X96_BITS)).ok_or(DecayError::ArithmeticOverflow)
        })
        .collect()
}

/// Smallest table size whose entries cover every remainder below `half_life`.
pub fn required_size(half_life_seconds: u64) -> usize {
    let max_remainder = half_life_seconds.saturating_sub(1);
    (64 - max_remainder.leading_zeros() as usize).max(1)
}

/// Precomputed factors for one half-life.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecayTable {
    half_life_seconds: u64,
    factors: Vec<U256>,
}

impl DecayTable {
    /// Generate a table of `size` entries.
    ///
    /// Fails unless `half_life_seconds > 0`, `1 <= size <= 64` and the table
    /// covers every remainder (`2^size >= half_life_seconds`).
    pub fn new(half_life_seconds: u64, size: usize) -> Result<Self, DecayError> {
        if size == 0 || size > MAX_TABLE_SIZE {
            return Err(DecayError::InvalidTableSize(size));
        }
        if half_life_seconds == 0 {
            return Err(DecayError::ZeroHalfLife);
        }
        if size < required_size(half_life_seconds) {
            return Err(DecayError::TableTooSmall { size, half_life: half_life_seconds });
        }
        let factors = decay_factors_x96(half_life_seconds, size)?;
        debug!(half_life = half_life_seconds, size, "generated decay table");
        Ok(Self { half_life_seconds, factors })
    }

    /// The on-chain layout: 32 entries, or more if the half-life needs them.
    pub fn for_half_life(half_life_seconds: u64) -> Result<Self, DecayError> {
        Self::new(half_life_seconds, required_size(half_life_seconds).max(DECAY_TABLE_SIZE))
    }

    pub fn half_life_seconds(&self) -> u64 {
        self.half_life_seconds
    }

    pub fn factors(&self) -> &[U256] {
        &self.factors
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    /// X96 factor for `remainder < half_life` seconds, composed from the set bits.
    pub(crate) fn remainder_factor(&self, remainder: u64) -> U512 {
        let mut acc = one_shl(X96_BITS);
        for (i, factor) in self.factors.iter().enumerate() {
            if remainder >> i & 1 == 1 {
                acc = (acc * crate::wide::widen(*factor)) >> X96_BITS;
            }
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const THIRTY_DAYS: u64 = 30 * 86_400;

    fn u(s: &str) -> U256 {
        s.parse().unwrap()
    }

    #[test]
    fn ln2_matches_known_digits() {
        // ln 2 * 2^64 = 12786308645202655659.86...
        let ln2 = ln2_scaled() >> (WORK_BITS - 64);
        assert_eq!(ln2, U512::from(12_786_308_645_202_655_659u64));
    }

    #[test]
    fn thirty_day_table_reference_values() {
        let table = decay_factors_x96(THIRTY_DAYS, 32).unwrap();
        assert_eq!(table[0], u("79228141327238826465593588720"));
        assert_eq!(table[1], u("79228120140218981126622346340"));
        assert_eq!(table[10], u("79206469967474899561996995272"));
        assert_eq!(table[21], u("45218932159695465736903884781"));
        assert_eq!(table[22], u("25808396418319068777778373408"));
        assert_eq!(table[25], u("10044563782561648476946695"));
        assert_eq!(table[31], U256::ZERO);
    }

    #[test]
    fn exact_half_life_is_one_half() {
        let f = exact_factor_x192(THIRTY_DAYS, THIRTY_DAYS).unwrap();
        assert_eq!(f, one_shl(WORK_BITS - 1));
    }

    #[test]
    fn factors_strictly_decrease_until_zero() {
        let table = decay_factors_x96(THIRTY_DAYS, 32).unwrap();
        for w in table.windows(2) {
            assert!(w[1] < w[0] || w[0].is_zero());
        }
        assert!(table[0] < U256::from(1u64) << 96);
    }

    #[test]
    fn zero_half_life_rejected() {
        assert_eq!(decay_factors_x96(0, 32), Err(DecayError::ZeroHalfLife));
        assert_eq!(DecayTable::new(0, 32), Err(DecayError::ZeroHalfLife));
    }

    #[test]
    fn table_size_bounds() {
        assert_eq!(DecayTable::new(60, 0), Err(DecayError::InvalidTableSize(0)));
        assert_eq!(DecayTable::new(60, 65), Err(DecayError::InvalidTableSize(65)));
        assert!(DecayTable::new(60, 64).is_ok());
    }

    #[test]
    fn table_must_cover_half_life() {
        // 2^21 < 2_592_000 <= 2^22
        assert_eq!(
            DecayTable::new(THIRTY_DAYS, 21),
            Err(DecayError::TableTooSmall { size: 21, half_life: THIRTY_DAYS })
        );
        assert_eq!(DecayTable::new(THIRTY_DAYS, 22).unwrap().len(), 22);
    }

    #[test]
    fn required_size_edges() {
        assert_eq!(required_size(1), 1);
        assert_eq!(required_size(2), 1);
        assert_eq!(required_size(3), 2);
        assert_eq!(required_size(1 << 20), 20);
        assert_eq!(required_size((1 << 20) + 1), 21);
        assert_eq!(required_size(u64::MAX), 64);
    }

    #[test]
    fn for_half_life_uses_onchain_size() {
        let table = DecayTable::for_half_life(THIRTY_DAYS).unwrap();
        assert_eq!(table.len(), DECAY_TABLE_SIZE);
        assert_eq!(table.half_life_seconds(), THIRTY_DAYS);
    }

    #[test]
    fn remainder_zero_is_one() {
        let table = DecayTable::for_half_life(THIRTY_DAYS).unwrap();
        assert_eq!(table.remainder_factor(0), one_shl(X96_BITS));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn longer_half_life_decays_less(half_life in 1u64..=10_000_000, extra in 1u64..=1_000_000) {
            let short = decay_factors_x96(half_life, 24).unwrap();
            let long = decay_factors_x96(half_life + extra, 24).unwrap();
            for (s, l) in short.iter().zip(long.iter()) {
                prop_assert!(l >= s, "factor shrank with longer half-life: {} < {}", l, s);
            }
        }
    }
}
