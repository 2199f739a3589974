//! Initial pool price as a Q64.96 square root.

use alloy_primitives::U256;
use craft_core::error::DecayError;

use crate::wide::{isqrt, narrow, widen};

/// `floor(sqrt(token1 / token0) * 2^96)` for `token0` and `token1` amounts of equal value.
///
/// Computed as `isqrt(floor(token1 * 2^192 / token0))`, which floors once at
/// each step and never goes through floating point.
pub fn sqrt_ratio_x96(token0: U256, token1: U256) -> Result<U256, DecayError> {
    if token0.is_zero() {
        return Err(DecayError::ZeroDenominator);
    }
    let ratio_x192 = (widen(token1) << 192) / widen(token0);
    narrow(isqrt(ratio_x192)).ok_or(DecayError::ArithmeticOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(v: u64) -> U256 {
        U256::from(v)
    }

    #[test]
    fn equal_amounts_is_q96_one() {
        assert_eq!(sqrt_ratio_x96(u(7), u(7)).unwrap(), U256::from(1u64) << 96);
    }

    #[test]
    fn four_to_one_is_two() {
        assert_eq!(sqrt_ratio_x96(u(1), u(4)).unwrap(), U256::from(2u64) << 96);
    }

    #[test]
    fn fractional_ratios_floor() {
        assert_eq!(
            sqrt_ratio_x96(u(1_000_000), u(1)).unwrap(),
            "79228162514264337593543950".parse::<U256>().unwrap()
        );
        assert_eq!(
            sqrt_ratio_x96(u(3), u(1)).unwrap(),
            "45742400955009932534161870629".parse::<U256>().unwrap()
        );
    }

    #[test]
    fn zero_token0_rejected() {
        assert_eq!(sqrt_ratio_x96(U256::ZERO, u(1)), Err(DecayError::ZeroDenominator));
    }

    #[test]
    fn zero_token1_is_zero() {
        assert_eq!(sqrt_ratio_x96(u(5), U256::ZERO).unwrap(), U256::ZERO);
    }

    #[test]
    fn extreme_ratio_fits() {
        // sqrt(2^256) * 2^96 = 2^224
        let v = sqrt_ratio_x96(u(1), U256::MAX).unwrap();
        assert!(v < U256::from(1u64) << 224);
        assert!(v > U256::from(1u64) << 223);
    }
}
