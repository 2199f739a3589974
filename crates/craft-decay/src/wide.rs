//! 512-bit intermediates for 256-bit fixed-point products.

use alloy_primitives::{U256, U512};

/// Fractional bits of the generator's working precision.
pub(crate) const WORK_BITS: usize = 192;

pub(crate) fn one_shl(bits: usize) -> U512 {
    U512::from(1u64) << bits
}

pub(crate) fn widen(v: U256) -> U512 {
    let mut limbs = [0u64; 8];
    limbs[..4].copy_from_slice(v.as_limbs());
    U512::from_limbs(limbs)
}

/// `None` when `v` does not fit in 256 bits.
pub(crate) fn narrow(v: U512) -> Option<U256> {
    let limbs = v.as_limbs();
    if limbs[4..].iter().any(|l| *l != 0) {
        return None;
    }
    Some(U256::from_limbs([limbs[0], limbs[1], limbs[2], limbs[3]]))
}

/// Right shift that yields zero once every bit is shifted out.
pub(crate) fn shr(v: U512, bits: u64) -> U512 {
    if bits >= 512 {
        return U512::ZERO;
    }
    v >> bits as usize
}

/// `floor(sqrt(n))` by Newton's method.
pub(crate) fn isqrt(n: U512) -> U512 {
    if n.is_zero() {
        return U512::ZERO;
    }
    // Start above the root so the iteration decreases monotonically.
    let mut x = one_shl(n.bit_len().div_ceil(2));
    loop {
        let y = (x + n / x) >> 1;
        if y >= x {
            return x;
        }
        x = y;
    }
}
