//! # craft-decay: Fixed-point decay math for the slowlock stream.
//!
//! All calculations use integer arithmetic only, so results agree with the
//! on-chain contract to the unit.
//!
//! - **Decay tables**: `floor(2^(-2^i / half_life) * 2^96)` for `i in [0, n)`,
//!   generated with exact integer series at 192 fractional bits.
//! - **Decayed value**: `balance * 2^(-elapsed / half_life)` in X96 fixed point.
//!   Whole half-lives are an exact shift; the remainder's factor is composed
//!   from the table by binary decomposition.
//! - **Stream rate**: the amount a checkpoint releases over the next month.
//! - **Price ratio**: `sqrtRatioX96` for seeding a pool at a given price.

pub mod engine;
pub mod price;
pub mod stream;
pub mod table;

pub(crate) mod wide;

pub use engine::{decayed_value, DecayEngine};
pub use price::sqrt_ratio_x96;
pub use stream::{monthly_emission, stream_rate_from_pair};
pub use table::{decay_factors_x96, DecayTable};
