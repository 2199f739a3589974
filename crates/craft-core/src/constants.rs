//! Client constants. Durations are in milliseconds unless the name says otherwise.

use alloy_primitives::{address, Address};

/// Public Sepolia endpoint the hosted client reads from.
pub const DEFAULT_RPC_ENDPOINT: &str = "https://public.stackup.sh/api/v1/node/ethereum-sepolia";

/// Sepolia chain id.
pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;

/// Deployed $CRAFT token on Sepolia.
pub const SEPOLIA_LARPCOIN: Address = address!("aab56a449b0345ec064caccf161e06613437bc83");

/// Lower bound between gateway polls (block height and read batches).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 24_000;

/// Interval between finality queries for a submitted transaction.
pub const DEFAULT_CONFIRMATION_POLL_MS: u64 = 4_000;

/// A transaction not final after this long is reported as indeterminate.
pub const DEFAULT_CONFIRMATION_TIMEOUT_MS: u64 = 10 * 60 * 1_000;

/// Per-request timeout for JSON-RPC calls.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Horizon of the stream-rate display: "streaming at X per month".
pub const STREAM_RATE_HORIZON_SECS: u64 = 30 * SECONDS_PER_DAY;

/// Number of per-power-of-two decay factors in the slowlock table (`2^0 .. 2^31` seconds).
pub const DECAY_TABLE_SIZE: usize = 32;

/// Fractional bits of the X96 fixed-point format.
pub const X96_BITS: usize = 96;

/// Fraction digits shown for token balances.
pub const BALANCE_DISPLAY_FRACTION_DIGITS: usize = 3;
