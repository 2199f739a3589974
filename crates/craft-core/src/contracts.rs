//! Entry points of the larpcoin, game piece and slowlock contracts used by the client.

use crate::abi::{AbiKind, FunctionSig};

// --- larpcoin (ERC-20 with ERC-20Votes) and game piece (ERC-721Votes) ---

pub const BALANCE_OF: FunctionSig = FunctionSig::new("balanceOf(address)", &[AbiKind::Uint]);
pub const DECIMALS: FunctionSig = FunctionSig::new("decimals()", &[AbiKind::Uint]);
pub const ALLOWANCE: FunctionSig =
    FunctionSig::new("allowance(address,address)", &[AbiKind::Uint]);
pub const APPROVE: FunctionSig = FunctionSig::new("approve(address,uint256)", &[AbiKind::Bool]);
pub const DELEGATES: FunctionSig = FunctionSig::new("delegates(address)", &[AbiKind::Address]);
pub const DELEGATE: FunctionSig = FunctionSig::new("delegate(address)", &[]);

// --- game piece ---

/// Price of one game piece in larpcoin base units.
pub const COST: FunctionSig = FunctionSig::new("cost()", &[AbiKind::Uint]);
/// Pulls `cost()` larpcoins from the caller and mints one game piece.
pub const MINT_AND_PLAY: FunctionSig = FunctionSig::new("mintAndPlay()", &[]);

// --- slowlock ---

/// Returns `(decayedBalance(at), decayedBalance(now))`.
pub const DECAYED_BALANCE_AT: FunctionSig =
    FunctionSig::new("decayedBalanceAt(uint256)", &[AbiKind::Uint, AbiKind::Uint]);
