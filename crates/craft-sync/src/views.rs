//! Read batches of the client's views.
//!
//! A view names the reads it needs as a [`ReadBatch`] and extracts typed
//! values from a [`ViewReads`] observation. The balance, mint, delegate and
//! stream views overlap (three of them read `balanceOf(account)`); the cache
//! fetches each distinct read once per block.

use alloy_primitives::{Address, U256};
use craft_core::abi::AbiValue;
use craft_core::constants::STREAM_RATE_HORIZON_SECS;
use craft_core::contracts;
use craft_core::error::{AbiError, CacheError, CallError};
use craft_core::format::format_balance;
use craft_core::types::{Governor, ReadDescriptor, Timestamp};

use crate::cache::ViewReads;

/// The reads one view needs, deduplicated, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadBatch {
    name: String,
    reads: Vec<ReadDescriptor>,
}

impl ReadBatch {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), reads: Vec::new() }
    }

    pub fn with(mut self, read: ReadDescriptor) -> Self {
        self.push(read);
        self
    }

    pub fn push(&mut self, read: ReadDescriptor) {
        if !self.reads.contains(&read) {
            self.reads.push(read);
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reads(&self) -> &[ReadDescriptor] {
        &self.reads
    }

    pub fn len(&self) -> usize {
        self.reads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reads.is_empty()
    }
}

fn balance_of(token: Address, account: Address) -> ReadDescriptor {
    ReadDescriptor::new(token, contracts::BALANCE_OF, vec![AbiValue::Address(account)])
}

fn decimals(token: Address) -> ReadDescriptor {
    ReadDescriptor::new(token, contracts::DECIMALS, vec![])
}

fn to_decimals(value: U256) -> Result<u8, CacheError> {
    u8::try_from(value).map_err(|_| {
        CacheError::Unreadable(CallError::Abi(AbiError::InvalidWord { index: 0, kind: "uint8" }))
    })
}

// --- balance ---

/// Larpcoin balance of the account.
#[derive(Debug, Clone)]
pub struct BalanceView {
    batch: ReadBatch,
    balance: ReadDescriptor,
    decimals: ReadDescriptor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceValues {
    pub balance: U256,
    pub decimals: u8,
}

impl BalanceValues {
    /// Grouped thousands, at most three fraction digits.
    pub fn display(&self) -> String {
        format_balance(self.balance, self.decimals)
    }
}

impl BalanceView {
    pub fn new(larpcoin: Address, account: Address) -> Self {
        let balance = balance_of(larpcoin, account);
        let decimals = decimals(larpcoin);
        let batch = ReadBatch::new("balance").with(balance.clone()).with(decimals.clone());
        Self { batch, balance, decimals }
    }

    pub fn batch(&self) -> &ReadBatch {
        &self.batch
    }

    pub fn values(&self, reads: &ViewReads) -> Result<BalanceValues, CacheError> {
        Ok(BalanceValues {
            balance: reads.uint(&self.balance)?,
            decimals: to_decimals(reads.uint(&self.decimals)?)?,
        })
    }
}

// --- mint ---

/// Everything the mint decision compares: balance, allowance to the game piece, cost.
#[derive(Debug, Clone)]
pub struct MintView {
    batch: ReadBatch,
    balance: ReadDescriptor,
    allowance: ReadDescriptor,
    cost: ReadDescriptor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintValues {
    pub balance: U256,
    pub allowance: U256,
    pub cost: U256,
}

impl MintView {
    pub fn new(larpcoin: Address, game_piece: Address, account: Address) -> Self {
        let balance = balance_of(larpcoin, account);
        let allowance = ReadDescriptor::new(
            larpcoin,
            contracts::ALLOWANCE,
            vec![AbiValue::Address(account), AbiValue::Address(game_piece)],
        );
        let cost = ReadDescriptor::new(game_piece, contracts::COST, vec![]);
        let batch = ReadBatch::new("mint")
            .with(balance.clone())
            .with(allowance.clone())
            .with(cost.clone());
        Self { batch, balance, allowance, cost }
    }

    pub fn batch(&self) -> &ReadBatch {
        &self.batch
    }

    pub fn values(&self, reads: &ViewReads) -> Result<MintValues, CacheError> {
        Ok(MintValues {
            balance: reads.uint(&self.balance)?,
            allowance: reads.uint(&self.allowance)?,
            cost: reads.uint(&self.cost)?,
        })
    }
}

// --- delegate ---

/// Voting balance and current delegate on one governor token.
#[derive(Debug, Clone)]
pub struct DelegateView {
    batch: ReadBatch,
    votes: ReadDescriptor,
    delegates: ReadDescriptor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelegateValues {
    pub votes: U256,
    pub delegate: Address,
}

impl DelegateValues {
    pub fn is_registered(&self) -> bool {
        self.delegate != Address::ZERO
    }
}

impl DelegateView {
    pub fn new(governor: Governor, token: Address, account: Address) -> Self {
        let votes = balance_of(token, account);
        let delegates =
            ReadDescriptor::new(token, contracts::DELEGATES, vec![AbiValue::Address(account)]);
        let batch = ReadBatch::new(format!("delegate-{governor}"))
            .with(votes.clone())
            .with(delegates.clone());
        Self { batch, votes, delegates }
    }

    pub fn batch(&self) -> &ReadBatch {
        &self.batch
    }

    pub fn values(&self, reads: &ViewReads) -> Result<DelegateValues, CacheError> {
        Ok(DelegateValues {
            votes: reads.uint(&self.votes)?,
            delegate: reads.address(&self.delegates)?,
        })
    }
}

// --- stream ---

/// Slowlock balance now and one month out.
///
/// The target time is part of the read. A long-lived client rebuilds the view
/// as time passes and registers it again; the batch name stays `stream`, so
/// the new horizon replaces the old one.
#[derive(Debug, Clone)]
pub struct StreamView {
    batch: ReadBatch,
    decayed: ReadDescriptor,
    decimals: ReadDescriptor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamValues {
    /// Balance the stream will hold in 30 days.
    pub target: U256,
    pub current: U256,
    pub decimals: u8,
}

impl StreamView {
    pub fn new(slowlock: Address, larpcoin: Address, now: Timestamp) -> Self {
        let at = now.saturating_add(STREAM_RATE_HORIZON_SECS);
        let decayed = ReadDescriptor::new(
            slowlock,
            contracts::DECAYED_BALANCE_AT,
            vec![AbiValue::Uint(U256::from(at))],
        );
        let decimals = decimals(larpcoin);
        let batch = ReadBatch::new("stream").with(decayed.clone()).with(decimals.clone());
        Self { batch, decayed, decimals }
    }

    pub fn batch(&self) -> &ReadBatch {
        &self.batch
    }

    pub fn values(&self, reads: &ViewReads) -> Result<StreamValues, CacheError> {
        let (target, current) = reads.uint_pair(&self.decayed)?;
        Ok(StreamValues { target, current, decimals: to_decimals(reads.uint(&self.decimals)?)? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LARPCOIN: Address = Address::repeat_byte(0x01);
    const GAME_PIECE: Address = Address::repeat_byte(0x02);
    const ACCOUNT: Address = Address::repeat_byte(0x03);

    #[test]
    fn batch_deduplicates() {
        let read = balance_of(LARPCOIN, ACCOUNT);
        let batch = ReadBatch::new("x").with(read.clone()).with(read.clone()).with(decimals(LARPCOIN));
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.reads()[0], read);
    }

    #[test]
    fn mint_view_reads_allowance_to_game_piece() {
        let view = MintView::new(LARPCOIN, GAME_PIECE, ACCOUNT);
        let reads = view.batch().reads();
        assert_eq!(reads.len(), 3);
        assert_eq!(reads[1].contract, LARPCOIN);
        assert_eq!(
            reads[1].args,
            vec![AbiValue::Address(ACCOUNT), AbiValue::Address(GAME_PIECE)]
        );
        assert_eq!(reads[2].contract, GAME_PIECE);
        assert_eq!(reads[2].function, contracts::COST);
    }

    #[test]
    fn balance_and_mint_views_share_balance_read() {
        let balance = BalanceView::new(LARPCOIN, ACCOUNT);
        let mint = MintView::new(LARPCOIN, GAME_PIECE, ACCOUNT);
        assert_eq!(balance.batch().reads()[0], mint.batch().reads()[0]);
    }

    #[test]
    fn delegate_view_targets_governor_token() {
        let view = DelegateView::new(Governor::GamePiece, GAME_PIECE, ACCOUNT);
        assert_eq!(view.batch().name(), "delegate-game-piece");
        assert!(view.batch().reads().iter().all(|r| r.contract == GAME_PIECE));
    }

    #[test]
    fn stream_view_reads_one_month_ahead() {
        let view = StreamView::new(Address::repeat_byte(0x09), LARPCOIN, 1_000);
        assert_eq!(
            view.batch().reads()[0].args,
            vec![AbiValue::Uint(U256::from(1_000 + STREAM_RATE_HORIZON_SECS))]
        );
    }

    #[test]
    fn oversized_decimals_are_unreadable() {
        assert!(matches!(to_decimals(U256::from(300u64)), Err(CacheError::Unreadable(_))));
        assert_eq!(to_decimals(U256::from(18u64)), Ok(18));
    }

    #[test]
    fn delegate_registration() {
        let unregistered = DelegateValues { votes: U256::from(5u64), delegate: Address::ZERO };
        assert!(!unregistered.is_registered());
        let registered = DelegateValues { votes: U256::from(5u64), delegate: ACCOUNT };
        assert!(registered.is_registered());
    }

    #[test]
    fn balance_display_grouped() {
        let v = BalanceValues { balance: U256::from(1_234_567_890_000u64), decimals: 6 };
        assert_eq!(v.display(), "1,234,567.89");
    }
}
