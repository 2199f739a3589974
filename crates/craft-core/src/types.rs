//! Core data types shared by the cache, the orchestrator and the gateway.

use std::fmt;

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::abi::{AbiValue, FunctionSig};
use crate::error::{CallError, DecayError, HandleError};

/// Transaction identifier (the transaction hash).
pub type TxId = B256;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Chain height. Strictly increasing per chain; the cache's invalidation clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct BlockHeight(pub u64);

impl BlockHeight {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BlockHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for BlockHeight {
    fn from(h: u64) -> Self {
        Self(h)
    }
}

/// Identifies one pure contract read.
///
/// Equality is structural: two descriptors with the same contract, function and
/// arguments are the same read and are fetched once per batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReadDescriptor {
    pub contract: Address,
    pub function: FunctionSig,
    pub args: Vec<AbiValue>,
}

impl ReadDescriptor {
    pub fn new(contract: Address, function: FunctionSig, args: Vec<AbiValue>) -> Self {
        Self { contract, function, args }
    }
}

impl fmt::Display for ReadDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.contract, self.function.name())
    }
}

/// The value of one read as of one block.
///
/// Only valid while `as_of_block` is the cache's current height.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadResult {
    pub descriptor: ReadDescriptor,
    pub value: Result<AbiValue, CallError>,
    pub as_of_block: BlockHeight,
}

/// A request to mutate chain state. Produces a [`TransactionHandle`] once submitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WriteIntent {
    pub contract: Address,
    pub function: FunctionSig,
    pub args: Vec<AbiValue>,
}

impl WriteIntent {
    pub fn new(contract: Address, function: FunctionSig, args: Vec<AbiValue>) -> Self {
        Self { contract, function, args }
    }
}

impl fmt::Display for WriteIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.contract, self.function.name())
    }
}

/// What the gateway reports about a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finality {
    Pending,
    Confirmed { block: BlockHeight },
    Failed { block: BlockHeight, reason: String },
}

/// Lifecycle of a [`TransactionHandle`]. `Confirmed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Confirmed { block: BlockHeight },
    Failed { block: Option<BlockHeight> },
}

impl TxStatus {
    pub fn is_final(&self) -> bool {
        !matches!(self, TxStatus::Pending)
    }
}

/// A submitted transaction tracked to finality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionHandle {
    id: TxId,
    submitted_at_block: BlockHeight,
    status: TxStatus,
}

impl TransactionHandle {
    pub fn pending(id: TxId, submitted_at_block: BlockHeight) -> Self {
        Self { id, submitted_at_block, status: TxStatus::Pending }
    }

    pub fn id(&self) -> TxId {
        self.id
    }

    pub fn submitted_at_block(&self) -> BlockHeight {
        self.submitted_at_block
    }

    pub fn status(&self) -> TxStatus {
        self.status
    }

    /// Move `Pending` to `Confirmed`. Terminal states never change.
    pub fn confirm(&mut self, block: BlockHeight) -> Result<(), HandleError> {
        self.transition(TxStatus::Confirmed { block })
    }

    /// Move `Pending` to `Failed`. `block` is `None` when the outcome is unknown.
    pub fn fail(&mut self, block: Option<BlockHeight>) -> Result<(), HandleError> {
        self.transition(TxStatus::Failed { block })
    }

    fn transition(&mut self, next: TxStatus) -> Result<(), HandleError> {
        if self.status.is_final() {
            return Err(HandleError::AlreadyFinal(self.id));
        }
        self.status = next;
        Ok(())
    }
}

/// Ordered writes: step `i + 1` is submitted only after step `i` is confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrchestrationSteps(Vec<WriteIntent>);

impl OrchestrationSteps {
    pub fn new(steps: Vec<WriteIntent>) -> Self {
        Self(steps)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WriteIntent> {
        self.0.iter()
    }

    pub fn get(&self, index: usize) -> Option<&WriteIntent> {
        self.0.get(index)
    }
}

impl From<Vec<WriteIntent>> for OrchestrationSteps {
    fn from(steps: Vec<WriteIntent>) -> Self {
        Self(steps)
    }
}

/// Slowlock checkpoint recorded on-chain at the last balance-changing event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecayCheckpoint {
    checkpoint_balance: U256,
    checkpoint_time: Timestamp,
    half_life_seconds: u64,
}

impl DecayCheckpoint {
    /// Returns [`DecayError::ZeroHalfLife`] when `half_life_seconds` is zero.
    pub fn new(
        checkpoint_balance: U256,
        checkpoint_time: Timestamp,
        half_life_seconds: u64,
    ) -> Result<Self, DecayError> {
        if half_life_seconds == 0 {
            return Err(DecayError::ZeroHalfLife);
        }
        Ok(Self { checkpoint_balance, checkpoint_time, half_life_seconds })
    }

    pub fn checkpoint_balance(&self) -> U256 {
        self.checkpoint_balance
    }

    pub fn checkpoint_time(&self) -> Timestamp {
        self.checkpoint_time
    }

    pub fn half_life_seconds(&self) -> u64 {
        self.half_life_seconds
    }
}

/// Which token's governor a delegation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Governor {
    /// One $CRAFT, one vote.
    Larpcoin,
    /// One player, one vote.
    GamePiece,
}

impl fmt::Display for Governor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Governor::Larpcoin => write!(f, "larpcoin"),
            Governor::GamePiece => write!(f, "game-piece"),
        }
    }
}

/// Logical action an orchestration run belongs to. At most one run per key is active.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionKey {
    MintGamePiece,
    Delegate(Governor),
    Named(String),
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKey::MintGamePiece => write!(f, "mint-game-piece"),
            ActionKey::Delegate(g) => write!(f, "delegate-{g}"),
            ActionKey::Named(name) => write!(f, "{name}"),
        }
    }
}
