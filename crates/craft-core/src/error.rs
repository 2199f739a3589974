//! Error types for the craft client.
use alloy_primitives::U256;
use thiserror::Error;

use crate::types::{BlockHeight, TxId};

/// Transport or node failure talking to the remote gateway. Always transient.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("gateway unavailable: {0}")] Unavailable(String),
    #[error("rpc error {code}: {message}")] Rpc { code: i32, message: String },
    #[error("malformed response: {0}")] MalformedResponse(String),
    #[error("request timed out")] Timeout,
}

/// Failure of a single read inside an otherwise successful batch.
#[derive(Error, Debug, Clone, PartialEq, Eq, Hash)]
pub enum CallError {
    #[error("call reverted: {0}")] Reverted(String),
    #[error("abi: {0}")] Abi(#[from] AbiError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Hash)]
pub enum AbiError {
    #[error("return data too short: {got} bytes, need {need}")] ShortData { got: usize, need: usize },
    #[error("word {index} is not a valid {kind}")] InvalidWord { index: usize, kind: &'static str },
    #[error("argument {index} cannot be encoded as a static word")] UnsupportedArgument { index: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecayError {
    #[error("half-life must be positive")] ZeroHalfLife,
    #[error("invalid decay table size: {0}")] InvalidTableSize(usize),
    #[error("decay table of {size} entries cannot cover a half-life of {half_life}s")] TableTooSmall { size: usize, half_life: u64 },
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error("ratio denominator is zero")] ZeroDenominator,
    #[error("table half-life {table}s does not match checkpoint half-life {checkpoint}s")] HalfLifeMismatch { table: u64, checkpoint: u64 },
}

/// Why the cache refuses to hand out reads for a decision.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("reads not loaded yet")] NotLoaded,
    #[error("reads are from block {snapshot}, chain is at {head}")] Stale { snapshot: BlockHeight, head: BlockHeight },
    #[error("gateway degraded: {0}")] Degraded(GatewayError),
    #[error("read failed: {0}")] Unreadable(CallError),
}

/// User-correctable condition detected before any transaction is submitted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreconditionFailure {
    #[error("insufficient balance: have {have}, need {need}")] InsufficientBalance { have: U256, need: U256 },
    #[error("contract data not loaded yet: {0}")] DataNotReady(CacheError),
    #[error("no voting balance to delegate")] NothingToDelegate,
    #[error("votes are already delegated")] AlreadyDelegated,
}

/// On-chain or submission failure that terminates an orchestration run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    #[error("transaction {tx} reverted in block {block}: {reason}")] Reverted { tx: TxId, block: BlockHeight, reason: String },
    #[error("submission rejected: {0}")] Rejected(String),
    #[error("transaction {tx} did not reach finality in time")] Indeterminate { tx: TxId },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandleError {
    #[error("transaction {0} is already final")] AlreadyFinal(TxId),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestrationError {
    #[error("action {0} is already running")] AlreadyRunning(String),
    #[error("empty orchestration")] EmptySteps,
    #[error(transparent)] Precondition(#[from] PreconditionFailure),
    #[error("orchestration task aborted: {0}")] TaskAborted(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("config: {0}")] Load(String),
    #[error("missing contract address: {0}")] MissingAddress(&'static str),
    #[error("invalid setting {field}: {reason}")] Invalid { field: &'static str, reason: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(e: config::ConfigError) -> Self {
        ConfigError::Load(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum CraftError {
    #[error(transparent)] Gateway(#[from] GatewayError),
    #[error(transparent)] Call(#[from] CallError),
    #[error(transparent)] Abi(#[from] AbiError),
    #[error(transparent)] Decay(#[from] DecayError),
    #[error(transparent)] Cache(#[from] CacheError),
    #[error(transparent)] Orchestration(#[from] OrchestrationError),
    #[error(transparent)] Config(#[from] ConfigError),
}
