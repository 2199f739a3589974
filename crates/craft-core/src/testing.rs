//! In-memory [`ContractGateway`] for tests.
//!
//! `MockChain` keeps one current state (it has no history: a read pinned at
//! any height sees the latest values), records every batch and submission,
//! and confirms or fails transactions according to a per-function policy.

use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::{B256, U256};
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::abi::AbiValue;
use crate::error::{CallError, GatewayError};
use crate::traits::ContractGateway;
use crate::types::{BlockHeight, Finality, ReadDescriptor, TxId, WriteIntent};

/// How a submitted transaction calling a given function reaches finality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalityPolicy {
    /// Confirmed on the n-th finality query (n = 1 confirms on the first poll).
    ConfirmAfter(u32),
    /// Reverted on the n-th finality query.
    FailAfter(u32),
    /// Pending forever.
    Never,
}

impl Default for FinalityPolicy {
    fn default() -> Self {
        FinalityPolicy::ConfirmAfter(1)
    }
}

/// State change applied to the chain when a transaction confirms.
pub type Effect = Arc<dyn Fn(&WriteIntent, &mut HashMap<ReadDescriptor, AbiValue>) + Send + Sync>;

/// A transaction as the mock chain received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedTx {
    pub id: TxId,
    pub intent: WriteIntent,
    pub height: BlockHeight,
    /// Transactions from earlier submissions still pending when this one arrived.
    pub earlier_pending: usize,
}

struct PendingTx {
    function: &'static str,
    intent: WriteIntent,
    polls: u32,
    outcome: Option<Finality>,
}

#[derive(Default)]
struct ChainState {
    height: u64,
    values: HashMap<ReadDescriptor, AbiValue>,
    call_errors: HashMap<ReadDescriptor, CallError>,
    offline: bool,
    reject_submissions: Option<String>,
    advance_on_read: bool,
    batches: Vec<(BlockHeight, Vec<ReadDescriptor>)>,
    next_tx: u64,
    submitted: Vec<SubmittedTx>,
    txs: HashMap<TxId, PendingTx>,
    policies: HashMap<&'static str, FinalityPolicy>,
    effects: HashMap<&'static str, Effect>,
}

/// Scriptable chain behind the [`ContractGateway`] trait.
#[derive(Default)]
pub struct MockChain {
    state: Mutex<ChainState>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at_height(height: u64) -> Self {
        let chain = Self::new();
        chain.set_height(height);
        chain
    }

    pub fn height(&self) -> BlockHeight {
        BlockHeight(self.state.lock().height)
    }

    pub fn set_height(&self, height: u64) {
        self.state.lock().height = height;
    }

    /// Mine `blocks` empty blocks.
    pub fn advance(&self, blocks: u64) {
        self.state.lock().height += blocks;
    }

    pub fn set_value(&self, descriptor: ReadDescriptor, value: impl Into<AbiValue>) {
        let mut state = self.state.lock();
        state.call_errors.remove(&descriptor);
        state.values.insert(descriptor, value.into());
    }

    pub fn value(&self, descriptor: &ReadDescriptor) -> Option<AbiValue> {
        self.state.lock().values.get(descriptor).cloned()
    }

    /// Make one read revert inside otherwise successful batches.
    pub fn set_call_error(&self, descriptor: ReadDescriptor, error: CallError) {
        self.state.lock().call_errors.insert(descriptor, error);
    }

    /// While offline every gateway method fails with [`GatewayError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    /// Refuse submissions with the given message (e.g. "user rejected").
    pub fn reject_submissions(&self, message: Option<&str>) {
        self.state.lock().reject_submissions = message.map(str::to_string);
    }

    /// Mine a block after every batch is served, as if the chain moved mid-refresh.
    pub fn set_advance_on_read(&self, advance: bool) {
        self.state.lock().advance_on_read = advance;
    }

    pub fn set_policy(&self, function: &'static str, policy: FinalityPolicy) {
        self.state.lock().policies.insert(function, policy);
    }

    /// Apply `effect` to the chain's values when a call to `function` confirms.
    pub fn on_confirm<F>(&self, function: &'static str, effect: F)
    where
        F: Fn(&WriteIntent, &mut HashMap<ReadDescriptor, AbiValue>) + Send + Sync + 'static,
    {
        self.state.lock().effects.insert(function, Arc::new(effect));
    }

    /// Every batch served so far, with the height it was pinned to.
    pub fn batches(&self) -> Vec<(BlockHeight, Vec<ReadDescriptor>)> {
        self.state.lock().batches.clone()
    }

    pub fn batch_count(&self) -> usize {
        self.state.lock().batches.len()
    }

    pub fn submitted(&self) -> Vec<SubmittedTx> {
        self.state.lock().submitted.clone()
    }

    fn check_online(state: &ChainState) -> Result<(), GatewayError> {
        if state.offline {
            return Err(GatewayError::Unavailable("mock chain offline".into()));
        }
        Ok(())
    }
}

fn tx_id(n: u64) -> TxId {
    B256::from(U256::from(n).to_be_bytes::<32>())
}

#[async_trait]
impl ContractGateway for MockChain {
    async fn block_height(&self) -> Result<BlockHeight, GatewayError> {
        let state = self.state.lock();
        Self::check_online(&state)?;
        Ok(BlockHeight(state.height))
    }

    async fn read_batch(
        &self,
        at: BlockHeight,
        reads: &[ReadDescriptor],
    ) -> Result<Vec<Result<AbiValue, CallError>>, GatewayError> {
        let mut state = self.state.lock();
        Self::check_online(&state)?;
        if at.0 > state.height {
            return Err(GatewayError::Rpc { code: -32000, message: format!("unknown block {at}") });
        }
        let results = reads
            .iter()
            .map(|read| {
                if let Some(err) = state.call_errors.get(read) {
                    return Err(err.clone());
                }
                state
                    .values
                    .get(read)
                    .cloned()
                    .ok_or_else(|| CallError::Reverted(format!("no value for {read}")))
            })
            .collect();
        state.batches.push((at, reads.to_vec()));
        if state.advance_on_read {
            state.height += 1;
        }
        Ok(results)
    }

    async fn submit(&self, intent: &WriteIntent) -> Result<TxId, GatewayError> {
        let mut state = self.state.lock();
        Self::check_online(&state)?;
        if let Some(message) = &state.reject_submissions {
            return Err(GatewayError::Rpc { code: 4001, message: message.clone() });
        }
        state.next_tx += 1;
        let id = tx_id(state.next_tx);
        let earlier_pending = state.txs.values().filter(|tx| tx.outcome.is_none()).count();
        let height = BlockHeight(state.height);
        state.submitted.push(SubmittedTx { id, intent: intent.clone(), height, earlier_pending });
        state.txs.insert(
            id,
            PendingTx { function: intent.function.name(), intent: intent.clone(), polls: 0, outcome: None },
        );
        Ok(id)
    }

    async fn finality(&self, id: &TxId) -> Result<Finality, GatewayError> {
        let mut guard = self.state.lock();
        Self::check_online(&guard)?;
        let state = &mut *guard;
        let tx = state
            .txs
            .get_mut(id)
            .ok_or_else(|| GatewayError::Rpc { code: -32000, message: format!("unknown transaction {id}") })?;
        if let Some(outcome) = &tx.outcome {
            return Ok(outcome.clone());
        }
        tx.polls += 1;
        let policy = state.policies.get(tx.function).copied().unwrap_or_default();
        let outcome = match policy {
            FinalityPolicy::ConfirmAfter(n) if tx.polls >= n => {
                state.height += 1;
                if let Some(effect) = state.effects.get(tx.function) {
                    effect(&tx.intent, &mut state.values);
                }
                Finality::Confirmed { block: BlockHeight(state.height) }
            }
            FinalityPolicy::FailAfter(n) if tx.polls >= n => {
                state.height += 1;
                Finality::Failed { block: BlockHeight(state.height), reason: "execution reverted".into() }
            }
            _ => return Ok(Finality::Pending),
        };
        tx.outcome = Some(outcome.clone());
        Ok(outcome)
    }
}
