//! Trait interfaces for the craft client.
//!
//! - [`ContractGateway`]: the remote node boundary (craft-rpc implements it
//!   over JSON-RPC; `testing::MockChain` implements it in memory)

use async_trait::async_trait;

use crate::abi::AbiValue;
use crate::error::{CallError, GatewayError};
use crate::types::{BlockHeight, Finality, ReadDescriptor, TxId, WriteIntent};

/// Typed access to the contracts through a blockchain node.
///
/// Every method is a single logical round-trip. Errors are transient from the
/// client's point of view: callers keep their last known state and try again
/// on the next poll.
#[async_trait]
pub trait ContractGateway: Send + Sync {
    /// Current chain height.
    async fn block_height(&self) -> Result<BlockHeight, GatewayError>;

    /// Execute every read against the state of block `at`, in one round-trip.
    ///
    /// The returned vector has one entry per descriptor, in order. A read that
    /// reverts or returns undecodable data fails on its own without failing
    /// the batch.
    async fn read_batch(
        &self,
        at: BlockHeight,
        reads: &[ReadDescriptor],
    ) -> Result<Vec<Result<AbiValue, CallError>>, GatewayError>;

    /// Submit a write as a transaction and return its id.
    ///
    /// Once this returns `Ok` the transaction has been broadcast and cannot be recalled.
    async fn submit(&self, intent: &WriteIntent) -> Result<TxId, GatewayError>;

    /// Finality of a previously submitted transaction.
    async fn finality(&self, id: &TxId) -> Result<Finality, GatewayError>;
}
