//! # craft-rpc: JSON-RPC contract gateway.
//!
//! [`RpcGateway`] implements [`ContractGateway`](craft_core::traits::ContractGateway)
//! against an Ethereum node over HTTP: `eth_blockNumber`, batched `eth_call`
//! pinned to a block tag, `eth_sendTransaction` from a node-managed account and
//! `eth_getTransactionReceipt` for finality.

pub mod codec;
pub mod gateway;

pub use gateway::RpcGateway;
