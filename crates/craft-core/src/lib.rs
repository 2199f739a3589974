//! # craft-core
//! Foundation types and traits for the craft client.
//!
//! - [`types`]: block heights, read descriptors, write intents, transaction handles
//! - [`abi`]: the static-word subset of the Solidity ABI the client speaks
//! - [`contracts`]: function signatures of the larpcoin, game piece and slowlock contracts
//! - [`traits`]: [`ContractGateway`](traits::ContractGateway), the remote node boundary
//! - [`config`]: explicit client configuration
//! - [`format`]: display helpers for token quantities

pub mod abi;
pub mod config;
pub mod constants;
pub mod contracts;
pub mod error;
pub mod format;
pub mod traits;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
