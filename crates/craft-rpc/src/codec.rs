//! JSON shapes of the Ethereum RPC methods the gateway uses.

use alloy_primitives::Address;
use craft_core::error::{AbiError, GatewayError};
use craft_core::types::{BlockHeight, Finality, ReadDescriptor, WriteIntent};
use serde::{Deserialize, Serialize};

/// Transaction object of `eth_call` and `eth_sendTransaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    pub to: Address,
    pub data: String,
}

impl CallRequest {
    pub fn read(read: &ReadDescriptor) -> Result<Self, AbiError> {
        Ok(Self { from: None, to: read.contract, data: hex_data(&read.function.encode_call(&read.args)?) })
    }

    pub fn write(from: Address, intent: &WriteIntent) -> Result<Self, AbiError> {
        Ok(Self {
            from: Some(from),
            to: intent.contract,
            data: hex_data(&intent.function.encode_call(&intent.args)?),
        })
    }
}

/// The fields of a transaction receipt finality depends on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptJson {
    pub block_number: Option<String>,
    /// `0x1` success, `0x0` revert.
    pub status: Option<String>,
}

impl ReceiptJson {
    /// Finality given the current head. A receipt counts once it is buried
    /// under `required_confirmations` blocks (its own block included).
    pub fn finality(&self, head: BlockHeight, required_confirmations: u64) -> Result<Finality, GatewayError> {
        let Some(block) = self.block_number.as_deref() else {
            return Ok(Finality::Pending);
        };
        let block = BlockHeight(parse_quantity(block)?);
        let confirmations = head.0.saturating_add(1).saturating_sub(block.0);
        if confirmations < required_confirmations {
            return Ok(Finality::Pending);
        }
        match self.status.as_deref() {
            Some("0x1") => Ok(Finality::Confirmed { block }),
            Some("0x0") => Ok(Finality::Failed { block, reason: "execution reverted".into() }),
            other => Err(GatewayError::MalformedResponse(format!("receipt status {other:?}"))),
        }
    }
}

/// `0x`-prefixed lowercase hex.
pub fn hex_data(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn parse_data(s: &str) -> Result<Vec<u8>, GatewayError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits).map_err(|e| GatewayError::MalformedResponse(format!("bad hex data: {e}")))
}

/// Hex block tag for a pinned call.
pub fn quantity(v: u64) -> String {
    format!("0x{v:x}")
}

pub fn parse_quantity(s: &str) -> Result<u64, GatewayError> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| GatewayError::MalformedResponse(format!("quantity without 0x: {s}")))?;
    u64::from_str_radix(digits, 16)
        .map_err(|e| GatewayError::MalformedResponse(format!("bad quantity {s}: {e}")))
}
