//! The static-word subset of the Solidity ABI.
//!
//! Every argument and return value the client exchanges with the larpcoin,
//! game piece and slowlock contracts is a single 32-byte word (`uint256`,
//! `address`, `bool`), or a fixed tuple of such words. Dynamic types are
//! never needed and are rejected at encode time.

use std::fmt;

use alloy_primitives::{keccak256, Address, U256};

use crate::error::AbiError;

const WORD: usize = 32;

/// Type of one static ABI word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbiKind {
    Uint,
    Address,
    Bool,
}

impl AbiKind {
    fn name(&self) -> &'static str {
        match self {
            AbiKind::Uint => "uint256",
            AbiKind::Address => "address",
            AbiKind::Bool => "bool",
        }
    }
}

/// A decoded or encodable ABI value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AbiValue {
    Uint(U256),
    Address(Address),
    Bool(bool),
    Tuple(Vec<AbiValue>),
}

impl AbiValue {
    pub fn as_uint(&self) -> Option<U256> {
        match self {
            AbiValue::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            AbiValue::Address(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AbiValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[AbiValue]> {
        match self {
            AbiValue::Tuple(items) => Some(items),
            _ => None,
        }
    }

    fn to_word(&self) -> Option<[u8; WORD]> {
        match self {
            AbiValue::Uint(v) => Some(v.to_be_bytes::<WORD>()),
            AbiValue::Address(a) => Some(a.into_word().0),
            AbiValue::Bool(b) => Some(U256::from(*b as u8).to_be_bytes::<WORD>()),
            AbiValue::Tuple(_) => None,
        }
    }
}

impl From<U256> for AbiValue {
    fn from(v: U256) -> Self {
        AbiValue::Uint(v)
    }
}

impl From<Address> for AbiValue {
    fn from(a: Address) -> Self {
        AbiValue::Address(a)
    }
}

/// A contract function: its canonical signature and the kinds of its return words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionSig {
    signature: &'static str,
    outputs: &'static [AbiKind],
}

impl FunctionSig {
    pub const fn new(signature: &'static str, outputs: &'static [AbiKind]) -> Self {
        Self { signature, outputs }
    }

    /// Canonical signature, e.g. `allowance(address,address)`.
    pub fn signature(&self) -> &'static str {
        self.signature
    }

    /// Function name without the parameter list.
    pub fn name(&self) -> &'static str {
        self.signature.split('(').next().unwrap_or(self.signature)
    }

    pub fn outputs(&self) -> &'static [AbiKind] {
        self.outputs
    }

    /// First four bytes of `keccak256(signature)`.
    pub fn selector(&self) -> [u8; 4] {
        let hash = keccak256(self.signature.as_bytes());
        [hash[0], hash[1], hash[2], hash[3]]
    }

    /// Selector followed by one word per argument.
    pub fn encode_call(&self, args: &[AbiValue]) -> Result<Vec<u8>, AbiError> {
        let mut data = Vec::with_capacity(4 + WORD * args.len());
        data.extend_from_slice(&self.selector());
        for (index, arg) in args.iter().enumerate() {
            let word = arg.to_word().ok_or(AbiError::UnsupportedArgument { index })?;
            data.extend_from_slice(&word);
        }
        Ok(data)
    }

    /// Decode return data. A single output decodes to that value, several to a tuple.
    pub fn decode_output(&self, data: &[u8]) -> Result<AbiValue, AbiError> {
        let need = WORD * self.outputs.len();
        if data.len() < need {
            return Err(AbiError::ShortData { got: data.len(), need });
        }
        let mut values = Vec::with_capacity(self.outputs.len());
        for (index, (kind, word)) in self.outputs.iter().zip(data.chunks_exact(WORD)).enumerate() {
            values.push(decode_word(*kind, word, index)?);
        }
        match values.len() {
            1 => Ok(values.remove(0)),
            _ => Ok(AbiValue::Tuple(values)),
        }
    }
}

impl fmt::Display for FunctionSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.signature)
    }
}

fn decode_word(kind: AbiKind, word: &[u8], index: usize) -> Result<AbiValue, AbiError> {
    let invalid = AbiError::InvalidWord { index, kind: kind.name() };
    match kind {
        AbiKind::Uint => Ok(AbiValue::Uint(U256::from_be_slice(word))),
        AbiKind::Address => {
            if word[..12].iter().any(|b| *b != 0) {
                return Err(invalid);
            }
            Ok(AbiValue::Address(Address::from_slice(&word[12..])))
        }
        AbiKind::Bool => match U256::from_be_slice(word) {
            v if v.is_zero() => Ok(AbiValue::Bool(false)),
            v if v == U256::from(1) => Ok(AbiValue::Bool(true)),
            _ => Err(invalid),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts;

    fn word(v: u64) -> [u8; 32] {
        U256::from(v).to_be_bytes::<32>()
    }

    #[test]
    fn erc20_selectors() {
        assert_eq!(contracts::BALANCE_OF.selector(), [0x70, 0xa0, 0x82, 0x31]);
        assert_eq!(contracts::ALLOWANCE.selector(), [0xdd, 0x62, 0xed, 0x3e]);
        assert_eq!(contracts::APPROVE.selector(), [0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(contracts::DECIMALS.selector(), [0x31, 0x3c, 0xe5, 0x67]);
        assert_eq!(contracts::DELEGATE.selector(), [0x5c, 0x19, 0xa9, 0x5c]);
        assert_eq!(contracts::DELEGATES.selector(), [0x58, 0x7c, 0xde, 0x1e]);
    }

    #[test]
    fn function_name_strips_params() {
        assert_eq!(contracts::ALLOWANCE.name(), "allowance");
        assert_eq!(contracts::MINT_AND_PLAY.name(), "mintAndPlay");
    }

    #[test]
    fn encode_call_pads_address_and_uint() {
        let spender = Address::repeat_byte(0xAB);
        let data = contracts::APPROVE
            .encode_call(&[AbiValue::Address(spender), AbiValue::Uint(U256::from(250_000))])
            .unwrap();
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(&data[..4], &contracts::APPROVE.selector());
        assert_eq!(&data[4..16], &[0u8; 12]);
        assert_eq!(&data[16..36], spender.as_slice());
        assert_eq!(&data[36..68], &word(250_000));
    }

    #[test]
    fn encode_call_without_args_is_selector() {
        let data = contracts::COST.encode_call(&[]).unwrap();
        assert_eq!(data, contracts::COST.selector().to_vec());
    }

    #[test]
    fn encode_rejects_tuple_argument() {
        let err = contracts::APPROVE
            .encode_call(&[AbiValue::Bool(true), AbiValue::Tuple(vec![])])
            .unwrap_err();
        assert_eq!(err, AbiError::UnsupportedArgument { index: 1 });
    }

    #[test]
    fn decode_single_uint() {
        let v = contracts::BALANCE_OF.decode_output(&word(42)).unwrap();
        assert_eq!(v, AbiValue::Uint(U256::from(42)));
    }

    #[test]
    fn decode_pair_as_tuple() {
        let mut data = word(400).to_vec();
        data.extend_from_slice(&word(500));
        let v = contracts::DECAYED_BALANCE_AT.decode_output(&data).unwrap();
        assert_eq!(
            v.as_tuple().unwrap(),
            &[AbiValue::Uint(U256::from(400)), AbiValue::Uint(U256::from(500))]
        );
    }

    #[test]
    fn decode_short_data_fails() {
        let err = contracts::DECAYED_BALANCE_AT.decode_output(&word(1)).unwrap_err();
        assert_eq!(err, AbiError::ShortData { got: 32, need: 64 });
    }

    #[test]
    fn decode_address_rejects_dirty_high_bytes() {
        let mut w = [0u8; 32];
        w[0] = 1;
        let err = contracts::DELEGATES.decode_output(&w).unwrap_err();
        assert_eq!(err, AbiError::InvalidWord { index: 0, kind: "address" });
    }

    #[test]
    fn decode_zero_address() {
        let v = contracts::DELEGATES.decode_output(&[0u8; 32]).unwrap();
        assert_eq!(v.as_address(), Some(Address::ZERO));
    }

    #[test]
    fn accessors_reject_other_kinds() {
        let v = AbiValue::Bool(true);
        assert_eq!(v.as_bool(), Some(true));
        assert_eq!(v.as_uint(), None);
        assert_eq!(v.as_address(), None);
        assert!(v.as_tuple().is_none());
    }
}
