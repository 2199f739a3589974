//! Shared fixtures: a scripted chain holding the larpcoin, game piece and
//! slowlock state one account sees, and a client wired to it.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use craft_core::abi::AbiValue;
use craft_core::config::{OrchestratorConfig, SyncConfig};
use craft_core::contracts;
use craft_core::testing::MockChain;
use craft_core::types::{Governor, ReadDescriptor};
use craft_orchestrator::{Delegate, MintGamePiece, Orchestrator};
use craft_sync::ContractStateCache;

pub const LARPCOIN: Address = Address::repeat_byte(0x1a);
pub const GAME_PIECE: Address = Address::repeat_byte(0x2b);
pub const SLOWLOCK: Address = Address::repeat_byte(0x3c);
pub const ACCOUNT: Address = Address::repeat_byte(0x4d);

/// Starting height of every fixture chain.
pub const GENESIS: u64 = 100;

pub fn uint(v: u64) -> U256 {
    U256::from(v)
}

pub fn balance_read() -> ReadDescriptor {
    ReadDescriptor::new(LARPCOIN, contracts::BALANCE_OF, vec![AbiValue::Address(ACCOUNT)])
}

pub fn decimals_read() -> ReadDescriptor {
    ReadDescriptor::new(LARPCOIN, contracts::DECIMALS, vec![])
}

pub fn allowance_read() -> ReadDescriptor {
    ReadDescriptor::new(
        LARPCOIN,
        contracts::ALLOWANCE,
        vec![AbiValue::Address(ACCOUNT), AbiValue::Address(GAME_PIECE)],
    )
}

pub fn cost_read() -> ReadDescriptor {
    ReadDescriptor::new(GAME_PIECE, contracts::COST, vec![])
}

pub fn delegates_read(token: Address) -> ReadDescriptor {
    ReadDescriptor::new(token, contracts::DELEGATES, vec![AbiValue::Address(ACCOUNT)])
}

/// Chain where the account holds `balance` larpcoins (18 decimals), has
/// approved `allowance` to the game piece, and a game piece costs `cost`.
///
/// Confirmed `approve` calls set the allowance; a confirmed `mintAndPlay`
/// pulls `cost` from balance and allowance.
pub fn mint_chain(balance: u64, allowance: u64, cost: u64) -> Arc<MockChain> {
    let chain = Arc::new(MockChain::at_height(GENESIS));
    chain.set_value(balance_read(), uint(balance));
    chain.set_value(decimals_read(), uint(18));
    chain.set_value(allowance_read(), uint(allowance));
    chain.set_value(cost_read(), uint(cost));

    chain.on_confirm("approve", |intent, values| {
        if let Some(AbiValue::Uint(amount)) = intent.args.get(1) {
            values.insert(allowance_read(), AbiValue::Uint(*amount));
        }
    });
    chain.on_confirm("mintAndPlay", |_, values| {
        let cost = values.get(&cost_read()).and_then(AbiValue::as_uint).unwrap_or_default();
        for read in [balance_read(), allowance_read()] {
            let held = values.get(&read).and_then(AbiValue::as_uint).unwrap_or_default();
            values.insert(read, AbiValue::Uint(held.saturating_sub(cost)));
        }
    });
    chain
}

/// Adds the larpcoin governor's voting state to `chain`. A confirmed
/// `delegate` call records its argument as the delegate.
pub fn with_votes(chain: &MockChain, votes: u64, delegate: Address) {
    chain.set_value(balance_read(), uint(votes));
    chain.set_value(delegates_read(LARPCOIN), delegate);
    chain.on_confirm("delegate", |intent, values| {
        if let Some(AbiValue::Address(to)) = intent.args.first() {
            values.insert(delegates_read(intent.contract), AbiValue::Address(*to));
        }
    });
}

/// Orchestrator timing scaled down for tests.
pub fn fast_orchestrator_config() -> OrchestratorConfig {
    OrchestratorConfig { confirmation_poll_ms: 5, confirmation_timeout_ms: 300, required_confirmations: 1 }
}

/// A cache and orchestrator over `chain`.
pub fn client(chain: &Arc<MockChain>) -> (Arc<ContractStateCache>, Orchestrator) {
    let cache = Arc::new(ContractStateCache::new(chain.clone(), SyncConfig::default()));
    let orchestrator = Orchestrator::new(chain.clone(), cache.clone(), fast_orchestrator_config());
    (cache, orchestrator)
}

pub fn mint_action() -> MintGamePiece {
    MintGamePiece::new(LARPCOIN, GAME_PIECE, ACCOUNT)
}

pub fn delegate_action() -> Delegate {
    Delegate::new(Governor::Larpcoin, LARPCOIN, ACCOUNT)
}
