//! The client's logical actions.

use alloy_primitives::{Address, U256};
use craft_core::abi::AbiValue;
use craft_core::config::ClientConfig;
use craft_core::contracts;
use craft_core::error::{ConfigError, PreconditionFailure};
use craft_core::types::{ActionKey, Governor, OrchestrationSteps, WriteIntent};
use craft_sync::views::{DelegateView, MintView};
use craft_sync::{ReadBatch, ViewReads};

use crate::machine::Action;

/// Mint a game piece: approve the game piece to pull `cost` larpcoins if the
/// current allowance is short, then `mintAndPlay()`.
#[derive(Debug, Clone)]
pub struct MintGamePiece {
    larpcoin: Address,
    game_piece: Address,
    view: MintView,
}

impl MintGamePiece {
    pub fn new(larpcoin: Address, game_piece: Address, account: Address) -> Self {
        Self { larpcoin, game_piece, view: MintView::new(larpcoin, game_piece, account) }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.larpcoin()?, config.game_piece()?, config.account()?))
    }

    pub fn view(&self) -> &MintView {
        &self.view
    }

    fn approve(&self, amount: U256) -> WriteIntent {
        WriteIntent::new(
            self.larpcoin,
            contracts::APPROVE,
            vec![AbiValue::Address(self.game_piece), AbiValue::Uint(amount)],
        )
    }

    fn mint(&self) -> WriteIntent {
        WriteIntent::new(self.game_piece, contracts::MINT_AND_PLAY, vec![])
    }
}

impl Action for MintGamePiece {
    fn key(&self) -> ActionKey {
        ActionKey::MintGamePiece
    }

    fn reads(&self) -> &ReadBatch {
        self.view.batch()
    }

    fn plan(&self, reads: &ViewReads) -> Result<OrchestrationSteps, PreconditionFailure> {
        let v = self.view.values(reads).map_err(PreconditionFailure::DataNotReady)?;
        // Balance first: approving is pointless if the mint cannot be paid for.
        if v.balance < v.cost {
            return Err(PreconditionFailure::InsufficientBalance { have: v.balance, need: v.cost });
        }
        let mut steps = Vec::with_capacity(2);
        if v.allowance < v.cost {
            steps.push(self.approve(v.cost));
        }
        steps.push(self.mint());
        Ok(steps.into())
    }
}

/// Register to vote: delegate the account's votes on a governor token to itself.
#[derive(Debug, Clone)]
pub struct Delegate {
    governor: Governor,
    token: Address,
    account: Address,
    view: DelegateView,
}

impl Delegate {
    pub fn new(governor: Governor, token: Address, account: Address) -> Self {
        Self { governor, token, account, view: DelegateView::new(governor, token, account) }
    }

    pub fn from_config(config: &ClientConfig, governor: Governor) -> Result<Self, ConfigError> {
        Ok(Self::new(governor, config.governor_token(governor)?, config.account()?))
    }

    pub fn view(&self) -> &DelegateView {
        &self.view
    }
}

impl Action for Delegate {
    fn key(&self) -> ActionKey {
        ActionKey::Delegate(self.governor)
    }

    fn reads(&self) -> &ReadBatch {
        self.view.batch()
    }

    fn plan(&self, reads: &ViewReads) -> Result<OrchestrationSteps, PreconditionFailure> {
        let v = self.view.values(reads).map_err(PreconditionFailure::DataNotReady)?;
        if v.votes.is_zero() {
            return Err(PreconditionFailure::NothingToDelegate);
        }
        if v.is_registered() {
            return Err(PreconditionFailure::AlreadyDelegated);
        }
        Ok(vec![WriteIntent::new(
            self.token,
            contracts::DELEGATE,
            vec![AbiValue::Address(self.account)],
        )]
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use craft_core::config::SyncConfig;
    use craft_core::error::CacheError;
    use craft_core::testing::MockChain;
    use craft_core::types::ReadDescriptor;
    use craft_sync::ContractStateCache;

    const LARPCOIN: Address = Address::repeat_byte(0x01);
    const GAME_PIECE: Address = Address::repeat_byte(0x02);
    const ACCOUNT: Address = Address::repeat_byte(0x03);

    async fn reads_for(batch: &ReadBatch, values: &[(ReadDescriptor, AbiValue)]) -> ViewReads {
        let chain = Arc::new(MockChain::at_height(5));
        for (d, v) in values {
            chain.set_value(d.clone(), v.clone());
        }
        let cache = ContractStateCache::new(chain, SyncConfig::default());
        cache.register(batch.clone());
        cache.sync().await.unwrap();
        cache.observe(batch).reads().cloned().unwrap()
    }

    async fn mint_reads(action: &MintGamePiece, balance: u64, allowance: u64, cost: u64) -> ViewReads {
        let r = action.reads().reads();
        reads_for(
            action.reads(),
            &[
                (r[0].clone(), AbiValue::Uint(U256::from(balance))),
                (r[1].clone(), AbiValue::Uint(U256::from(allowance))),
                (r[2].clone(), AbiValue::Uint(U256::from(cost))),
            ],
        )
        .await
    }

    fn mint() -> MintGamePiece {
        MintGamePiece::new(LARPCOIN, GAME_PIECE, ACCOUNT)
    }

    #[tokio::test]
    async fn approve_skipped_when_allowance_covers_cost() {
        let action = mint();
        let steps = action.plan(&mint_reads(&action, 500, 250, 250).await).unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps.get(0).unwrap().function, contracts::MINT_AND_PLAY);
    }

    #[tokio::test]
    async fn approve_for_exact_cost_first() {
        let action = mint();
        let steps = action.plan(&mint_reads(&action, 500, 249, 250).await).unwrap();
        assert_eq!(steps.len(), 2);
        let approve = steps.get(0).unwrap();
        assert_eq!(approve.contract, LARPCOIN);
        assert_eq!(approve.function, contracts::APPROVE);
        assert_eq!(approve.args, vec![AbiValue::Address(GAME_PIECE), AbiValue::Uint(U256::from(250u64))]);
        assert_eq!(steps.get(1).unwrap().contract, GAME_PIECE);
    }

    #[tokio::test]
    async fn insufficient_balance_wins_over_allowance() {
        let action = mint();
        let err = action.plan(&mint_reads(&action, 10, 0, 250).await).unwrap_err();
        assert_eq!(
            err,
            PreconditionFailure::InsufficientBalance { have: U256::from(10u64), need: U256::from(250u64) }
        );
    }

    #[tokio::test]
    async fn missing_read_is_not_ready() {
        let action = mint();
        let r = action.reads().reads();
        let reads = reads_for(
            action.reads(),
            &[(r[0].clone(), AbiValue::Uint(U256::from(1u64))), (r[2].clone(), AbiValue::Uint(U256::from(1u64)))],
        )
        .await;
        assert!(matches!(
            action.plan(&reads),
            Err(PreconditionFailure::DataNotReady(CacheError::Unreadable(_)))
        ));
    }

    fn delegate() -> Delegate {
        Delegate::new(Governor::Larpcoin, LARPCOIN, ACCOUNT)
    }

    async fn delegate_reads(action: &Delegate, votes: u64, delegate: Address) -> ViewReads {
        let r = action.reads().reads();
        reads_for(
            action.reads(),
            &[
                (r[0].clone(), AbiValue::Uint(U256::from(votes))),
                (r[1].clone(), AbiValue::Address(delegate)),
            ],
        )
        .await
    }

    #[tokio::test]
    async fn delegate_to_self() {
        let action = delegate();
        let steps = action.plan(&delegate_reads(&action, 3, Address::ZERO).await).unwrap();
        assert_eq!(steps.len(), 1);
        let step = steps.get(0).unwrap();
        assert_eq!(step.contract, LARPCOIN);
        assert_eq!(step.function, contracts::DELEGATE);
        assert_eq!(step.args, vec![AbiValue::Address(ACCOUNT)]);
    }

    #[tokio::test]
    async fn delegate_guards() {
        let action = delegate();
        assert_eq!(
            action.plan(&delegate_reads(&action, 0, Address::ZERO).await),
            Err(PreconditionFailure::NothingToDelegate)
        );
        assert_eq!(
            action.plan(&delegate_reads(&action, 3, ACCOUNT).await),
            Err(PreconditionFailure::AlreadyDelegated)
        );
    }

    #[test]
    fn keys() {
        assert_eq!(mint().key(), ActionKey::MintGamePiece);
        assert_eq!(delegate().key(), ActionKey::Delegate(Governor::Larpcoin));
    }

    #[test]
    fn from_config_requires_addresses() {
        let config = ClientConfig::default();
        assert_eq!(MintGamePiece::from_config(&config).unwrap_err(), ConfigError::MissingAddress("game_piece"));
    }
}
