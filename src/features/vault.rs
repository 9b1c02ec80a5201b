//! Vault strategy controls (owner only on chain).

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use alloy::primitives::{Address, U256};

use super::require_wallet;
use crate::{
    contracts::{
        TokenVault::{
            earnAndHarvestCall, earnToStrategyCall, emergencyWithdrawAllFromStrategyCall,
            ownerCall, resetFlagsCall,
        },
        IERC20::balanceOfCall,
    },
    LotteryContext, LotteryResult, ReadBinding, TxMessages, TxOutcome, WriteBinding,
};

const CONNECT: &str = "Please connect your wallet.";

#[derive(Debug)]
pub struct VaultControl {
    ctx: Arc<LotteryContext>,
    earn_and_harvest: WriteBinding<earnAndHarvestCall>,
    emergency_withdraw: WriteBinding<emergencyWithdrawAllFromStrategyCall>,
    reset_flags: WriteBinding<resetFlagsCall>,
    earn_to_strategy: WriteBinding<earnToStrategyCall>,
    balance: ReadBinding<balanceOfCall>,
    owner: ReadBinding<ownerCall>,
    withdraw_successful: AtomicBool,
}

impl VaultControl {
    pub fn new(ctx: Arc<LotteryContext>) -> Self {
        let contracts = ctx.config().contracts;
        let vault = contracts.token_vault;
        let messages = || {
            TxMessages::new(
                "Transaction confirmed!",
                "Error",
                "Error confirming transaction",
            )
        };

        Self {
            earn_and_harvest: WriteBinding::new(ctx.clone(), vault).with_messages(messages()),
            emergency_withdraw: WriteBinding::new(ctx.clone(), vault).with_messages(messages()),
            reset_flags: WriteBinding::new(ctx.clone(), vault).with_messages(messages()),
            earn_to_strategy: WriteBinding::new(ctx.clone(), vault).with_messages(messages()),
            balance: ReadBinding::new(ctx.clone(), contracts.usdc, balanceOfCall { account: vault }),
            owner: ReadBinding::new(ctx.clone(), vault, ownerCall {}),
            withdraw_successful: AtomicBool::new(false),
            ctx,
        }
    }

    pub async fn earn_and_harvest(&self) -> LotteryResult<TxOutcome> {
        require_wallet(&self.ctx, CONNECT)?;
        self.earn_and_harvest.submit(earnAndHarvestCall {}).await
    }

    /// Pull everything back from the strategy. Sets the withdraw flag on confirmation.
    pub async fn emergency_withdraw_all(&self) -> LotteryResult<TxOutcome> {
        require_wallet(&self.ctx, CONNECT)?;
        let outcome = self
            .emergency_withdraw
            .submit(emergencyWithdrawAllFromStrategyCall {})
            .await?;
        self.withdraw_successful.store(true, Ordering::Release);
        Ok(outcome)
    }

    pub async fn reset_flags(&self) -> LotteryResult<TxOutcome> {
        require_wallet(&self.ctx, CONNECT)?;
        self.reset_flags.submit(resetFlagsCall {}).await
    }

    pub async fn earn_to_strategy(&self, amount: U256) -> LotteryResult<TxOutcome> {
        require_wallet(&self.ctx, CONNECT)?;
        self.earn_to_strategy
            .submit(earnToStrategyCall { amount })
            .await
    }

    /// Stablecoin held by the vault.
    pub async fn vault_balance(&self) -> LotteryResult<Option<U256>> {
        self.balance.fetch().await
    }

    pub async fn owner(&self) -> LotteryResult<Option<Address>> {
        self.owner.fetch().await
    }

    pub fn is_withdraw_successful(&self) -> bool {
        self.withdraw_successful.load(Ordering::Acquire)
    }

    pub fn reset_withdraw_success(&self) {
        self.withdraw_successful.store(false, Ordering::Release);
    }
}
