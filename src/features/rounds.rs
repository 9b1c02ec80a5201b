//! Round lifecycle controls (owner only on chain).

use std::sync::Arc;

use alloy::primitives::U256;

use super::{refetch_quietly, reject, require_wallet};
use crate::{
    contracts::LotteryManager::{
        performCloseCall, performStartCall, roundActiveCall, roundEndTimestampCall,
        startRoundCall,
    },
    LotteryContext, LotteryError, LotteryResult, ReadBinding, TxMessages, TxOutcome,
    WriteBinding,
};

const CONNECT: &str = "Wallet not connected!";

#[derive(Debug)]
pub struct RoundControl {
    ctx: Arc<LotteryContext>,
    start: WriteBinding<startRoundCall>,
    perform_start: WriteBinding<performStartCall>,
    perform_close: WriteBinding<performCloseCall>,
    round_active: ReadBinding<roundActiveCall>,
    round_end: ReadBinding<roundEndTimestampCall>,
}

impl RoundControl {
    pub fn new(ctx: Arc<LotteryContext>) -> Self {
        let manager = ctx.config().contracts.lottery_manager;
        let upkeep = || {
            TxMessages::new(
                "Transaction confirmed!",
                "Error",
                "Error confirming transaction",
            )
        };

        Self {
            start: WriteBinding::new(ctx.clone(), manager).with_messages(TxMessages::new(
                "Round started successfully!",
                "Failed to start round",
                "Transaction failed during confirmation",
            )),
            perform_start: WriteBinding::new(ctx.clone(), manager).with_messages(upkeep()),
            perform_close: WriteBinding::new(ctx.clone(), manager).with_messages(upkeep()),
            round_active: ReadBinding::new(ctx.clone(), manager, roundActiveCall {}),
            round_end: ReadBinding::new(ctx.clone(), manager, roundEndTimestampCall {}),
            ctx,
        }
    }

    /// Open a new round lasting `duration_secs`.
    pub async fn start_round(&self, duration_secs: u64) -> LotteryResult<TxOutcome> {
        require_wallet(&self.ctx, CONNECT)?;
        let outcome = self
            .start
            .submit(startRoundCall {
                durationSeconds: U256::from(duration_secs),
            })
            .await?;
        self.refresh().await;
        Ok(outcome)
    }

    /// Run the keeper start step. The round must be inactive.
    pub async fn perform_start(&self) -> LotteryResult<TxOutcome> {
        require_wallet(&self.ctx, "Please connect your wallet.")?;
        self.require_round(false).await?;
        let outcome = self.perform_start.submit(performStartCall {}).await?;
        self.refresh().await;
        Ok(outcome)
    }

    /// Run the keeper close step. The round must be active.
    pub async fn perform_close(&self) -> LotteryResult<TxOutcome> {
        require_wallet(&self.ctx, "Please connect your wallet.")?;
        self.require_round(true).await?;
        let outcome = self.perform_close.submit(performCloseCall {}).await?;
        self.refresh().await;
        Ok(outcome)
    }

    /// The flag may be up to `stale_time` old; rounds opened or closed by others show up after that.
    async fn require_round(&self, expected_active: bool) -> LotteryResult<()> {
        let active = self.round_active.fetch().await?.unwrap_or_default();
        if active != expected_active {
            return Err(reject(
                &self.ctx,
                "Error",
                LotteryError::RoundStateMismatch { expected_active },
            ));
        }
        Ok(())
    }

    async fn refresh(&self) {
        tokio::join!(
            refetch_quietly(&self.round_active),
            refetch_quietly(&self.round_end)
        );
    }
}
