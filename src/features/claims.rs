//! Prize and principal claims.

use std::sync::Arc;

use alloy::primitives::U256;

use super::{bind_to, refetch_quietly, require_wallet};
use crate::{
    contracts::{
        LotteryManager::{claimPrincipalCall, claimPrizeCall, expectedRefundCall, getUserTicketsCall},
        Ticket,
    },
    LotteryContext, LotteryResult, ReadBinding, TxMessages, TxOutcome, WriteBinding,
};

#[derive(Debug)]
pub struct Claims {
    ctx: Arc<LotteryContext>,
    prize: WriteBinding<claimPrizeCall>,
    principal: WriteBinding<claimPrincipalCall>,
    expected_refund: ReadBinding<expectedRefundCall>,
    user_tickets: ReadBinding<getUserTicketsCall>,
}

impl Claims {
    pub fn new(ctx: Arc<LotteryContext>) -> Self {
        let manager = ctx.config().contracts.lottery_manager;
        let user = ctx.connected_address();
        let enabled = user.is_some();
        let user = user.unwrap_or_default();

        Self {
            prize: WriteBinding::new(ctx.clone(), manager).with_messages(TxMessages::new(
                "Prize claimed successfully!",
                "Error claiming prize",
                "Error confirming prize claim",
            )),
            principal: WriteBinding::new(ctx.clone(), manager).with_messages(TxMessages::new(
                "Principal claimed successfully!",
                "Error claiming principal",
                "Error confirming principal claim",
            )),
            expected_refund: ReadBinding::new(ctx.clone(), manager, expectedRefundCall { user })
                .enabled(enabled),
            user_tickets: ReadBinding::new(ctx.clone(), manager, getUserTicketsCall { user })
                .enabled(enabled),
            ctx,
        }
    }

    pub fn prize_binding(&self) -> &WriteBinding<claimPrizeCall> {
        &self.prize
    }

    pub fn principal_binding(&self) -> &WriteBinding<claimPrincipalCall> {
        &self.principal
    }

    /// Refund the connected wallet would receive from `claimPrincipal`.
    pub async fn expected_refund(&self) -> LotteryResult<Option<U256>> {
        self.sync_user();
        self.expected_refund.fetch().await
    }

    pub async fn claim_prize(&self) -> LotteryResult<TxOutcome> {
        require_wallet(&self.ctx, "Please connect your wallet to claim the prize.")?;
        let outcome = self.prize.submit(claimPrizeCall {}).await?;
        self.refresh_after_claim().await;
        Ok(outcome)
    }

    pub async fn claim_principal(&self) -> LotteryResult<TxOutcome> {
        require_wallet(&self.ctx, "Please connect your wallet to claim principal.")?;
        let outcome = self.principal.submit(claimPrincipalCall {}).await?;
        self.refresh_after_claim().await;
        Ok(outcome)
    }

    /// Tickets as of the last refresh.
    pub fn tickets(&self) -> Vec<Ticket> {
        self.user_tickets.data().unwrap_or_default()
    }

    async fn refresh_after_claim(&self) {
        self.sync_user();
        tokio::join!(
            refetch_quietly(&self.expected_refund),
            refetch_quietly(&self.user_tickets)
        );
    }

    fn sync_user(&self) {
        let user = self.ctx.connected_address();
        bind_to(&self.expected_refund, user.map(|user| expectedRefundCall { user }));
        bind_to(&self.user_tickets, user.map(|user| getUserTicketsCall { user }));
    }
}
