//! Ticket purchase.

use std::sync::Arc;

use alloy::primitives::U256;

use super::{bind_to, refetch_quietly, reject, require_wallet, Approval};
use crate::{
    contracts::{
        LotteryManager::{buyTicketCall, getUserTicketsCall},
        Ticket,
    },
    LotteryContext, LotteryError, LotteryResult, ReadBinding, TxMessages, TxOutcome,
    WriteBinding,
};

const CONNECT_TO_BUY: &str = "Please connect your wallet to buy a ticket.";
const BUY_ERROR: &str = "Error buying ticket";

/// Buys tickets, approving the stablecoin first when needed.
#[derive(Debug)]
pub struct TicketPurchase {
    ctx: Arc<LotteryContext>,
    approval: Arc<Approval>,
    buy: WriteBinding<buyTicketCall>,
    user_tickets: ReadBinding<getUserTicketsCall>,
}

impl TicketPurchase {
    pub fn new(ctx: Arc<LotteryContext>, approval: Arc<Approval>) -> Self {
        let manager = ctx.config().contracts.lottery_manager;
        let user = ctx.connected_address();
        let user_tickets = ReadBinding::new(
            ctx.clone(),
            manager,
            getUserTicketsCall {
                user: user.unwrap_or_default(),
            },
        )
        .enabled(user.is_some());
        let buy = WriteBinding::new(ctx.clone(), manager).with_messages(TxMessages::new(
            "Ticket purchased successfully!",
            BUY_ERROR,
            "Error confirming ticket purchase",
        ));

        Self {
            ctx,
            approval,
            buy,
            user_tickets,
        }
    }

    pub fn binding(&self) -> &WriteBinding<buyTicketCall> {
        &self.buy
    }

    pub fn approval(&self) -> &Approval {
        &self.approval
    }

    /// Tickets of the connected wallet.
    pub async fn tickets(&self) -> LotteryResult<Vec<Ticket>> {
        self.sync_user();
        Ok(self.user_tickets.fetch().await?.unwrap_or_default())
    }

    pub async fn refetch_tickets(&self) -> LotteryResult<Vec<Ticket>> {
        self.sync_user();
        Ok(self.user_tickets.refetch().await?.unwrap_or_default())
    }

    /// Buy a ticket for `amount` base units.
    ///
    /// Requires the last fetched allowance to cover `amount`. The allowance is read
    /// first when nothing was fetched yet, and refetched after every confirmed purchase
    /// since the purchase spends it. It is not re-checked against the chain right before
    /// submission, so an allowance spent elsewhere in between surfaces as a revert.
    pub async fn buy_ticket(&self, amount: U256) -> LotteryResult<TxOutcome> {
        require_wallet(&self.ctx, CONNECT_TO_BUY)?;

        let current = match self.approval.last_allowance() {
            Some(current) => current,
            None => self.approval.allowance().await?.unwrap_or_default(),
        };
        if current < amount {
            return Err(reject(
                &self.ctx,
                BUY_ERROR,
                LotteryError::InsufficientAllowance {
                    required: amount,
                    current,
                },
            ));
        }

        tracing::debug!(%amount, allowance = %current, "buying ticket");
        let outcome = self.buy.submit(buyTicketCall { amount }).await?;

        self.sync_user();
        tokio::join!(
            refetch_quietly(&self.user_tickets),
            self.approval.refresh_allowance()
        );
        Ok(outcome)
    }

    /// Approve when the allowance is short, wait until the chain reports it, then buy.
    pub async fn buy_with_approval(&self, amount: U256) -> LotteryResult<TxOutcome> {
        require_wallet(&self.ctx, CONNECT_TO_BUY)?;

        let current = self.approval.refetch_allowance().await?.unwrap_or_default();
        if current < amount {
            tracing::info!(%amount, allowance = %current, "allowance short, approving first");
            self.approval.approve(amount).await?;
            self.approval.wait_for_allowance(amount).await?;
        }

        self.buy_ticket(amount).await
    }

    fn sync_user(&self) {
        bind_to(
            &self.user_tickets,
            self.ctx
                .connected_address()
                .map(|user| getUserTicketsCall { user }),
        );
    }
}
