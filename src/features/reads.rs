//! Round state reads.
//!
//! Each value has its own binding. `snapshot()` issues the reads concurrently; the
//! values may come from different blocks and no consistency is attempted.

use std::sync::Arc;

use alloy::primitives::{Address, U256};

use super::bind_to;
use crate::{
    contracts::{
        LotteryManager::{
            entryCountCall, expectedRefundCall, getTicketByIdCall, getUserTicketsCall, ownerCall,
            prizeAmountRedeemedCall, prizeClaimedCall, roundActiveCall, roundEndTimestampCall,
            roundIdCall, winnerCall,
        },
        Ticket,
    },
    LotteryContext, LotteryResult, ReadBinding, ReadState,
};

/// Round values as last read, each with its own loading and error state.
#[derive(Debug, Clone, Default)]
pub struct RoundSnapshot {
    pub active: ReadState<bool>,
    pub round_id: ReadState<U256>,
    pub end_timestamp: ReadState<U256>,
    pub entry_count: ReadState<U256>,
    pub winner: ReadState<Address>,
    pub prize_amount: ReadState<U256>,
    pub prize_claimed: ReadState<bool>,
}

/// Connected user's position in the lottery.
#[derive(Debug, Clone, Default)]
pub struct UserSnapshot {
    pub address: Option<Address>,
    pub tickets: ReadState<Vec<Ticket>>,
    pub expected_refund: ReadState<U256>,
}

#[derive(Debug)]
pub struct RoundReads {
    ctx: Arc<LotteryContext>,
    pub round_active: ReadBinding<roundActiveCall>,
    pub round_id: ReadBinding<roundIdCall>,
    pub round_end_timestamp: ReadBinding<roundEndTimestampCall>,
    pub entry_count: ReadBinding<entryCountCall>,
    pub winner: ReadBinding<winnerCall>,
    pub prize_amount_redeemed: ReadBinding<prizeAmountRedeemedCall>,
    pub prize_claimed: ReadBinding<prizeClaimedCall>,
    pub expected_refund: ReadBinding<expectedRefundCall>,
    pub user_tickets: ReadBinding<getUserTicketsCall>,
    pub ticket_by_id: ReadBinding<getTicketByIdCall>,
    pub owner: ReadBinding<ownerCall>,
}

impl RoundReads {
    pub fn new(ctx: Arc<LotteryContext>) -> Self {
        let manager = ctx.config().contracts.lottery_manager;
        let user = ctx.connected_address();
        let enabled = user.is_some();
        let user = user.unwrap_or_default();

        Self {
            round_active: ReadBinding::new(ctx.clone(), manager, roundActiveCall {}),
            round_id: ReadBinding::new(ctx.clone(), manager, roundIdCall {}),
            round_end_timestamp: ReadBinding::new(ctx.clone(), manager, roundEndTimestampCall {}),
            entry_count: ReadBinding::new(ctx.clone(), manager, entryCountCall {}),
            winner: ReadBinding::new(ctx.clone(), manager, winnerCall {}),
            prize_amount_redeemed: ReadBinding::new(ctx.clone(), manager, prizeAmountRedeemedCall {}),
            prize_claimed: ReadBinding::new(ctx.clone(), manager, prizeClaimedCall {}),
            expected_refund: ReadBinding::new(ctx.clone(), manager, expectedRefundCall { user })
                .enabled(enabled),
            user_tickets: ReadBinding::new(ctx.clone(), manager, getUserTicketsCall { user })
                .enabled(enabled),
            // Disabled until a ticket id is chosen
            ticket_by_id: ReadBinding::new(
                ctx.clone(),
                manager,
                getTicketByIdCall {
                    ticketId: U256::ZERO,
                },
            )
            .enabled(false),
            owner: ReadBinding::new(ctx.clone(), manager, ownerCall {}),
            ctx,
        }
    }

    /// Re-key the user bindings to the currently connected address.
    pub fn sync_address(&self) -> Option<Address> {
        let user = self.ctx.connected_address();
        bind_to(&self.expected_refund, user.map(|user| expectedRefundCall { user }));
        bind_to(&self.user_tickets, user.map(|user| getUserTicketsCall { user }));
        user
    }

    /// Look up one ticket.
    pub async fn ticket(&self, ticket_id: U256) -> LotteryResult<Option<Ticket>> {
        bind_to(
            &self.ticket_by_id,
            Some(getTicketByIdCall { ticketId: ticket_id }),
        );
        self.ticket_by_id.fetch().await
    }

    /// Read every round value concurrently.
    pub async fn snapshot(&self) -> RoundSnapshot {
        // Errors are recorded in each binding's state.
        let _ = tokio::join!(
            self.round_active.fetch(),
            self.round_id.fetch(),
            self.round_end_timestamp.fetch(),
            self.entry_count.fetch(),
            self.winner.fetch(),
            self.prize_amount_redeemed.fetch(),
            self.prize_claimed.fetch(),
        );

        RoundSnapshot {
            active: self.round_active.state(),
            round_id: self.round_id.state(),
            end_timestamp: self.round_end_timestamp.state(),
            entry_count: self.entry_count.state(),
            winner: self.winner.state(),
            prize_amount: self.prize_amount_redeemed.state(),
            prize_claimed: self.prize_claimed.state(),
        }
    }

    /// Read the connected user's tickets and refund concurrently.
    pub async fn user_snapshot(&self) -> UserSnapshot {
        let address = self.sync_address();
        let _ = tokio::join!(self.user_tickets.fetch(), self.expected_refund.fetch());
        UserSnapshot {
            address,
            tickets: self.user_tickets.state(),
            expected_refund: self.expected_refund.state(),
        }
    }
}
