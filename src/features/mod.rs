//! Feature-level operations composed from read and write bindings.
//!
//! Every write follows the same sequence:
//!
//! ```text
//! wallet guard ──► domain precondition ──► submit ──► (confirmed) dependent refetches / flags
//!      │                   │
//!      ▼                   ▼
//!  one error notification, nothing submitted
//! ```
//!
//! Refetch failures after a confirmed transaction are logged and do not turn the
//! confirmed operation into an error.

mod approval;
mod claims;
mod reads;
mod registry;
mod rounds;
mod tickets;
mod vault;

pub use approval::*;
pub use claims::*;
pub use reads::*;
pub use registry::*;
pub use rounds::*;
pub use tickets::*;
pub use vault::*;

use std::sync::Arc;

use alloy::{primitives::Address, sol_types::SolCall};

use crate::{LotteryContext, LotteryError, LotteryResult, Notification, ReadBinding};

/// Connected address, or one error notification and `WalletNotConnected`.
pub(crate) fn require_wallet(ctx: &LotteryContext, message: &str) -> LotteryResult<Address> {
    match ctx.connected_address() {
        Some(address) => Ok(address),
        None => {
            tracing::warn!(message, "wallet not connected");
            ctx.notifications().notify(Notification::error(message));
            Err(LotteryError::WalletNotConnected)
        }
    }
}

/// Report a failed precondition to the user and hand the error back.
pub(crate) fn reject(ctx: &LotteryContext, prefix: &str, error: LotteryError) -> LotteryError {
    tracing::warn!(error = %error, "precondition failed");
    ctx.notifications()
        .notify(Notification::error(format!("{prefix}: {error}")));
    error
}

/// Point an address-keyed read at `call`, or disable it when there is no address.
pub(crate) fn bind_to<C>(binding: &ReadBinding<C>, call: Option<C>)
where
    C: SolCall + Clone + PartialEq + Send + Sync,
    C::Return: Clone + Send + Sync,
{
    match call {
        Some(call) => {
            if binding.args() != call {
                binding.set_args(call);
            }
            binding.set_enabled(true);
        }
        None => binding.set_enabled(false),
    }
}

/// Refetch after a confirmed transaction, logging failures.
pub(crate) async fn refetch_quietly<C>(binding: &ReadBinding<C>)
where
    C: SolCall + Clone + Send + Sync,
    C::Return: Clone + Send + Sync,
{
    if let Err(e) = binding.refetch().await {
        tracing::warn!(function = C::SIGNATURE, error = %e, "dependent refetch failed");
    }
}

/// All features over one shared context.
#[derive(Debug)]
pub struct Lottery {
    pub approval: Arc<Approval>,
    pub tickets: TicketPurchase,
    pub claims: Claims,
    pub rounds: RoundControl,
    pub vault: VaultControl,
    pub registration: Registration,
    pub reads: RoundReads,
}

impl Lottery {
    pub fn new(ctx: Arc<LotteryContext>) -> Self {
        let approval = Arc::new(Approval::new(ctx.clone()));
        Self {
            tickets: TicketPurchase::new(ctx.clone(), approval.clone()),
            approval,
            claims: Claims::new(ctx.clone()),
            rounds: RoundControl::new(ctx.clone()),
            vault: VaultControl::new(ctx.clone()),
            registration: Registration::new(ctx.clone()),
            reads: RoundReads::new(ctx),
        }
    }
}
