//! Stablecoin approval for the lottery manager.

use std::sync::Arc;

use alloy::primitives::{Address, U256};

use super::{bind_to, refetch_quietly, reject, require_wallet};
use crate::{
    backoff_duration,
    contracts::IERC20::{allowanceCall, approveCall, balanceOfCall},
    LotteryContext, LotteryError, LotteryResult, ReadBinding, TxMessages, TxOutcome,
    WriteBinding,
};

const CONNECT_TO_APPROVE: &str = "Please connect your wallet to approve USDC.";

/// Approves the lottery manager to pull the user's stablecoin and tracks the allowance.
#[derive(Debug)]
pub struct Approval {
    ctx: Arc<LotteryContext>,
    spender: Address,
    approve: WriteBinding<approveCall>,
    allowance: ReadBinding<allowanceCall>,
    balance: ReadBinding<balanceOfCall>,
}

impl Approval {
    pub fn new(ctx: Arc<LotteryContext>) -> Self {
        let contracts = ctx.config().contracts;
        let spender = contracts.lottery_manager;
        let owner = ctx.connected_address();
        let allowance = ReadBinding::new(
            ctx.clone(),
            contracts.usdc,
            allowanceCall {
                owner: owner.unwrap_or_default(),
                spender,
            },
        )
        .enabled(owner.is_some());
        let balance = ReadBinding::new(
            ctx.clone(),
            contracts.usdc,
            balanceOfCall {
                account: owner.unwrap_or_default(),
            },
        )
        .enabled(owner.is_some());
        let approve = WriteBinding::new(ctx.clone(), contracts.usdc).with_messages(TxMessages::new(
            "USDC approved successfully!",
            "Error approving USDC",
            "Error confirming USDC approval",
        ));

        Self {
            ctx,
            spender,
            approve,
            allowance,
            balance,
        }
    }

    pub fn binding(&self) -> &WriteBinding<approveCall> {
        &self.approve
    }

    /// Last fetched allowance, without a network call.
    pub fn last_allowance(&self) -> Option<U256> {
        self.allowance.data()
    }

    /// Allowance of the connected wallet, possibly from cache.
    pub async fn allowance(&self) -> LotteryResult<Option<U256>> {
        self.sync_owner();
        self.allowance.fetch().await
    }

    /// Allowance of the connected wallet, read from the chain.
    pub async fn refetch_allowance(&self) -> LotteryResult<Option<U256>> {
        self.sync_owner();
        self.allowance.refetch().await
    }

    /// Stablecoin balance of the connected wallet.
    pub async fn balance(&self) -> LotteryResult<Option<U256>> {
        bind_to(
            &self.balance,
            self.ctx
                .connected_address()
                .map(|account| balanceOfCall { account }),
        );
        self.balance.fetch().await
    }

    /// Approve `amount` for the lottery manager and refresh the allowance once confirmed.
    pub async fn approve(&self, amount: U256) -> LotteryResult<TxOutcome> {
        require_wallet(&self.ctx, CONNECT_TO_APPROVE)?;

        tracing::debug!(spender = %self.spender, %amount, "approving");
        let outcome = self
            .approve
            .submit(approveCall {
                spender: self.spender,
                amount,
            })
            .await?;

        self.refresh_allowance().await;
        Ok(outcome)
    }

    /// Refetch the allowance after a transaction that changed it, logging failures.
    pub(crate) async fn refresh_allowance(&self) {
        self.sync_owner();
        refetch_quietly(&self.allowance).await;
    }

    /// Poll the allowance until it reaches `min`.
    ///
    /// A confirmed approval is not always visible to the next read (load-balanced RPC
    /// nodes can lag a block). Polling backs off exponentially and gives up after the
    /// configured attempts or overall timeout with `AllowanceTimeout`.
    pub async fn wait_for_allowance(&self, min: U256) -> LotteryResult<U256> {
        require_wallet(&self.ctx, CONNECT_TO_APPROVE)?;
        let policy = self.ctx.config().allowance_poll;
        let base_ms = policy.base_delay.as_millis() as u64;
        let max_ms = policy.max_delay.as_millis() as u64;
        let mut attempts = 0u32;
        let mut last = U256::ZERO;

        let poll = async {
            loop {
                attempts += 1;
                match self.refetch_allowance().await {
                    Ok(Some(current)) => {
                        last = current;
                        if current >= min {
                            return Ok(current);
                        }
                    }
                    // Disconnected while polling
                    Ok(None) => {
                        require_wallet(&self.ctx, CONNECT_TO_APPROVE)?;
                    }
                    Err(e) => tracing::debug!(attempts, error = %e, "allowance read failed"),
                }

                if attempts >= policy.max_attempts {
                    return Err(LotteryError::AllowanceTimeout { attempts, last });
                }
                let delay = backoff_duration(attempts - 1, base_ms, max_ms);
                tracing::debug!(attempts, %last, %min, ?delay, "allowance below required, backing off");
                tokio::time::sleep(delay).await;
            }
        };

        let result = match tokio::time::timeout(policy.timeout, poll).await {
            Ok(result) => result,
            Err(_) => Err(LotteryError::AllowanceTimeout { attempts, last }),
        };
        if let Err(e @ LotteryError::AllowanceTimeout { .. }) = &result {
            return Err(reject(&self.ctx, "Approval not visible yet", e.clone()));
        }
        result
    }

    fn sync_owner(&self) {
        bind_to(
            &self.allowance,
            self.ctx.connected_address().map(|owner| allowanceCall {
                owner,
                spender: self.spender,
            }),
        );
    }
}
