//! User registration and the onboarding flow.

use std::sync::Arc;

use super::{bind_to, require_wallet};
use crate::{
    contracts::UserRegistry::{isRegisteredCall, registerCall},
    LotteryContext, LotteryResult, ReadBinding, TxMessages, TxOutcome, WriteBinding,
};

/// Result of `Registration::onboard`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Onboarding {
    AlreadyRegistered,
    Registered(TxOutcome),
}

#[derive(Debug)]
pub struct Registration {
    ctx: Arc<LotteryContext>,
    register: WriteBinding<registerCall>,
    is_registered: ReadBinding<isRegisteredCall>,
}

impl Registration {
    pub fn new(ctx: Arc<LotteryContext>) -> Self {
        let registry = ctx.config().contracts.user_registry;
        let user = ctx.connected_address();

        Self {
            register: WriteBinding::new(ctx.clone(), registry).with_messages(TxMessages::new(
                "Transaction confirmed!",
                "Registration failed",
                "Transaction failed during confirmation",
            )),
            is_registered: ReadBinding::new(
                ctx.clone(),
                registry,
                isRegisteredCall {
                    user: user.unwrap_or_default(),
                },
            )
            .enabled(user.is_some()),
            ctx,
        }
    }

    /// Whether the connected wallet is registered. `None` without a wallet.
    pub async fn is_registered(&self) -> LotteryResult<Option<bool>> {
        self.sync_user();
        self.is_registered.refetch().await
    }

    /// Register the connected wallet.
    ///
    /// Unlike other features the error is meant to be acted on: the onboarding flow
    /// disconnects the wallet when registration fails.
    pub async fn register(&self) -> LotteryResult<TxOutcome> {
        require_wallet(&self.ctx, "Wallet not connected!")?;
        let outcome = self.register.submit(registerCall {}).await?;
        self.sync_user();
        if let Err(e) = self.is_registered.refetch().await {
            tracing::warn!(error = %e, "registration status refetch failed");
        }
        Ok(outcome)
    }

    /// Connect, check registration, register if needed. Disconnects on failure.
    pub async fn onboard(&self) -> LotteryResult<Onboarding> {
        let address = self.ctx.wallet().connect().await?;
        tracing::info!(%address, "onboarding");

        let result = match self.is_registered().await {
            Ok(Some(true)) => Ok(Onboarding::AlreadyRegistered),
            Ok(_) => self.register().await.map(Onboarding::Registered),
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            tracing::warn!(%address, error = %e, "onboarding failed, disconnecting");
            self.ctx.wallet().disconnect().await;
        }
        result
    }

    fn sync_user(&self) {
        bind_to(
            &self.is_registered,
            self.ctx
                .connected_address()
                .map(|user| isRegisteredCall { user }),
        );
    }
}
