//! Typed write bindings and the transaction phase machine.
//!
//! ```text
//! submit()
//!    │
//!    ▼
//! Pending ──(wallet rejects / send fails)──► Failed { BeforeSignature }
//!    │
//!    ▼ hash
//! Submitted ──► Confirming ──(revert / rpc error / timeout)──► Failed { AfterSubmission }
//!                    │
//!                    ▼ receipt.status == 1
//!                Confirmed
//! ```
//!
//! A binding runs at most one attempt at a time: a second `submit()` while one is in
//! flight returns `AlreadyInFlight` without touching the wallet. The current phase is
//! published on a `watch` channel for views; an attached `TxNotifier` sees every
//! transition synchronously, so no phase is skipped for notification purposes.

use std::{
    marker::PhantomData,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use alloy::{
    primitives::{Address, Bytes, B256},
    sol_types::SolCall,
};
use tokio::sync::watch;

use crate::{LotteryContext, LotteryError, LotteryResult, TxMessages, TxNotifier, TxOutcome};

/// Where an attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// Before a transaction hash existed (rejected signature, send error)
    BeforeSignature,
    /// After submission (revert, RPC failure, receipt timeout)
    AfterSubmission,
}

/// Lifecycle phase of a write binding.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TxPhase {
    #[default]
    Idle,
    /// Waiting for the wallet to sign
    Pending,
    Submitted { hash: B256 },
    Confirming { hash: B256 },
    Confirmed { hash: B256, block_number: Option<u64> },
    Failed { stage: FailureStage, reason: String },
}

impl TxPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TxPhase::Confirmed { .. } | TxPhase::Failed { .. })
    }

    pub fn hash(&self) -> Option<B256> {
        match self {
            TxPhase::Submitted { hash }
            | TxPhase::Confirming { hash }
            | TxPhase::Confirmed { hash, .. } => Some(*hash),
            _ => None,
        }
    }
}

/// The transaction a binding is tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxHandle {
    pub hash: B256,
    pub phase: TxPhase,
}

/// Binding to a single state-changing function on a single contract.
pub struct WriteBinding<C> {
    ctx: Arc<LotteryContext>,
    to: Address,
    phase: watch::Sender<TxPhase>,
    in_flight: AtomicBool,
    notifier: Option<Mutex<TxNotifier>>,
    _call: PhantomData<fn() -> C>,
}

impl<C: SolCall> WriteBinding<C> {
    pub fn new(ctx: Arc<LotteryContext>, to: Address) -> Self {
        let (phase, _) = watch::channel(TxPhase::Idle);
        Self {
            ctx,
            to,
            phase,
            in_flight: AtomicBool::new(false),
            notifier: None,
            _call: PhantomData,
        }
    }

    /// Attach a notifier that reports phase transitions to the context's sink.
    pub fn with_messages(mut self, messages: TxMessages) -> Self {
        let sink = self.ctx.notifications().clone();
        self.notifier = Some(Mutex::new(TxNotifier::new(sink, messages)));
        self
    }

    pub fn contract(&self) -> Address {
        self.to
    }

    pub fn phase(&self) -> TxPhase {
        self.phase.borrow().clone()
    }

    /// Subscribe to phase changes.
    pub fn subscribe(&self) -> watch::Receiver<TxPhase> {
        self.phase.subscribe()
    }

    /// Waiting on the wallet or for the transaction to be picked up.
    pub fn is_pending(&self) -> bool {
        matches!(*self.phase.borrow(), TxPhase::Pending | TxPhase::Submitted { .. })
    }

    pub fn is_confirming(&self) -> bool {
        matches!(*self.phase.borrow(), TxPhase::Confirming { .. })
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(*self.phase.borrow(), TxPhase::Confirmed { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(*self.phase.borrow(), TxPhase::Failed { .. })
    }

    /// Pending or confirming.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn tx_hash(&self) -> Option<B256> {
        self.phase.borrow().hash()
    }

    /// Hash and phase of the current transaction, once one was submitted.
    pub fn handle(&self) -> Option<TxHandle> {
        let phase = self.phase();
        phase.hash().map(|hash| TxHandle { hash, phase })
    }

    /// Return to `Idle` after a terminal phase. No effect while an attempt is running.
    pub fn reset(&self) {
        if !self.is_busy() {
            self.set_phase(TxPhase::Idle);
        }
    }

    /// Sign, send and wait for the receipt of `call`.
    pub async fn submit(&self, call: C) -> LotteryResult<TxOutcome> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!(function = C::SIGNATURE, to = %self.to, "submit while in flight");
            return Err(LotteryError::AlreadyInFlight);
        }
        let _guard = InFlightGuard {
            binding: &self.in_flight,
            phase: &self.phase,
            function: C::SIGNATURE,
        };

        if let Some(notifier) = &self.notifier {
            if let Ok(mut notifier) = notifier.lock() {
                notifier.begin_attempt();
            }
        }
        self.set_phase(TxPhase::Pending);

        let input: Bytes = call.abi_encode().into();
        let hash = match self.ctx.wallet().sign_and_send(self.to, input).await {
            Ok(hash) => hash,
            Err(e) => return Err(self.fail(FailureStage::BeforeSignature, e)),
        };
        self.set_phase(TxPhase::Submitted { hash });
        self.set_phase(TxPhase::Confirming { hash });

        let outcome = match self.wait(hash).await {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.fail(FailureStage::AfterSubmission, e)),
        };

        if !outcome.success {
            let reason = outcome
                .revert_reason
                .clone()
                .unwrap_or_else(|| "transaction reverted".to_string());
            return Err(self.fail(
                FailureStage::AfterSubmission,
                LotteryError::Reverted { hash, reason },
            ));
        }

        tracing::info!(
            function = C::SIGNATURE,
            to = %self.to,
            %hash,
            block_number = ?outcome.block_number,
            "transaction confirmed"
        );
        self.set_phase(TxPhase::Confirmed {
            hash,
            block_number: outcome.block_number,
        });
        Ok(outcome)
    }

    /// Wait for the receipt; on timeout, probe once in case it was mined meanwhile.
    async fn wait(&self, hash: B256) -> LotteryResult<TxOutcome> {
        let client = self.ctx.client();
        let timeout = self.ctx.config().receipt_timeout;
        match client.wait_for_receipt(hash, timeout).await {
            Err(LotteryError::ReceiptTimeout { hash }) => {
                tracing::debug!(%hash, "receipt timeout, checking chain state");
                match client.receipt(hash).await {
                    Ok(Some(outcome)) => Ok(outcome),
                    Ok(None) => Err(LotteryError::ReceiptTimeout { hash }),
                    Err(e) => {
                        tracing::debug!(%hash, error = %e, "receipt probe failed");
                        Err(LotteryError::ReceiptTimeout { hash })
                    }
                }
            }
            other => other,
        }
    }

    fn fail(&self, stage: FailureStage, error: LotteryError) -> LotteryError {
        tracing::warn!(
            function = C::SIGNATURE,
            to = %self.to,
            ?stage,
            error = %error,
            "transaction failed"
        );
        self.set_phase(TxPhase::Failed {
            stage,
            reason: error.reason(),
        });
        error
    }

    fn set_phase(&self, phase: TxPhase) {
        tracing::trace!(function = C::SIGNATURE, ?phase, "write phase");
        if let Some(notifier) = &self.notifier {
            if let Ok(mut notifier) = notifier.lock() {
                notifier.observe(&phase);
            }
        }
        self.phase.send_replace(phase);
    }
}

impl<C: SolCall> std::fmt::Debug for WriteBinding<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteBinding")
            .field("function", &C::SIGNATURE)
            .field("to", &self.to)
            .field("phase", &*self.phase.borrow())
            .finish()
    }
}

/// Clears the in-flight flag when `submit` returns or its future is dropped.
struct InFlightGuard<'a> {
    binding: &'a AtomicBool,
    phase: &'a watch::Sender<TxPhase>,
    function: &'static str,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let phase = self.phase.borrow().clone();
        if !phase.is_terminal() {
            // The transaction may still be mined; nothing will observe it.
            tracing::debug!(
                function = self.function,
                ?phase,
                "submit dropped before a terminal phase"
            );
        }
        self.binding.store(false, Ordering::Release);
    }
}
