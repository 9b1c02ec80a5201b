//! Error taxonomy for lottery client operations.
//!
//! Errors fall into four groups which decide how a feature reacts:
//!
//! - **Precondition** errors are caught before anything is sent (no wallet, allowance
//!   too low, round in the wrong state).
//! - **Signature** errors come from the wallet when the user declines.
//! - **Submission / confirmation** errors come from the chain after a transaction left
//!   the wallet (revert, RPC failure, receipt timeout).
//! - **Read** errors come from `eth_call` failures on read bindings.
//!
//! Raw wallet and RPC error strings are classified by `classify_error_message`.

use std::time::Duration;

use alloy::primitives::{B256, U256};
use thiserror::Error;

/// Errors surfaced by bindings and features.
#[derive(Debug, Clone, Error)]
pub enum LotteryError {
    #[error("wallet not connected")]
    WalletNotConnected,

    #[error("allowance {current} is below the required {required}")]
    InsufficientAllowance { required: U256, current: U256 },

    #[error("round is {}", round_state_text(.expected_active))]
    RoundStateMismatch { expected_active: bool },

    #[error("user rejected the request: {0}")]
    SignatureRejected(String),

    #[error("transaction submission failed: {0}")]
    Submission(String),

    #[error("transaction {hash} reverted: {reason}")]
    Reverted { hash: B256, reason: String },

    #[error("timed out waiting for receipt of {hash}")]
    ReceiptTimeout { hash: B256 },

    #[error("read of `{function}` failed: {message}")]
    Read { function: &'static str, message: String },

    #[error("a transaction is already in flight on this binding")]
    AlreadyInFlight,

    #[error("allowance still {last} after {attempts} attempts")]
    AllowanceTimeout { attempts: u32, last: U256 },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl LotteryError {
    /// Build a submission-side error from a raw wallet/RPC message, separating
    /// user rejections from other failures.
    pub fn from_send_message(message: impl Into<String>) -> Self {
        let message = message.into();
        match classify_error_message(&message) {
            TxErrorKind::UserRejected => LotteryError::SignatureRejected(message),
            _ => LotteryError::Submission(message),
        }
    }

    /// True for errors raised before any transaction was attempted.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            LotteryError::WalletNotConnected
                | LotteryError::InsufficientAllowance { .. }
                | LotteryError::RoundStateMismatch { .. }
                | LotteryError::AlreadyInFlight
        )
    }

    /// Message suitable for a notification body.
    pub fn reason(&self) -> String {
        match self {
            LotteryError::SignatureRejected(msg) | LotteryError::Submission(msg) => msg.clone(),
            LotteryError::Reverted { reason, .. } => reason.clone(),
            other => other.to_string(),
        }
    }
}

pub type LotteryResult<T> = Result<T, LotteryError>;

fn round_state_text(expected_active: &bool) -> &'static str {
    if *expected_active {
        "not active"
    } else {
        "still active"
    }
}

// ============================================================================
// Error Classification
// ============================================================================

/// Classified wallet / RPC error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxErrorKind {
    /// User declined in the wallet (EIP-1193 code 4001)
    UserRejected,
    /// Execution reverted, either during estimation or after inclusion
    Reverted,
    /// Sender cannot pay for gas or value
    InsufficientFunds,
    /// Transport level failure
    Network,
    Unknown,
}

impl TxErrorKind {
    /// Whether a later manual retry could plausibly succeed without user changes.
    pub fn is_transient(&self) -> bool {
        matches!(self, TxErrorKind::Network)
    }
}

/// Classify a raw wallet or RPC error message.
///
/// Wallets and RPC providers word the same condition differently, so several
/// patterns are checked per kind.
pub fn classify_error_message(message: &str) -> TxErrorKind {
    let error_str = message.to_lowercase();

    if error_str.contains("user rejected")
        || error_str.contains("user denied")
        || error_str.contains("rejected the request")
        || error_str.contains("code 4001")
        || error_str.contains("request rejected")
    {
        return TxErrorKind::UserRejected;
    }

    if error_str.contains("execution reverted")
        || error_str.contains("reverted")
        || error_str.contains("revert")
    {
        return TxErrorKind::Reverted;
    }

    if error_str.contains("insufficient funds")
        || error_str.contains("insufficient balance")
        || error_str.contains("exceeds balance")
    {
        return TxErrorKind::InsufficientFunds;
    }

    if error_str.contains("connection")
        || error_str.contains("timeout")
        || error_str.contains("timed out")
        || error_str.contains("network")
        || error_str.contains("transport")
        || error_str.contains("eof")
        || error_str.contains("broken pipe")
    {
        return TxErrorKind::Network;
    }

    TxErrorKind::Unknown
}

// ============================================================================
// Retry Utilities
// ============================================================================

/// Exponential backoff: `base_ms * 2^retry_count`, capped at `max_ms`.
///
/// # Examples
/// ```
/// use xyra_client::backoff_duration;
///
/// assert_eq!(backoff_duration(0, 250, 4_000).as_millis(), 250);
/// assert_eq!(backoff_duration(2, 250, 4_000).as_millis(), 1_000);
/// assert_eq!(backoff_duration(10, 250, 4_000).as_millis(), 4_000);
/// ```
pub fn backoff_duration(retry_count: u32, base_ms: u64, max_ms: u64) -> Duration {
    let ms = base_ms.saturating_mul(2u64.saturating_pow(retry_count));
    Duration::from_millis(ms.min(max_ms))
}
