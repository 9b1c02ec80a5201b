//! Transaction lifecycle notifications.
//!
//! `TxNotifier` turns write-binding phase transitions into user-facing messages:
//!
//! ```text
//! idle ──► pending ──► confirming ──► confirmed
//!   "confirm in wallet"  "confirming"    "<success>"
//!             │               │
//!             └──► failed ◄───┘  "<error prefix>: <reason>"
//! ```
//!
//! Each arrow fires at most once per attempt, however many times a phase is
//! observed. Views are free to re-observe the current phase on every render.
//! Starting a new attempt clears the flags.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::{FailureStage, TxPhase};

// ============================================================================
// Notification surface
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

/// A transient user-visible message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    /// `None` keeps the message until dismissed
    pub auto_dismiss: Option<Duration>,
}

impl Notification {
    const DEFAULT_DISMISS: Duration = Duration::from_secs(5);

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
            auto_dismiss: Some(Self::DEFAULT_DISMISS),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
            auto_dismiss: Some(Self::DEFAULT_DISMISS),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
            auto_dismiss: Some(Self::DEFAULT_DISMISS),
        }
    }

    /// Keep the message on screen until dismissed.
    pub fn sticky(mut self) -> Self {
        self.auto_dismiss = None;
        self
    }
}

/// Where notifications go. Not part of application state.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);

    /// Clear messages still on screen (called before a success message).
    fn dismiss_all(&self) {}
}

/// Sink that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Info => tracing::info!(message = %notification.message, "notice"),
            NotificationLevel::Success => {
                tracing::info!(message = %notification.message, "success")
            }
            NotificationLevel::Error => tracing::warn!(message = %notification.message, "error"),
        }
    }
}

/// Events delivered by `ChannelSink`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Show(Notification),
    DismissAll,
}

/// Sink that forwards to a renderer task over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SinkEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SinkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, notification: Notification) {
        // The renderer may already be gone on shutdown.
        let _ = self.tx.send(SinkEvent::Show(notification));
    }

    fn dismiss_all(&self) {
        let _ = self.tx.send(SinkEvent::DismissAll);
    }
}

// ============================================================================
// Per-feature message text
// ============================================================================

/// Message text for one feature's transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxMessages {
    /// Shown on confirmation
    pub success: String,
    /// Prefix for failures before the transaction left the wallet
    pub write_error: String,
    /// Prefix for failures after submission (revert, RPC, timeout)
    pub confirm_error: String,
}

impl TxMessages {
    pub fn new(
        success: impl Into<String>,
        write_error: impl Into<String>,
        confirm_error: impl Into<String>,
    ) -> Self {
        Self {
            success: success.into(),
            write_error: write_error.into(),
            confirm_error: confirm_error.into(),
        }
    }
}

impl Default for TxMessages {
    fn default() -> Self {
        Self::new(
            "Transaction confirmed!",
            "Error",
            "Error confirming transaction",
        )
    }
}

pub const CONFIRM_IN_WALLET: &str = "Confirm transaction in your wallet...";
pub const CONFIRMING: &str = "Confirming transaction...";

// ============================================================================
// TxNotifier
// ============================================================================

/// Bit flags recording which arrows already produced a notification.
pub mod shown {
    pub const PENDING: u8 = 1 << 0;
    pub const CONFIRMING: u8 = 1 << 1;
    pub const CONFIRMED: u8 = 1 << 2;
    pub const FAILED: u8 = 1 << 3;

    /// Flags that end an attempt
    pub const TERMINAL: u8 = CONFIRMED | FAILED;
}

/// Phase-to-notification state machine for one write binding.
pub struct TxNotifier {
    messages: TxMessages,
    shown: u8,
    sink: std::sync::Arc<dyn NotificationSink>,
}

impl TxNotifier {
    pub fn new(sink: std::sync::Arc<dyn NotificationSink>, messages: TxMessages) -> Self {
        Self {
            messages,
            shown: 0,
            sink,
        }
    }

    pub fn messages(&self) -> &TxMessages {
        &self.messages
    }

    /// Flags set during the current attempt.
    pub fn shown(&self) -> u8 {
        self.shown
    }

    /// Start a fresh attempt.
    pub fn begin_attempt(&mut self) {
        self.shown = 0;
    }

    /// Observe the current phase, emitting at most one notification per arrow.
    ///
    /// Returns the notification when one was emitted.
    pub fn observe(&mut self, phase: &TxPhase) -> Option<Notification> {
        let (flag, notification) = match phase {
            TxPhase::Idle | TxPhase::Submitted { .. } => return None,
            TxPhase::Pending => {
                if self.shown & shown::TERMINAL != 0 {
                    self.begin_attempt();
                }
                (shown::PENDING, Notification::info(CONFIRM_IN_WALLET).sticky())
            }
            TxPhase::Confirming { .. } => {
                (shown::CONFIRMING, Notification::info(CONFIRMING).sticky())
            }
            TxPhase::Confirmed { .. } => (
                shown::CONFIRMED,
                Notification::success(self.messages.success.clone()),
            ),
            TxPhase::Failed { stage, reason } => {
                let prefix = match stage {
                    FailureStage::BeforeSignature => &self.messages.write_error,
                    FailureStage::AfterSubmission => &self.messages.confirm_error,
                };
                (
                    shown::FAILED,
                    Notification::error(format!("{prefix}: {reason}")),
                )
            }
        };

        if self.shown & flag != 0 {
            return None;
        }
        self.shown |= flag;

        if flag == shown::CONFIRMED {
            self.sink.dismiss_all();
        }
        self.sink.notify(notification.clone());
        Some(notification)
    }
}

impl std::fmt::Debug for TxNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxNotifier")
            .field("messages", &self.messages)
            .field("shown", &self.shown)
            .finish()
    }
}
