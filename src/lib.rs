//! # xyra-client
//!
//! Client for the Xyra no-loss lottery contracts.
//!
//! ## Core Features
//!
//! - **Typed Contract Bindings**: read bindings with a shared query cache, write bindings with a
//!   phase machine (Idle → Pending → Submitted → Confirming → Confirmed/Failed)
//! - **Lifecycle Notifications**: each transaction arrow reported exactly once per attempt
//! - **Feature Operations**: approval, ticket purchase, claims, round and vault administration,
//!   registration
//! - **Bounded Allowance Polling**: exponential backoff with an attempt cap and overall deadline
//! - **Contract Error Parsing**: distributed registry for Solidity revert decoding
//! - **View Models**: pure formatting of round, ticket and button state
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use xyra_client::{features::Lottery, ClientConfig, LotteryContext, NetworkProvider, TracingSink};
//!
//! let config = ClientConfig::from_env()?;
//! let provider = Arc::new(NetworkProvider::from_config(&config).await?);
//! let ctx = LotteryContext::new(config, provider.clone(), provider, Arc::new(TracingSink));
//!
//! let lottery = Lottery::new(ctx);
//! lottery.tickets.buy_with_approval(U256::from(100)).await?;
//! ```

// ============================================================================
// Internal Module Declarations
// ============================================================================

/// Client configuration loaded from the environment
mod config;

/// Injected wallet / chain context and the shared read cache
mod context;

/// Contract error parser registry for decoding Solidity revert errors
mod contract_error;

/// Error taxonomy, wallet/RPC error classification and backoff
mod error;

/// Transaction lifecycle notifications
pub mod notifier;

/// Alloy-backed chain client and wallet
mod provider;

/// Typed read bindings
mod read;

/// Typed write bindings and the transaction phase machine
mod write;


// ============================================================================
// Public Modules
// ============================================================================

/// `sol!` interfaces of the lottery contracts
pub mod contracts;

/// Feature-level operations
pub mod features;

/// View models
pub mod views;

// ============================================================================
// Public Exports
// ============================================================================

/// Re-export of the alloy crate, used by `register_contract_errors!`.
pub use alloy;

/// Internal module for macro usage.
#[doc(hidden)]
pub mod __private {
    /// inventory crate - distributed plugin registration for contract error parsers
    pub use inventory;
    /// paste crate - identifier concatenation in macros
    pub use paste;
}

pub use config::*;
pub use context::*;
pub use contract_error::*;
pub use contracts::{Ticket, USDC_DECIMALS};
pub use error::*;
pub use notifier::{
    ChannelSink, Notification, NotificationLevel, NotificationSink, SinkEvent, TracingSink,
    TxMessages, TxNotifier, CONFIRM_IN_WALLET,
};
pub use provider::*;
pub use read::*;
pub use write::*;

pub use features::RoundSnapshot;
