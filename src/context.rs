//! Injected wallet / chain context shared by every binding and feature.
//!
//! Nothing in the crate reaches for a global wallet or client. Features receive an
//! `Arc<LotteryContext>` holding:
//!
//! - a `WalletProvider` (address, connect, disconnect, sign-and-send)
//! - a `ChainClient` (eth_call, receipt wait, receipt probe)
//! - a `NotificationSink` for user-facing messages
//! - the resolved `ClientConfig`
//! - a `QueryCache` shared by read bindings
//!
//! Tests substitute an in-memory chain for both traits.

use std::{sync::Arc, time::Duration};

use alloy::primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::trace;

use crate::{ClientConfig, LotteryResult, NotificationSink};

// ============================================================================
// External collaborators
// ============================================================================

/// Final result of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutcome {
    pub hash: B256,
    /// Receipt status; `false` means the transaction reverted on chain
    pub success: bool,
    pub block_number: Option<u64>,
    /// Decoded revert reason when the client could recover one
    pub revert_reason: Option<String>,
}

/// Read/receipt side of the blockchain client.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Perform an `eth_call` and return the raw return data.
    async fn call(&self, to: Address, input: Bytes) -> LotteryResult<Bytes>;

    /// Wait until the transaction is mined, bounded by `timeout`.
    async fn wait_for_receipt(&self, hash: B256, timeout: Duration) -> LotteryResult<TxOutcome>;

    /// Look up a receipt once without waiting.
    async fn receipt(&self, hash: B256) -> LotteryResult<Option<TxOutcome>>;
}

/// Wallet capability set consumed by the client.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Currently connected account, if any.
    fn address(&self) -> Option<Address>;

    async fn connect(&self) -> LotteryResult<Address>;

    async fn disconnect(&self);

    /// Sign a call to `to` with `input` and broadcast it, returning the transaction hash.
    ///
    /// Fails with `SignatureRejected` when the user declines.
    async fn sign_and_send(&self, to: Address, input: Bytes) -> LotteryResult<B256>;
}

// ============================================================================
// QueryCache
// ============================================================================

#[derive(Debug, Clone)]
struct CacheEntry {
    data: Bytes,
    fetched_at: Instant,
}

/// Raw `eth_call` results keyed by `(contract, calldata)`.
///
/// Two bindings issuing the same call share one entry, so a `refetch()` on one
/// refreshes what the other sees on its next `fetch()`.
#[derive(Debug, Clone, Default)]
pub struct QueryCache {
    entries: Arc<DashMap<(Address, Bytes), CacheEntry>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached bytes younger than `stale_time`.
    pub fn get_fresh(&self, to: Address, input: &Bytes, stale_time: Duration) -> Option<Bytes> {
        let entry = self.entries.get(&(to, input.clone()))?;
        if entry.fetched_at.elapsed() < stale_time {
            trace!(%to, "query cache hit");
            Some(entry.data.clone())
        } else {
            None
        }
    }

    pub fn insert(&self, to: Address, input: Bytes, data: Bytes) {
        self.entries.insert(
            (to, input),
            CacheEntry {
                data,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Drop every cached read against `to`.
    pub fn invalidate_contract(&self, to: Address) {
        self.entries.retain(|(addr, _), _| *addr != to);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// LotteryContext
// ============================================================================

/// Everything a feature needs to talk to the chain and the user.
pub struct LotteryContext {
    wallet: Arc<dyn WalletProvider>,
    client: Arc<dyn ChainClient>,
    notifications: Arc<dyn NotificationSink>,
    config: ClientConfig,
    cache: QueryCache,
}

impl LotteryContext {
    pub fn new(
        config: ClientConfig,
        wallet: Arc<dyn WalletProvider>,
        client: Arc<dyn ChainClient>,
        notifications: Arc<dyn NotificationSink>,
    ) -> Arc<Self> {
        Arc::new(Self {
            wallet,
            client,
            notifications,
            config,
            cache: QueryCache::new(),
        })
    }

    pub fn wallet(&self) -> &Arc<dyn WalletProvider> {
        &self.wallet
    }

    pub fn client(&self) -> &Arc<dyn ChainClient> {
        &self.client
    }

    pub fn notifications(&self) -> &Arc<dyn NotificationSink> {
        &self.notifications
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// The connected address, read fresh from the wallet on every call.
    pub fn connected_address(&self) -> Option<Address> {
        self.wallet.address()
    }
}

impl std::fmt::Debug for LotteryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LotteryContext")
            .field("connected", &self.wallet.address())
            .field("contracts", &self.config.contracts)
            .field("cached_reads", &self.cache.len())
            .finish()
    }
}
