//! Alloy-backed wallet and chain client.
//!
//! `NetworkProvider` implements both `ChainClient` and `WalletProvider` on top of an
//! alloy HTTP provider:
//!
//! ```text
//! NetworkProvider (enum)
//! ├── Http: eth_call + receipts only (no account)
//! └── Wallet: Http + local signer, connect/disconnect toggles exposure of the address
//! ```
//!
//! Revert reasons are decoded through the contract error registry. For transactions
//! that revert on chain, the original request is replayed with `eth_call` against the
//! parent block to recover the revert data.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use alloy::{
    eips::BlockId,
    network::{Ethereum, EthereumWallet, NetworkWallet, ReceiptResponse, TransactionBuilder},
    primitives::{Address, Bytes, B256},
    providers::{
        DynProvider, PendingTransactionBuilder, PendingTransactionError, Provider,
        ProviderBuilder, WatchTxError,
    },
    rpc::types::{TransactionReceipt, TransactionRequest},
    signers::local::PrivateKeySigner,
    transports::http::reqwest::Url,
};
use async_trait::async_trait;
use dashmap::DashMap;

use crate::{
    pretty_rpc_error, revert_data, revert_reason, ChainClient, ClientConfig, LotteryError,
    LotteryResult, TxOutcome, WalletProvider,
};

/// Wallet-less or wallet-backed connection to the chain.
#[derive(Clone)]
pub enum NetworkProvider {
    /// Read-only provider
    Http {
        chain_id: u64,
        url: Url,
        poll_interval: Option<Duration>,
        provider: DynProvider,
    },
    /// Provider with a local signer
    Wallet {
        chain_id: u64,
        url: Url,
        poll_interval: Option<Duration>,
        base: DynProvider,
        provider: DynProvider,
        address: Address,
        /// Whether the account is exposed to the application
        connected: Arc<AtomicBool>,
        /// Requests sent through this provider, kept for revert replay
        sent: Arc<DashMap<B256, TransactionRequest>>,
    },
}

impl NetworkProvider {
    /// Create an HTTP provider without a signer.
    pub async fn with_http(rpc_url: &str, poll_interval: Option<Duration>) -> anyhow::Result<Self> {
        let url: Url = rpc_url.parse()?;
        let provider = ProviderBuilder::new().connect_http(url.clone()).erased();
        if let Some(poll_interval) = poll_interval {
            provider.client().set_poll_interval(poll_interval);
        }
        let chain_id = provider.get_chain_id().await?;
        tracing::debug!(%url, chain_id, "connected http provider");

        Ok(Self::Http {
            chain_id,
            url,
            poll_interval,
            provider,
        })
    }

    /// Attach a local signer. The wallet starts disconnected.
    pub fn with_signer(&self, signer: PrivateKeySigner) -> Self {
        let wallet = EthereumWallet::new(signer);
        let address = <EthereumWallet as NetworkWallet<Ethereum>>::default_signer_address(&wallet);
        let (chain_id, url, poll_interval, base) = match self {
            NetworkProvider::Http {
                chain_id,
                url,
                poll_interval,
                provider,
            } => (*chain_id, url.clone(), *poll_interval, provider.clone()),
            NetworkProvider::Wallet {
                chain_id,
                url,
                poll_interval,
                base,
                ..
            } => (*chain_id, url.clone(), *poll_interval, base.clone()),
        };

        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect_http(url.clone())
            .erased();
        if let Some(poll_interval) = poll_interval {
            provider.client().set_poll_interval(poll_interval);
        }

        NetworkProvider::Wallet {
            chain_id,
            url,
            poll_interval,
            base,
            provider,
            address,
            connected: Arc::new(AtomicBool::new(false)),
            sent: Arc::new(DashMap::new()),
        }
    }

    /// Build from configuration, attaching the signer when a private key is set.
    pub async fn from_config(config: &ClientConfig) -> anyhow::Result<Self> {
        let provider = Self::with_http(&config.rpc_url, config.poll_interval).await?;
        match &config.private_key {
            Some(key) => {
                let signer: PrivateKeySigner = key.trim().parse()?;
                Ok(provider.with_signer(signer))
            }
            None => Ok(provider),
        }
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            NetworkProvider::Http { chain_id, .. } => *chain_id,
            NetworkProvider::Wallet { chain_id, .. } => *chain_id,
        }
    }

    fn provider(&self) -> &DynProvider {
        match self {
            NetworkProvider::Http { provider, .. } => provider,
            NetworkProvider::Wallet { provider, .. } => provider,
        }
    }

    /// Map a mined receipt to an outcome, recovering the revert reason when it failed.
    async fn outcome(&self, receipt: TransactionReceipt) -> TxOutcome {
        let hash = receipt.transaction_hash;
        let block_number = receipt.block_number;
        if receipt.status() {
            return TxOutcome {
                hash,
                success: true,
                block_number,
                revert_reason: None,
            };
        }

        let revert_reason = self.replay_revert(hash, block_number).await;
        tracing::debug!(%hash, ?block_number, ?revert_reason, "transaction reverted");
        TxOutcome {
            hash,
            success: false,
            block_number,
            revert_reason,
        }
    }

    async fn replay_revert(&self, hash: B256, block_number: Option<u64>) -> Option<String> {
        let NetworkProvider::Wallet { sent, provider, .. } = self else {
            return None;
        };
        let request = sent.get(&hash).map(|r| r.clone())?;
        let block = BlockId::number(block_number?.saturating_sub(1));

        match provider.call(request).block(block).await {
            // Succeeds against the parent state: the revert depended on ordering in the block.
            Ok(_) => None,
            Err(e) => Some(match revert_data(&e) {
                Some(data) => revert_reason(&data),
                None => pretty_rpc_error(e).to_string(),
            }),
        }
    }
}

impl std::fmt::Debug for NetworkProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkProvider::Http { chain_id, url, .. } => f
                .debug_struct("Http")
                .field("chain_id", chain_id)
                .field("url", &url.as_str())
                .finish(),
            NetworkProvider::Wallet {
                chain_id,
                url,
                address,
                connected,
                ..
            } => f
                .debug_struct("Wallet")
                .field("chain_id", chain_id)
                .field("url", &url.as_str())
                .field("address", address)
                .field("connected", &connected.load(Ordering::Acquire))
                .finish(),
        }
    }
}

// ============================================================================
// ChainClient
// ============================================================================

#[async_trait]
impl ChainClient for NetworkProvider {
    async fn call(&self, to: Address, input: Bytes) -> LotteryResult<Bytes> {
        let tx = TransactionRequest::default().with_to(to).with_input(input);
        self.provider()
            .call(tx)
            .await
            .map_err(|e| LotteryError::Read {
                function: "eth_call",
                message: pretty_rpc_error(e).to_string(),
            })
    }

    async fn wait_for_receipt(&self, hash: B256, timeout: Duration) -> LotteryResult<TxOutcome> {
        let pending = PendingTransactionBuilder::<Ethereum>::new(self.provider().root().clone(), hash)
            .with_timeout(Some(timeout));

        match pending.get_receipt().await {
            Ok(receipt) => Ok(self.outcome(receipt).await),
            Err(PendingTransactionError::TxWatcher(WatchTxError::Timeout)) => {
                tracing::debug!(%hash, ?timeout, "receipt wait timed out");
                Err(LotteryError::ReceiptTimeout { hash })
            }
            Err(e) => Err(LotteryError::Submission(e.to_string())),
        }
    }

    async fn receipt(&self, hash: B256) -> LotteryResult<Option<TxOutcome>> {
        let receipt = self
            .provider()
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| LotteryError::Submission(pretty_rpc_error(e).to_string()))?;
        match receipt {
            Some(receipt) => Ok(Some(self.outcome(receipt).await)),
            None => Ok(None),
        }
    }
}

// ============================================================================
// WalletProvider
// ============================================================================

#[async_trait]
impl WalletProvider for NetworkProvider {
    fn address(&self) -> Option<Address> {
        match self {
            NetworkProvider::Http { .. } => None,
            NetworkProvider::Wallet {
                address, connected, ..
            } => connected.load(Ordering::Acquire).then_some(*address),
        }
    }

    async fn connect(&self) -> LotteryResult<Address> {
        match self {
            NetworkProvider::Http { .. } => Err(LotteryError::WalletNotConnected),
            NetworkProvider::Wallet {
                address, connected, ..
            } => {
                connected.store(true, Ordering::Release);
                tracing::info!(%address, "wallet connected");
                Ok(*address)
            }
        }
    }

    async fn disconnect(&self) {
        if let NetworkProvider::Wallet {
            address, connected, ..
        } = self
        {
            if connected.swap(false, Ordering::AcqRel) {
                tracing::info!(%address, "wallet disconnected");
            }
        }
    }

    async fn sign_and_send(&self, to: Address, input: Bytes) -> LotteryResult<B256> {
        let NetworkProvider::Wallet {
            provider,
            address,
            connected,
            sent,
            ..
        } = self
        else {
            return Err(LotteryError::WalletNotConnected);
        };
        if !connected.load(Ordering::Acquire) {
            return Err(LotteryError::WalletNotConnected);
        }

        let tx = TransactionRequest::default()
            .with_from(*address)
            .with_to(to)
            .with_input(input);
        let pending = provider
            .send_transaction(tx.clone())
            .await
            .map_err(|e| LotteryError::from_send_message(pretty_rpc_error(e).to_string()))?;
        let hash = *pending.tx_hash();
        sent.insert(hash, tx);
        tracing::debug!(from = %address, %to, %hash, "transaction sent");
        Ok(hash)
    }
}
