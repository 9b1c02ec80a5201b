//! Client configuration, resolved once at startup.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `XYRA_RPC_URL` | `http://127.0.0.1:8545` | JSON-RPC endpoint |
//! | `XYRA_LOTTERY_MANAGER_ADDRESS` | required | LotteryManager contract |
//! | `XYRA_TOKEN_VAULT_ADDRESS` | required | TokenVault contract |
//! | `XYRA_USDC_TOKEN_ADDRESS` | required | ticket stablecoin |
//! | `XYRA_USER_REGISTRY_ADDRESS` | required | UserRegistry contract |
//! | `XYRA_PRIVATE_KEY` | unset | enables the local wallet |
//! | `XYRA_POLL_INTERVAL_MS` | unset | provider polling interval |
//! | `XYRA_RECEIPT_TIMEOUT_SECS` | `60` | receipt wait bound |
//! | `XYRA_STALE_TIME_MS` | `4000` | read cache freshness |
//! | `XYRA_TICKET_PRICE` | `100` | ticket price in token base units |
//! | `XYRA_ALLOWANCE_MAX_ATTEMPTS` | `8` | allowance poll attempt cap |
//! | `XYRA_ALLOWANCE_BASE_DELAY_MS` | `250` | first poll backoff |
//! | `XYRA_ALLOWANCE_MAX_DELAY_MS` | `4000` | backoff cap |
//! | `XYRA_ALLOWANCE_TIMEOUT_SECS` | `30` | overall poll deadline |

use std::{env, str::FromStr, time::Duration};

use alloy::primitives::{Address, U256};

use crate::LotteryError;

/// Addresses of the four contracts the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractAddresses {
    pub lottery_manager: Address,
    pub token_vault: Address,
    pub usdc: Address,
    pub user_registry: Address,
}

/// Bounded retry policy for waiting on allowance to reflect a confirmed approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Maximum number of allowance reads (default: 8)
    pub max_attempts: u32,
    /// Delay before the second read, doubled afterwards (default: 250ms)
    pub base_delay: Duration,
    /// Upper bound for a single delay (default: 4s)
    pub max_delay: Duration,
    /// Overall deadline across all attempts (default: 30s)
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(4),
            timeout: Duration::from_secs(30),
        }
    }
}

impl PollPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Full client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub rpc_url: String,
    pub contracts: ContractAddresses,
    /// Hex private key for the local wallet; `None` gives a read-only client
    pub private_key: Option<String>,
    pub poll_interval: Option<Duration>,
    pub receipt_timeout: Duration,
    /// How long a cached read may answer `fetch()` before hitting the chain again
    pub stale_time: Duration,
    /// Ticket price in token base units. Not read from the contract.
    pub ticket_price: U256,
    pub allowance_poll: PollPolicy,
}

impl ClientConfig {
    pub fn new(rpc_url: impl Into<String>, contracts: ContractAddresses) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            contracts,
            private_key: None,
            poll_interval: None,
            receipt_timeout: Duration::from_secs(60),
            stale_time: Duration::from_millis(4_000),
            ticket_price: U256::from(100u64),
            allowance_poll: PollPolicy::default(),
        }
    }

    /// Build the configuration from `XYRA_*` environment variables.
    pub fn from_env() -> Result<Self, LotteryError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LotteryError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let contracts = ContractAddresses {
            lottery_manager: required_address(&lookup, "XYRA_LOTTERY_MANAGER_ADDRESS")?,
            token_vault: required_address(&lookup, "XYRA_TOKEN_VAULT_ADDRESS")?,
            usdc: required_address(&lookup, "XYRA_USDC_TOKEN_ADDRESS")?,
            user_registry: required_address(&lookup, "XYRA_USER_REGISTRY_ADDRESS")?,
        };

        let rpc_url =
            lookup("XYRA_RPC_URL").unwrap_or_else(|| "http://127.0.0.1:8545".to_string());
        let mut config = Self::new(rpc_url, contracts);

        config.private_key = lookup("XYRA_PRIVATE_KEY").filter(|k| !k.trim().is_empty());
        config.poll_interval =
            parse_opt::<u64, _>(&lookup, "XYRA_POLL_INTERVAL_MS")?.map(Duration::from_millis);
        if let Some(secs) = parse_opt::<u64, _>(&lookup, "XYRA_RECEIPT_TIMEOUT_SECS")? {
            config.receipt_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_opt::<u64, _>(&lookup, "XYRA_STALE_TIME_MS")? {
            config.stale_time = Duration::from_millis(ms);
        }
        if let Some(price) = parse_opt::<U256, _>(&lookup, "XYRA_TICKET_PRICE")? {
            config.ticket_price = price;
        }

        let mut poll = PollPolicy::default();
        if let Some(n) = parse_opt::<u32, _>(&lookup, "XYRA_ALLOWANCE_MAX_ATTEMPTS")? {
            if n == 0 {
                return Err(LotteryError::Config(
                    "XYRA_ALLOWANCE_MAX_ATTEMPTS must be at least 1".to_string(),
                ));
            }
            poll.max_attempts = n;
        }
        if let Some(ms) = parse_opt::<u64, _>(&lookup, "XYRA_ALLOWANCE_BASE_DELAY_MS")? {
            poll.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_opt::<u64, _>(&lookup, "XYRA_ALLOWANCE_MAX_DELAY_MS")? {
            poll.max_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_opt::<u64, _>(&lookup, "XYRA_ALLOWANCE_TIMEOUT_SECS")? {
            poll.timeout = Duration::from_secs(secs);
        }
        config.allowance_poll = poll;

        tracing::debug!(
            rpc_url = %config.rpc_url,
            lottery_manager = %config.contracts.lottery_manager,
            token_vault = %config.contracts.token_vault,
            usdc = %config.contracts.usdc,
            user_registry = %config.contracts.user_registry,
            has_signer = config.private_key.is_some(),
            "loaded client configuration"
        );

        Ok(config)
    }

    pub fn with_private_key(mut self, key: impl Into<String>) -> Self {
        self.private_key = Some(key.into());
        self
    }

    pub fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn with_ticket_price(mut self, price: U256) -> Self {
        self.ticket_price = price;
        self
    }

    pub fn with_allowance_poll(mut self, poll: PollPolicy) -> Self {
        self.allowance_poll = poll;
        self
    }
}

fn required_address<F>(lookup: &F, key: &str) -> Result<Address, LotteryError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).ok_or_else(|| LotteryError::Config(format!("{key} is not set")))?;
    raw.trim()
        .parse::<Address>()
        .map_err(|e| LotteryError::Config(format!("{key}={raw} is not an address: {e}")))
}

fn parse_opt<T, F>(lookup: &F, key: &str) -> Result<Option<T>, LotteryError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| LotteryError::Config(format!("{key}={raw}: {e}"))),
    }
}
