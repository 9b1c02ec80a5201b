//! Typed read bindings over contract view functions.
//!
//! A `ReadBinding<C>` wraps one `sol!` call type. It encodes the call, answers from the
//! shared `QueryCache` while the cached bytes are fresh, and otherwise performs an
//! `eth_call` through the context's `ChainClient`.
//!
//! `fetch()` may be answered from cache; `refetch()` always hits the chain and
//! refreshes the cache entry. Disabled bindings never issue a call.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, RwLock,
};

use alloy::{
    primitives::{Address, Bytes},
    sol_types::SolCall,
};

use crate::{LotteryContext, LotteryError, LotteryResult};

/// Snapshot of a read binding.
#[derive(Debug, Clone)]
pub struct ReadState<T> {
    /// Last successfully decoded value. Kept across later errors.
    pub data: Option<T>,
    pub is_loading: bool,
    pub is_error: bool,
    pub error: Option<LotteryError>,
}

impl<T> Default for ReadState<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            is_error: false,
            error: None,
        }
    }
}

/// Binding to a single view function on a single contract.
pub struct ReadBinding<C: SolCall> {
    ctx: Arc<LotteryContext>,
    to: Address,
    call: RwLock<C>,
    enabled: AtomicBool,
    state: RwLock<ReadState<C::Return>>,
}

impl<C> ReadBinding<C>
where
    C: SolCall + Clone + Send + Sync,
    C::Return: Clone + Send + Sync,
{
    pub fn new(ctx: Arc<LotteryContext>, to: Address, call: C) -> Self {
        Self {
            ctx,
            to,
            call: RwLock::new(call),
            enabled: AtomicBool::new(true),
            state: RwLock::new(ReadState::default()),
        }
    }

    /// Builder form of `set_enabled`.
    pub fn enabled(self, enabled: bool) -> Self {
        self.set_enabled(enabled);
        self
    }

    /// Disabling also forgets the last value and error.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
        if !enabled {
            self.clear();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Replace the call arguments and drop data read with the old ones.
    pub fn set_args(&self, call: C) {
        if let Ok(mut current) = self.call.write() {
            *current = call;
        }
        self.clear();
    }

    /// Current call arguments.
    pub fn args(&self) -> C {
        match self.call.read() {
            Ok(call) => call.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Forget the last value and error.
    pub fn clear(&self) {
        self.update(|s| *s = ReadState::default());
    }

    pub fn contract(&self) -> Address {
        self.to
    }

    pub fn state(&self) -> ReadState<C::Return> {
        self.state.read().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn data(&self) -> Option<C::Return> {
        self.state.read().ok().and_then(|s| s.data.clone())
    }

    /// Read the value, answering from cache while it is fresh.
    ///
    /// Returns `Ok(None)` when the binding is disabled.
    pub async fn fetch(&self) -> LotteryResult<Option<C::Return>> {
        self.read(false).await
    }

    /// Read the value from the chain, bypassing the cache.
    pub async fn refetch(&self) -> LotteryResult<Option<C::Return>> {
        self.read(true).await
    }

    async fn read(&self, force: bool) -> LotteryResult<Option<C::Return>> {
        if !self.is_enabled() {
            tracing::trace!(function = C::SIGNATURE, to = %self.to, "read disabled");
            return Ok(None);
        }

        let input: Bytes = match self.call.read() {
            Ok(call) => call.abi_encode().into(),
            Err(_) => {
                return Err(LotteryError::Read {
                    function: C::SIGNATURE,
                    message: "call arguments lock poisoned".to_string(),
                })
            }
        };

        let stale_time = self.ctx.config().stale_time;
        if !force {
            if let Some(bytes) = self.ctx.cache().get_fresh(self.to, &input, stale_time) {
                if let Ok(value) = C::abi_decode_returns(&bytes) {
                    self.store(Ok(value.clone()));
                    return Ok(Some(value));
                }
            }
        }

        self.update(|s| s.is_loading = true);
        let result = match self.ctx.client().call(self.to, input.clone()).await {
            Ok(bytes) => match C::abi_decode_returns(&bytes) {
                Ok(value) => {
                    self.ctx.cache().insert(self.to, input, bytes);
                    Ok(value)
                }
                Err(e) => Err(LotteryError::Read {
                    function: C::SIGNATURE,
                    message: format!("failed to decode return data: {e}"),
                }),
            },
            Err(LotteryError::Read { message, .. }) => Err(LotteryError::Read {
                function: C::SIGNATURE,
                message,
            }),
            Err(e) => Err(LotteryError::Read {
                function: C::SIGNATURE,
                message: e.to_string(),
            }),
        };

        if let Err(e) = &result {
            tracing::warn!(function = C::SIGNATURE, to = %self.to, error = %e, "read failed");
        }
        self.store(result.clone());
        result.map(Some)
    }

    fn store(&self, result: LotteryResult<C::Return>) {
        self.update(|s| {
            s.is_loading = false;
            match result {
                Ok(value) => {
                    s.data = Some(value);
                    s.is_error = false;
                    s.error = None;
                }
                Err(e) => {
                    s.is_error = true;
                    s.error = Some(e);
                }
            }
        });
    }

    fn update(&self, f: impl FnOnce(&mut ReadState<C::Return>)) {
        if let Ok(mut state) = self.state.write() {
            f(&mut state);
        }
    }
}

impl<C: SolCall> std::fmt::Debug for ReadBinding<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadBinding")
            .field("function", &C::SIGNATURE)
            .field("to", &self.to)
            .field("enabled", &self.enabled.load(Ordering::Relaxed))
            .finish()
    }
}
