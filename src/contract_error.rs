//! Contract error registry for turning Solidity revert data into readable text.
//!
//! Each contract interface registers a decoder for its custom errors with
//! `register_contract_errors!`. The `inventory` crate collects the decoders at link time,
//! so the notification layer can print `LotteryManager::RoundNotActive(..)` instead of
//! raw hex without keeping a central list of contracts.
//!
//! ```text
//! register_contract_errors!(LotteryManager)
//!     │
//!     ▼
//! inventory::submit!(ContractErrorParser { ... })
//!     │
//!     ▼ (at runtime)
//! revert_reason(&data) → "LotteryManager::RoundNotActive(RoundNotActive)"
//! ```

use std::borrow::Cow;

use alloy::{
    primitives::Bytes,
    rpc::json_rpc::ErrorPayload,
    sol_types::decode_revert_reason,
    transports::{RpcError, TransportError},
};

/// Revert decoder entry for one contract interface.
pub struct ContractErrorParser {
    /// Name of the contract (for error messages)
    pub name: &'static str,
    /// Attempts to decode revert data into a readable message
    pub parse: fn(&Bytes) -> Option<String>,
}

inventory::collect!(ContractErrorParser);

/// Try every registered decoder and return the first match.
pub fn parse_contract_error(data: &Bytes) -> Option<String> {
    for parser in inventory::iter::<ContractErrorParser> {
        if let Some(msg) = (parser.parse)(data) {
            return Some(msg);
        }
    }
    None
}

/// Readable reason for revert data.
///
/// Custom errors of the registered contracts win; `Error(string)` and `Panic(uint256)`
/// fall back to alloy's generic decoder. Empty data means a bare `revert()`.
pub fn revert_reason(data: &Bytes) -> String {
    if data.is_empty() {
        return "execution reverted".to_string();
    }
    parse_contract_error(data)
        .or_else(|| decode_revert_reason(data))
        .unwrap_or_else(|| format!("execution reverted: {data}"))
}

/// Append the decoded revert cause to an RPC error response message.
pub fn pretty_rpc_error(err: TransportError) -> TransportError {
    match err {
        RpcError::ErrorResp(mut payload) => {
            let cause = payload_revert_data(&payload).and_then(|data| parse_contract_error(&data));
            if let Some(cause) = cause {
                payload.message =
                    payload.message.clone() + Cow::Owned(format!(", causedBy: {}", cause));
            }
            RpcError::ErrorResp(payload)
        }
        err => err,
    }
}

/// Extract revert bytes from an RPC error response, if the node attached any.
pub fn revert_data(err: &TransportError) -> Option<Bytes> {
    match err {
        RpcError::ErrorResp(payload) => payload_revert_data(payload),
        _ => None,
    }
}

fn payload_revert_data(payload: &ErrorPayload) -> Option<Bytes> {
    payload
        .data
        .as_ref()
        .and_then(|data| serde_json::from_str::<Bytes>(data.get()).ok())
}

/// Register revert decoders for interfaces declared with `alloy::sol!`.
///
/// The interface must declare at least one custom error so that `sol!` generates
/// the `<Name>Errors` enum.
///
/// ```ignore
/// alloy::sol! {
///     interface LotteryManager {
///         error RoundNotActive();
///     }
/// }
///
/// register_contract_errors!(LotteryManager);
/// ```
#[macro_export]
macro_rules! register_contract_errors {
    ($($contract:ident),* $(,)?) => {
        $(
            $crate::__private::paste::paste! {
                $crate::__private::inventory::submit! {
                    $crate::ContractErrorParser {
                        name: stringify!($contract),
                        parse: |data| {
                            use $crate::alloy::sol_types::SolInterface;
                            $contract::[<$contract Errors>]::abi_decode(data)
                                .ok()
                                .map(|e| format!("{}::{:?}", stringify!($contract), e))
                        },
                    }
                }
            }
        )*
    };
}
