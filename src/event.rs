//! Raw contract event log entries as delivered by the event-stream transport.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The all-zero Ethereum address, used by the contract to mark mints and
/// burns in transfer events.
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Returns true when `address` is the zero address (case-insensitive).
pub fn is_zero_address(address: &str) -> bool {
    address.eq_ignore_ascii_case(ZERO_ADDRESS)
}

/// One raw event log entry from the transport, tagged with the subscription
/// name that matched it.
///
/// Numeric chain positions arrive as decimal strings, matching the gateway's
/// JSON encoding of unbounded integers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayEvent {
    /// Name of the subscription that delivered this entry.
    pub subscription_name: String,
    /// Full event signature, e.g. `TransferSingle(address,address,address,uint256,uint256)`.
    pub signature: String,
    /// Emitting contract address.
    pub address: String,
    pub block_number: String,
    pub transaction_index: String,
    pub transaction_hash: String,
    pub log_index: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Decoded event body keyed by ABI parameter name.
    pub data: Value,
    /// Name of the decoded method call that produced the event, when the
    /// transport could match the transaction input against a candidate ABI.
    #[serde(default)]
    pub input_method: Option<String>,
    /// Decoded call arguments keyed by parameter name.
    #[serde(default)]
    pub input_args: Option<Value>,
    /// Address that signed the originating transaction.
    #[serde(default)]
    pub input_signer: Option<String>,
}

impl GatewayEvent {
    /// Block number as u64; malformed values read as 0, mirroring how absent
    /// positions are treated.
    pub fn block_number_u64(&self) -> u64 {
        self.block_number.parse().unwrap_or(0)
    }

    pub fn transaction_index_u64(&self) -> u64 {
        self.transaction_index.parse().unwrap_or(0)
    }

    pub fn log_index_u64(&self) -> u64 {
        self.log_index.parse().unwrap_or(0)
    }

    /// Correlation payload from the decoded call input's `data` argument:
    /// hex bytes decoded as UTF-8, empty when absent or undecodable.
    pub fn input_data_string(&self) -> String {
        let Some(args) = &self.input_args else {
            return String::new();
        };
        let Some(hex_data) = args.get("data").and_then(Value::as_str) else {
            return String::new();
        };
        decode_hex_string(hex_data)
    }
}

/// Decode `0x`-prefixed hex bytes into a UTF-8 string; undecodable input
/// yields an empty string rather than an error (correlation data is opaque
/// and best-effort).
pub fn decode_hex_string(value: &str) -> String {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    match hex::decode(stripped) {
        Ok(bytes) => String::from_utf8(bytes).unwrap_or_default(),
        Err(_) => String::new(),
    }
}
