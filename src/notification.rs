//! Domain notifications produced by the event normalizer.
//!
//! Every notification carries a provenance envelope built from the raw log
//! entry, headed by a deterministic event identity that sorts in chain order
//! and is stable across redelivery of the same entry.

use serde::Serialize;
use serde_json::Value;

use crate::abi;
use crate::event::GatewayEvent;

/// Deterministic identity for one log entry: zero-padded block number,
/// transaction index, and log index, `/`-joined.
pub fn event_identity(block_number: u64, transaction_index: u64, log_index: u64) -> String {
    format!("{block_number:012}/{transaction_index:06}/{log_index:06}")
}

/// Identity of one member of an expanded batch: the batch's base identity
/// plus a zero-padded sub-index, so members stay unique and stable on
/// redelivery.
pub fn batch_member_identity(base: &str, member_index: usize) -> String {
    format!("{base}/{member_index:06}")
}

/// Fungibility of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolKind {
    Fungible,
    NonFungible,
}

impl PoolKind {
    pub fn from_fungible_flag(is_fungible: bool) -> Self {
        if is_fungible {
            Self::Fungible
        } else {
            Self::NonFungible
        }
    }
}

/// Chain position sub-envelope for downstream reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockchainInfo {
    pub block_number: String,
    pub transaction_index: String,
    pub transaction_hash: String,
    pub log_index: String,
    pub address: String,
    pub signature: String,
}

/// Provenance envelope shared by all notification kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockchainEvent {
    /// Deterministic event identity (see [`event_identity`]).
    pub id: String,
    /// Event name with the parameter list stripped.
    pub name: String,
    /// Location string derived from the emitting contract address.
    pub location: String,
    /// Full event signature.
    pub signature: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Decoded event body as delivered.
    pub output: Value,
    pub info: BlockchainInfo,
}

impl BlockchainEvent {
    /// Build the envelope for a raw log entry with the given identity.
    ///
    /// Entries delivered without an emission timestamp are stamped with the
    /// arrival time instead.
    pub fn from_gateway_event(event: &GatewayEvent, id: String) -> Self {
        Self {
            id,
            name: abi::event_name(&event.signature).to_string(),
            location: format!("address={}", event.address),
            signature: event.signature.clone(),
            timestamp: event
                .timestamp
                .clone()
                .or_else(|| Some(chrono::Utc::now().timestamp().to_string())),
            output: event.data.clone(),
            info: BlockchainInfo {
                block_number: event.block_number.clone(),
                transaction_index: event.transaction_index.clone(),
                transaction_hash: event.transaction_hash.clone(),
                log_index: event.log_index.clone(),
                address: event.address.clone(),
                signature: event.signature.clone(),
            },
        }
    }
}

/// A new pool observed on chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPoolCreation {
    pub pool_locator: String,
    pub kind: PoolKind,
    pub signer: String,
    /// Opaque correlation payload echoed from the creation request.
    pub data: String,
    pub event: BlockchainEvent,
}

/// A single mint, burn, or transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTransfer {
    pub pool_locator: String,
    /// Serial index within a non-fungible pool; absent for fungible pools.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_index: Option<String>,
    /// Resolved token URI for non-fungible transfers; empty when the
    /// contract query failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    pub amount: String,
    pub signer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_data: Option<String>,
    pub event: BlockchainEvent,
}

/// An operator approval granted or revoked, surfaced once per subscribed
/// pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenApproval {
    pub pool_locator: String,
    pub signer: String,
    pub operator: String,
    pub approved: bool,
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_data: Option<String>,
    pub event: BlockchainEvent,
}

/// A normalized domain notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TokenNotification {
    PoolCreated(TokenPoolCreation),
    TokenMinted(TokenTransfer),
    TokenBurned(TokenTransfer),
    TokenTransferred(TokenTransfer),
    TokenApprovalChanged(TokenApproval),
}

impl TokenNotification {
    /// Event identity of the underlying provenance envelope.
    pub fn event_id(&self) -> &str {
        match self {
            Self::PoolCreated(n) => &n.event.id,
            Self::TokenMinted(n) | Self::TokenBurned(n) | Self::TokenTransferred(n) => {
                &n.event.id
            }
            Self::TokenApprovalChanged(n) => &n.event.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_identity_padding() {
        assert_eq!(event_identity(0, 0, 0), "000000000000/000000/000000");
        assert_eq!(event_identity(123, 4, 56), "000000000123/000004/000056");
    }

    #[test]
    fn test_event_identities_sort_in_chain_order() {
        let ids = vec![
            event_identity(9, 999_999, 0),
            event_identity(10, 0, 0),
            event_identity(10, 0, 1),
            event_identity(10, 1, 0),
        ];
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_batch_member_identity() {
        let base = event_identity(5, 1, 2);
        assert_eq!(
            batch_member_identity(&base, 3),
            "000000000005/000001/000002/000003"
        );
    }

    #[test]
    fn test_envelope_from_gateway_event() {
        let event: GatewayEvent = serde_json::from_value(serde_json::json!({
            "subscriptionName": "s:F1:TransferSingle",
            "signature": "TransferSingle(address,address,address,uint256,uint256)",
            "address": "0xc0ffee",
            "blockNumber": "42",
            "transactionIndex": "1",
            "transactionHash": "0xbeef",
            "logIndex": "3",
            "timestamp": "1700000000",
            "data": {"id": "1"}
        }))
        .unwrap();
        let envelope = BlockchainEvent::from_gateway_event(&event, event_identity(42, 1, 3));
        assert_eq!(envelope.name, "TransferSingle");
        assert_eq!(envelope.location, "address=0xc0ffee");
        assert_eq!(envelope.info.block_number, "42");
        assert_eq!(envelope.id, "000000000042/000001/000003");
    }
}
