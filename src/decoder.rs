//! Event normalizer: raw contract events to domain notifications.
//!
//! One raw log entry plus the subscription name that delivered it yields
//! zero or more notifications. Dispatch is purely by event signature;
//! signatures this connector does not recognize are logged and dropped so a
//! contract upgrade that adds event types cannot break delivery.
//!
//! Transfers are classified by the address-zero convention, checked in this
//! order: `from` zero means mint, `to` zero means burn, otherwise a regular
//! transfer. Batch events are expanded into one notification per id/value
//! pair with a sub-indexed identity.

use std::sync::Arc;

use primitive_types::U256;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::abi::{self, signatures};
use crate::event::{is_zero_address, GatewayEvent};
use crate::ids::{pack_pool_locator, unpack_pool_locator, unpack_token_id};
use crate::names::{unpack_subscription_name, ParsedSubscriptionName, BASE_SUBSCRIPTION};
use crate::notification::{
    batch_member_identity, event_identity, BlockchainEvent, PoolKind, TokenApproval,
    TokenNotification, TokenPoolCreation, TokenTransfer,
};
use crate::transport::ChainClient;

/// TokenPoolCreation event body.
#[derive(Debug, Clone, Deserialize)]
struct PoolCreationBody {
    operator: String,
    type_id: String,
    #[serde(default)]
    data: Option<String>,
}

/// TransferSingle event body.
#[derive(Debug, Clone, Deserialize)]
struct TransferSingleBody {
    operator: String,
    from: String,
    to: String,
    id: String,
    value: String,
}

/// TransferBatch event body (parallel id/value arrays).
#[derive(Debug, Clone, Deserialize)]
struct TransferBatchBody {
    operator: String,
    from: String,
    to: String,
    ids: Vec<String>,
    values: Vec<String>,
}

/// ApprovalForAll event body.
#[derive(Debug, Clone, Deserialize)]
struct ApprovalBody {
    account: String,
    operator: String,
    approved: bool,
}

/// Normalizes raw ERC1155 events into domain notifications.
///
/// Holds the chain client used to resolve non-fungible token URIs and the
/// process-lifetime URI-template cache. Racing first lookups may fetch the
/// template more than once; the query is idempotent so no exclusion is
/// needed beyond the lock.
pub struct EventNormalizer {
    chain: Arc<dyn ChainClient>,
    uri_template: RwLock<Option<String>>,
}

impl EventNormalizer {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self {
            chain,
            uri_template: RwLock::new(None),
        }
    }

    /// Normalize one delivered log entry into zero or more notifications.
    pub async fn normalize(&self, event: &GatewayEvent) -> Vec<TokenNotification> {
        let subscription = unpack_subscription_name(&event.subscription_name);
        if subscription.pool_locator.is_none() || subscription.event.is_none() {
            tracing::warn!(
                target: "tessera::decoder",
                subscription = %event.subscription_name,
                "Event delivered by a subscription outside the current naming scheme, dropping"
            );
            return Vec::new();
        }

        match event.signature.as_str() {
            signatures::TOKEN_POOL_CREATION => self
                .pool_creation(event, &subscription)
                .into_iter()
                .collect(),
            signatures::TRANSFER_SINGLE => self
                .transfer_single(event, &subscription)
                .await
                .into_iter()
                .collect(),
            signatures::TRANSFER_BATCH => self.transfer_batch(event, &subscription).await,
            signatures::APPROVAL_FOR_ALL => {
                self.approval(event, &subscription).into_iter().collect()
            }
            other => {
                tracing::debug!(
                    target: "tessera::decoder",
                    signature = other,
                    address = %event.address,
                    block_number = event.block_number_u64(),
                    "Unhandled event signature"
                );
                Vec::new()
            }
        }
    }

    fn pool_creation(
        &self,
        event: &GatewayEvent,
        subscription: &ParsedSubscriptionName,
    ) -> Option<TokenNotification> {
        let body: PoolCreationBody = match serde_json::from_value(event.data.clone()) {
            Ok(body) => body,
            Err(e) => {
                warn_malformed(event, &e);
                return None;
            }
        };
        let unpacked = match unpack_token_id(&body.type_id) {
            Ok(unpacked) => unpacked,
            Err(e) => {
                tracing::warn!(
                    target: "tessera::decoder",
                    type_id = %body.type_id,
                    error = %e,
                    "Pool creation event carries an undecodable type id"
                );
                return None;
            }
        };

        let sub_locator = subscription.pool_locator.as_deref().unwrap_or_default();
        let pool_locator = if sub_locator == BASE_SUBSCRIPTION {
            // New pool on the default contract.
            pack_pool_locator(&unpacked.pool_id, None, None)
        } else {
            // A per-pool subscription only surfaces its own creation event.
            if unpack_pool_locator(sub_locator).pool_id != unpacked.pool_id {
                return None;
            }
            sub_locator.to_string()
        };

        let id = event_identity(
            event.block_number_u64(),
            event.transaction_index_u64(),
            event.log_index_u64(),
        );
        Some(TokenNotification::PoolCreated(TokenPoolCreation {
            pool_locator,
            kind: PoolKind::from_fungible_flag(unpacked.is_fungible),
            signer: event
                .input_signer
                .clone()
                .unwrap_or_else(|| body.operator.clone()),
            data: body
                .data
                .as_deref()
                .map(crate::event::decode_hex_string)
                .unwrap_or_default(),
            event: BlockchainEvent::from_gateway_event(event, id),
        }))
    }

    async fn transfer_single(
        &self,
        event: &GatewayEvent,
        subscription: &ParsedSubscriptionName,
    ) -> Option<TokenNotification> {
        let body: TransferSingleBody = match serde_json::from_value(event.data.clone()) {
            Ok(body) => body,
            Err(e) => {
                warn_malformed(event, &e);
                return None;
            }
        };
        let id = event_identity(
            event.block_number_u64(),
            event.transaction_index_u64(),
            event.log_index_u64(),
        );
        self.classify_transfer(
            event,
            subscription,
            id,
            &body.operator,
            &body.from,
            &body.to,
            &body.id,
            &body.value,
        )
        .await
    }

    async fn transfer_batch(
        &self,
        event: &GatewayEvent,
        subscription: &ParsedSubscriptionName,
    ) -> Vec<TokenNotification> {
        let body: TransferBatchBody = match serde_json::from_value(event.data.clone()) {
            Ok(body) => body,
            Err(e) => {
                warn_malformed(event, &e);
                return Vec::new();
            }
        };
        let base = event_identity(
            event.block_number_u64(),
            event.transaction_index_u64(),
            event.log_index_u64(),
        );

        let mut notifications = Vec::with_capacity(body.ids.len());
        for (index, (token_id, value)) in body.ids.iter().zip(body.values.iter()).enumerate() {
            let member_id = batch_member_identity(&base, index);
            // Members the single-transfer rules reject are dropped from the
            // batch output, not treated as an error.
            if let Some(notification) = self
                .classify_transfer(
                    event,
                    subscription,
                    member_id,
                    &body.operator,
                    &body.from,
                    &body.to,
                    token_id,
                    value,
                )
                .await
            {
                notifications.push(notification);
            }
        }
        notifications
    }

    /// Shared single-transfer transform: pool-match guard, zero-address
    /// classification, non-fungible URI resolution.
    async fn classify_transfer(
        &self,
        event: &GatewayEvent,
        subscription: &ParsedSubscriptionName,
        identity: String,
        operator: &str,
        from: &str,
        to: &str,
        token_id: &str,
        value: &str,
    ) -> Option<TokenNotification> {
        let unpacked = match unpack_token_id(token_id) {
            Ok(unpacked) => unpacked,
            Err(e) => {
                tracing::warn!(
                    target: "tessera::decoder",
                    token_id,
                    error = %e,
                    "Transfer event carries an undecodable token id"
                );
                return None;
            }
        };

        // A pool's subscription must only surface transfers inside that
        // pool's token-id namespace.
        let sub_locator = subscription.pool_locator.as_deref().unwrap_or_default();
        if unpack_pool_locator(sub_locator).pool_id != unpacked.pool_id {
            return None;
        }

        if is_zero_address(from) && is_zero_address(to) {
            return None;
        }

        let (token_index, uri) = if unpacked.is_fungible {
            (None, None)
        } else {
            let uri = self.token_uri(&event.address, unpacked.token_index).await;
            (Some(unpacked.token_index.to_string()), Some(uri))
        };

        let transfer = TokenTransfer {
            pool_locator: sub_locator.to_string(),
            token_index,
            uri,
            amount: value.to_string(),
            signer: event
                .input_signer
                .clone()
                .unwrap_or_else(|| operator.to_string()),
            from: None,
            to: None,
            data: event.input_data_string(),
            pool_data: subscription.pool_data.clone(),
            event: BlockchainEvent::from_gateway_event(event, identity),
        };

        if is_zero_address(from) {
            Some(TokenNotification::TokenMinted(TokenTransfer {
                to: Some(to.to_string()),
                ..transfer
            }))
        } else if is_zero_address(to) {
            Some(TokenNotification::TokenBurned(TokenTransfer {
                from: Some(from.to_string()),
                ..transfer
            }))
        } else {
            Some(TokenNotification::TokenTransferred(TokenTransfer {
                from: Some(from.to_string()),
                to: Some(to.to_string()),
                ..transfer
            }))
        }
    }

    fn approval(
        &self,
        event: &GatewayEvent,
        subscription: &ParsedSubscriptionName,
    ) -> Option<TokenNotification> {
        let body: ApprovalBody = match serde_json::from_value(event.data.clone()) {
            Ok(body) => body,
            Err(e) => {
                warn_malformed(event, &e);
                return None;
            }
        };

        // Approval is pool-agnostic on chain; the pool comes from the
        // delivering subscription, and the pool id is folded into the
        // identity so the per-pool fan-out of one on-chain event cannot
        // collide.
        let sub_locator = subscription.pool_locator.as_deref().unwrap_or_default();
        let pool_id = unpack_pool_locator(sub_locator).pool_id;
        let base = event_identity(
            event.block_number_u64(),
            event.transaction_index_u64(),
            event.log_index_u64(),
        );
        let id = format!("{base}/{pool_id}");

        Some(TokenNotification::TokenApprovalChanged(TokenApproval {
            pool_locator: sub_locator.to_string(),
            signer: event
                .input_signer
                .clone()
                .unwrap_or_else(|| body.account.clone()),
            operator: body.operator,
            approved: body.approved,
            data: event.input_data_string(),
            pool_data: subscription.pool_data.clone(),
            event: BlockchainEvent::from_gateway_event(event, id),
        }))
    }

    /// Resolve a non-fungible token URI from the contract's `uri(uint256)`
    /// template, substituting the `{id}` placeholder with the 64-digit hex
    /// token index.
    ///
    /// The template is queried once and cached for the life of the process.
    /// A failed query degrades to an empty URI and is not cached, so a later
    /// event retries.
    async fn token_uri(&self, contract: &str, token_index: U256) -> String {
        let cached = self.uri_template.read().await.clone();
        let template = match cached {
            Some(template) => template,
            None => {
                let params = [Value::String(token_index.to_string())];
                match self
                    .chain
                    .query(contract, &abi::uri_method(), &params)
                    .await
                {
                    Ok(output) => {
                        let template = output.as_str().unwrap_or_default().to_string();
                        *self.uri_template.write().await = Some(template.clone());
                        template
                    }
                    Err(e) => {
                        tracing::warn!(
                            target: "tessera::decoder",
                            contract,
                            error = %e,
                            "Failed to query token URI template, returning empty URI"
                        );
                        return String::new();
                    }
                }
            }
        };
        let hex_index = format!("{token_index:x}");
        template.replace("{id}", &format!("{hex_index:0>64}"))
    }
}

fn warn_malformed(event: &GatewayEvent, error: &serde_json::Error) {
    tracing::warn!(
        target: "tessera::decoder",
        signature = %event.signature,
        address = %event.address,
        block_number = event.block_number_u64(),
        error = %error,
        "Malformed event body"
    );
}
