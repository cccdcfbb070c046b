//! Collaborator seams: the event-stream transport and the chain-invocation
//! client.
//!
//! Both are consumed as trait objects so request handlers can share one
//! instance constructed at startup, and so tests can substitute recording
//! mocks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::abi::{EventAbi, MethodAbi};

/// A durable named event stream owned by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStream {
    pub id: String,
    pub name: String,
}

/// One subscription under a stream, as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSubscription {
    pub id: String,
    pub name: String,
    /// Id of the owning stream.
    pub stream: String,
}

/// Everything the transport needs to create (or fetch) one subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionSpec {
    pub name: String,
    pub stream_id: String,
    pub event: EventAbi,
    /// Contract address the subscription listens on.
    pub address: String,
    /// Candidate method ABIs for decoding the call input behind each event.
    pub methods: Vec<MethodAbi>,
    /// Starting block, as a decimal string.
    pub from_block: String,
}

/// Durable-subscription side of the gateway. Create-or-fetch semantics: a
/// second call with the same name returns the existing resource, which is
/// what makes retried pool activations safe.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    async fn create_or_get_stream(&self, name: &str) -> anyhow::Result<EventStream>;

    async fn create_or_get_subscription(
        &self,
        spec: &SubscriptionSpec,
    ) -> anyhow::Result<StreamSubscription>;

    async fn list_streams(&self) -> anyhow::Result<Vec<EventStream>>;

    async fn list_subscriptions(&self) -> anyhow::Result<Vec<StreamSubscription>>;
}

/// Reference to a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRef {
    pub id: String,
}

/// Chain-invocation side of the gateway: signed method calls and read-only
/// queries against a contract address.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn send_transaction(
        &self,
        signer: &str,
        contract: &str,
        request_id: &str,
        method: &MethodAbi,
        params: &[Value],
    ) -> anyhow::Result<TransactionRef>;

    async fn query(
        &self,
        contract: &str,
        method: &MethodAbi,
        params: &[Value],
    ) -> anyhow::Result<Value>;
}
