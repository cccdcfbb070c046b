//! HTTP client for the gateway's REST API.
//!
//! Create-or-get is implemented as list-then-create: the gateway keys
//! streams and subscriptions by name, so finding an existing resource first
//! keeps repeated calls from duplicating anything.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use tessera::abi::{EventAbi, MethodAbi};
use tessera::transport::{
    ChainClient, EventStream, StreamSubscription, StreamTransport, SubscriptionSpec,
    TransactionRef,
};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Gateway REST client implementing both collaborator traits.
pub struct EvmConnect {
    http: reqwest::Client,
    base_url: Url,
}

impl EvmConnect {
    pub fn new(base_url: Url) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("Failed to build gateway HTTP client")?;
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Invalid gateway endpoint path '{path}'"))
    }
}

#[derive(Debug, Serialize)]
struct NewStream<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewSubscription<'a> {
    name: &'a str,
    stream: &'a str,
    event: &'a EventAbi,
    address: &'a str,
    methods: &'a [MethodAbi],
    from_block: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TransactionRequest<'a> {
    from: &'a str,
    to: &'a str,
    id: &'a str,
    method: &'a MethodAbi,
    params: &'a [Value],
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    to: &'a str,
    method: &'a MethodAbi,
    params: &'a [Value],
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    output: Value,
}

#[async_trait]
impl StreamTransport for EvmConnect {
    async fn create_or_get_stream(&self, name: &str) -> Result<EventStream> {
        if let Some(existing) = self
            .list_streams()
            .await?
            .into_iter()
            .find(|s| s.name == name)
        {
            return Ok(existing);
        }
        let stream: EventStream = self
            .http
            .post(self.endpoint("eventstreams")?)
            .json(&NewStream { name })
            .send()
            .await
            .context("Failed to create event stream")?
            .error_for_status()
            .context("Event stream creation rejected")?
            .json()
            .await
            .context("Malformed event stream response")?;
        tracing::info!(
            target: "evmconnect::client",
            stream = %stream.name,
            id = %stream.id,
            "Created event stream"
        );
        Ok(stream)
    }

    async fn create_or_get_subscription(
        &self,
        spec: &SubscriptionSpec,
    ) -> Result<StreamSubscription> {
        if let Some(existing) = self
            .list_subscriptions()
            .await?
            .into_iter()
            .find(|s| s.name == spec.name)
        {
            return Ok(existing);
        }
        let subscription: StreamSubscription = self
            .http
            .post(self.endpoint("subscriptions")?)
            .json(&NewSubscription {
                name: &spec.name,
                stream: &spec.stream_id,
                event: &spec.event,
                address: &spec.address,
                methods: &spec.methods,
                from_block: &spec.from_block,
            })
            .send()
            .await
            .context("Failed to create subscription")?
            .error_for_status()
            .with_context(|| format!("Subscription creation rejected for '{}'", spec.name))?
            .json()
            .await
            .context("Malformed subscription response")?;
        tracing::info!(
            target: "evmconnect::client",
            subscription = %subscription.name,
            from_block = %spec.from_block,
            "Created subscription"
        );
        Ok(subscription)
    }

    async fn list_streams(&self) -> Result<Vec<EventStream>> {
        self.http
            .get(self.endpoint("eventstreams")?)
            .send()
            .await
            .context("Failed to list event streams")?
            .error_for_status()
            .context("Event stream listing rejected")?
            .json()
            .await
            .context("Malformed event stream listing")
    }

    async fn list_subscriptions(&self) -> Result<Vec<StreamSubscription>> {
        self.http
            .get(self.endpoint("subscriptions")?)
            .send()
            .await
            .context("Failed to list subscriptions")?
            .error_for_status()
            .context("Subscription listing rejected")?
            .json()
            .await
            .context("Malformed subscription listing")
    }
}

#[async_trait]
impl ChainClient for EvmConnect {
    async fn send_transaction(
        &self,
        signer: &str,
        contract: &str,
        request_id: &str,
        method: &MethodAbi,
        params: &[Value],
    ) -> Result<TransactionRef> {
        self.http
            .post(self.endpoint("transactions")?)
            .json(&TransactionRequest {
                from: signer,
                to: contract,
                id: request_id,
                method,
                params,
            })
            .send()
            .await
            .context("Failed to submit transaction")?
            .error_for_status()
            .with_context(|| format!("Transaction rejected for method '{}'", method.name))?
            .json()
            .await
            .context("Malformed transaction response")
    }

    async fn query(
        &self,
        contract: &str,
        method: &MethodAbi,
        params: &[Value],
    ) -> Result<Value> {
        let response: QueryResponse = self
            .http
            .post(self.endpoint("query")?)
            .json(&QueryRequest {
                to: contract,
                method,
                params,
            })
            .send()
            .await
            .context("Failed to query contract")?
            .error_for_status()
            .with_context(|| format!("Query rejected for method '{}'", method.name))?
            .json()
            .await
            .context("Malformed query response")?;
        Ok(response.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tessera::abi;

    #[test]
    fn test_new_subscription_wire_shape() {
        let spec = SubscriptionSpec {
            name: "tessera/0xabc:F1:TransferSingle".to_string(),
            stream_id: "es-1".to_string(),
            event: abi::transfer_single_event(),
            address: "0xc047ac7".to_string(),
            methods: abi::subscription_method_candidates(),
            from_block: "100".to_string(),
        };
        let body = serde_json::to_value(NewSubscription {
            name: &spec.name,
            stream: &spec.stream_id,
            event: &spec.event,
            address: &spec.address,
            methods: &spec.methods,
            from_block: &spec.from_block,
        })
        .unwrap();
        assert_eq!(body["name"], "tessera/0xabc:F1:TransferSingle");
        assert_eq!(body["stream"], "es-1");
        assert_eq!(body["fromBlock"], "100");
        assert_eq!(body["event"]["name"], "TransferSingle");
        assert!(body["methods"].as_array().unwrap().len() > 1);
    }

    #[test]
    fn test_transaction_request_wire_shape() {
        let method = abi::create_method();
        let params = vec![json!(true), json!("0x")];
        let body = serde_json::to_value(TransactionRequest {
            from: "0x51617e4",
            to: "0xc047ac7",
            id: "req-1",
            method: &method,
            params: &params,
        })
        .unwrap();
        assert_eq!(body["from"], "0x51617e4");
        assert_eq!(body["to"], "0xc047ac7");
        assert_eq!(body["id"], "req-1");
        assert_eq!(body["method"]["name"], "create");
    }

    #[test]
    fn test_query_response_unwraps_output() {
        let response: QueryResponse =
            serde_json::from_value(json!({"output": "https://example.com/{id}.json"})).unwrap();
        assert_eq!(response.output, json!("https://example.com/{id}.json"));
    }
}
