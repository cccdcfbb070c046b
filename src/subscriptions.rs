//! Subscription lifecycle: stream bootstrap, per-pool activation, and the
//! startup migration check.
//!
//! The manager never deletes or rewrites existing subscriptions. Everything
//! goes through the transport's create-or-fetch contract, which is what
//! makes `init` and retried activations idempotent. The migration check is
//! read-only: it reports naming or coverage drift for a human operator,
//! it does not remediate.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::try_join_all;
use tokio::sync::RwLock;

use crate::abi::{self, EventAbi};
use crate::ids::unpack_pool_locator;
use crate::names::{
    default_legacy_stream_names, pack_subscription_name, stream_name, unpack_subscription_name,
    BASE_SUBSCRIPTION,
};
use crate::transport::{EventStream, StreamTransport, SubscriptionSpec};

/// Default starting block for new subscriptions.
const GENESIS_BLOCK: &str = "0";

/// Manages the connector's event stream and its subscriptions for one
/// (topic, instance) pair.
pub struct SubscriptionManager {
    transport: Arc<dyn StreamTransport>,
    topic: String,
    instance_path: String,
    /// Default contract address for pools without an external address.
    contract_address: String,
    /// Ordered legacy stream-name candidates for the migration check.
    legacy_stream_names: Vec<String>,
    /// Starting block override for the base pool-creation subscription.
    base_from_block: Option<String>,
    /// Cached stream handle, populated lazily. Racing first accesses may
    /// each hit the transport; create-or-fetch makes that harmless.
    stream: RwLock<Option<EventStream>>,
}

impl SubscriptionManager {
    pub fn new(
        transport: Arc<dyn StreamTransport>,
        topic: impl Into<String>,
        instance_path: impl Into<String>,
        contract_address: impl Into<String>,
    ) -> Self {
        let topic = topic.into();
        let instance_path = instance_path.into();
        let legacy_stream_names = default_legacy_stream_names(&topic, &instance_path);
        Self {
            transport,
            topic,
            instance_path,
            contract_address: contract_address.into(),
            legacy_stream_names,
            base_from_block: None,
            stream: RwLock::new(None),
        }
    }

    /// Replace the legacy stream-name candidates probed by
    /// [`Self::check_migration`].
    pub fn with_legacy_stream_names(mut self, names: Vec<String>) -> Self {
        self.legacy_stream_names = names;
        self
    }

    /// Override the starting block of the base pool-creation subscription.
    pub fn with_base_from_block(mut self, from_block: impl Into<String>) -> Self {
        self.base_from_block = Some(from_block.into());
        self
    }

    fn current_stream_name(&self) -> String {
        stream_name(&self.topic, &self.instance_path)
    }

    /// Ensure the stream and the base pool-creation subscription exist.
    ///
    /// Safe to call repeatedly; the transport's create-or-fetch contract
    /// guarantees no duplicates.
    pub async fn init(&self) -> anyhow::Result<()> {
        let stream = self.ensure_stream().await?;
        let from_block = self
            .base_from_block
            .clone()
            .unwrap_or_else(|| GENESIS_BLOCK.to_string());
        let spec = self.subscription_spec(
            &stream,
            BASE_SUBSCRIPTION,
            None,
            abi::token_pool_creation_event(),
            &self.contract_address,
            &from_block,
        );
        self.transport.create_or_get_subscription(&spec).await?;
        tracing::info!(
            target: "tessera::subscriptions",
            stream = %stream.name,
            "Event stream initialized"
        );
        Ok(())
    }

    /// Ensure the four per-pool subscriptions exist: pool creation,
    /// single transfer, batch transfer, and approval.
    ///
    /// All four creations are issued concurrently; one failure fails the
    /// whole activation and no partial state is rolled back, since a retry
    /// re-fetches whatever did get created.
    ///
    /// The approval subscription always starts from block 0: approvals
    /// predating pool activation must still be visible to the new pool.
    pub async fn activate_pool(
        &self,
        pool_locator: &str,
        pool_data: Option<&str>,
        start_block: Option<&str>,
    ) -> anyhow::Result<()> {
        let stream = self.ensure_stream().await?;
        let parsed = unpack_pool_locator(pool_locator);
        let address = parsed
            .address
            .unwrap_or_else(|| self.contract_address.clone());
        let from_block = parsed
            .block_number
            .or_else(|| start_block.map(Into::into))
            .unwrap_or_else(|| GENESIS_BLOCK.to_string());

        let subscriptions = [
            (abi::token_pool_creation_event(), from_block.clone()),
            (abi::transfer_single_event(), from_block.clone()),
            (abi::transfer_batch_event(), from_block),
            (abi::approval_for_all_event(), GENESIS_BLOCK.to_string()),
        ];
        let creations = subscriptions.into_iter().map(|(event, from_block)| {
            let spec = self.subscription_spec(
                &stream,
                pool_locator,
                pool_data,
                event,
                &address,
                &from_block,
            );
            let transport = self.transport.clone();
            async move { transport.create_or_get_subscription(&spec).await }
        });
        try_join_all(creations).await?;

        tracing::info!(
            target: "tessera::subscriptions",
            pool_locator,
            address = %address,
            "Pool subscriptions active"
        );
        Ok(())
    }

    /// Audit the existing event-stream state against the current naming and
    /// coverage scheme. Returns true when drift is detected.
    ///
    /// Read-only apart from caching the discovered stream handle. A stream
    /// found only under a legacy name is a warning, not drift by itself; the
    /// connector keeps operating against it.
    pub async fn check_migration(&self) -> anyhow::Result<bool> {
        let streams = self.transport.list_streams().await?;
        let current_name = self.current_stream_name();

        let stream = match streams.iter().find(|s| s.name == current_name) {
            Some(stream) => stream.clone(),
            None => {
                let Some(legacy) = self
                    .legacy_stream_names
                    .iter()
                    .find_map(|name| streams.iter().find(|s| s.name == *name))
                else {
                    // No stream under any known name: nothing to check yet.
                    return Ok(false);
                };
                tracing::warn!(
                    target: "tessera::subscriptions",
                    stream = %legacy.name,
                    expected = %current_name,
                    "Event stream uses a legacy name; recreating it under the current scheme is recommended"
                );
                legacy.clone()
            }
        };
        *self.stream.write().await = Some(stream.clone());

        let mut pools: HashMap<String, Vec<String>> = HashMap::new();
        for subscription in self
            .transport
            .list_subscriptions()
            .await?
            .into_iter()
            .filter(|s| s.stream == stream.id)
        {
            let parsed = unpack_subscription_name(&subscription.name);
            match (parsed.pool_locator, parsed.event) {
                (Some(locator), Some(_)) if locator == BASE_SUBSCRIPTION => {}
                (Some(locator), Some(event)) => pools.entry(locator).or_default().push(event),
                _ => {
                    tracing::warn!(
                        target: "tessera::subscriptions",
                        subscription = %subscription.name,
                        "Subscription name does not match the current naming scheme"
                    );
                    return Ok(true);
                }
            }
        }

        let expected: Vec<String> = [
            abi::token_pool_creation_event(),
            abi::transfer_single_event(),
            abi::transfer_batch_event(),
            abi::approval_for_all_event(),
        ]
        .iter()
        .map(|event| event.name.clone())
        .collect();

        let mut drift = false;
        for (locator, events) in &pools {
            let mut counts: HashMap<&str, usize> = HashMap::new();
            for event in events {
                *counts.entry(event.as_str()).or_default() += 1;
            }
            let covered = events.len() == expected.len()
                && expected.iter().all(|name| counts.get(name.as_str()) == Some(&1));
            if !covered {
                tracing::warn!(
                    target: "tessera::subscriptions",
                    pool_locator = %locator,
                    subscribed = ?events,
                    expected = ?expected,
                    "Pool subscription coverage differs from the current scheme"
                );
                drift = true;
            }
        }
        Ok(drift)
    }

    async fn ensure_stream(&self) -> anyhow::Result<EventStream> {
        if let Some(stream) = self.stream.read().await.clone() {
            return Ok(stream);
        }
        let stream = self
            .transport
            .create_or_get_stream(&self.current_stream_name())
            .await?;
        *self.stream.write().await = Some(stream.clone());
        Ok(stream)
    }

    fn subscription_spec(
        &self,
        stream: &EventStream,
        pool_locator: &str,
        pool_data: Option<&str>,
        event: EventAbi,
        address: &str,
        from_block: &str,
    ) -> SubscriptionSpec {
        SubscriptionSpec {
            name: pack_subscription_name(&stream.name, pool_locator, &event.name, pool_data),
            stream_id: stream.id.clone(),
            event,
            address: address.to_string(),
            methods: abi::subscription_method_candidates(),
            from_block: from_block.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::StreamSubscription;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockTransport {
        streams: Mutex<Vec<EventStream>>,
        subscriptions: Mutex<Vec<StreamSubscription>>,
        created_specs: Mutex<Vec<SubscriptionSpec>>,
        /// Subscription names containing this substring fail to create.
        fail_subscriptions_containing: Option<String>,
    }

    impl MockTransport {
        fn seeded(streams: Vec<EventStream>, subscriptions: Vec<StreamSubscription>) -> Self {
            Self {
                streams: Mutex::new(streams),
                subscriptions: Mutex::new(subscriptions),
                ..Default::default()
            }
        }

        fn subscription_names(&self) -> Vec<String> {
            self.subscriptions
                .lock()
                .unwrap()
                .iter()
                .map(|s| s.name.clone())
                .collect()
        }
    }

    #[async_trait]
    impl StreamTransport for MockTransport {
        async fn create_or_get_stream(&self, name: &str) -> anyhow::Result<EventStream> {
            let mut streams = self.streams.lock().unwrap();
            if let Some(existing) = streams.iter().find(|s| s.name == name) {
                return Ok(existing.clone());
            }
            let stream = EventStream {
                id: format!("es-{}", streams.len() + 1),
                name: name.to_string(),
            };
            streams.push(stream.clone());
            Ok(stream)
        }

        async fn create_or_get_subscription(
            &self,
            spec: &SubscriptionSpec,
        ) -> anyhow::Result<StreamSubscription> {
            if let Some(needle) = &self.fail_subscriptions_containing {
                if spec.name.contains(needle.as_str()) {
                    anyhow::bail!("injected failure for {}", spec.name);
                }
            }
            self.created_specs.lock().unwrap().push(spec.clone());
            let mut subscriptions = self.subscriptions.lock().unwrap();
            if let Some(existing) = subscriptions.iter().find(|s| s.name == spec.name) {
                return Ok(existing.clone());
            }
            let subscription = StreamSubscription {
                id: format!("sub-{}", subscriptions.len() + 1),
                name: spec.name.clone(),
                stream: spec.stream_id.clone(),
            };
            subscriptions.push(subscription.clone());
            Ok(subscription)
        }

        async fn list_streams(&self) -> anyhow::Result<Vec<EventStream>> {
            Ok(self.streams.lock().unwrap().clone())
        }

        async fn list_subscriptions(&self) -> anyhow::Result<Vec<StreamSubscription>> {
            Ok(self.subscriptions.lock().unwrap().clone())
        }
    }

    fn manager(transport: Arc<MockTransport>) -> SubscriptionManager {
        SubscriptionManager::new(transport, "tessera", "0xabc", "0xc047ac7")
    }

    fn seeded_subscription(stream: &str, name: &str) -> StreamSubscription {
        StreamSubscription {
            id: format!("sub-{name}"),
            name: name.to_string(),
            stream: stream.to_string(),
        }
    }

    #[tokio::test]
    async fn test_init_creates_stream_and_base_subscription() {
        let transport = Arc::new(MockTransport::default());
        let manager = manager(transport.clone());
        manager.init().await.unwrap();

        let streams = transport.list_streams().await.unwrap();
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].name, "tessera/0xabc");
        assert_eq!(
            transport.subscription_names(),
            vec!["tessera/0xabc:base:TokenPoolCreation".to_string()]
        );
        let specs = transport.created_specs.lock().unwrap();
        assert_eq!(specs[0].from_block, "0");
        assert_eq!(specs[0].address, "0xc047ac7");
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let transport = Arc::new(MockTransport::default());
        let manager = manager(transport.clone());
        manager.init().await.unwrap();
        manager.init().await.unwrap();
        assert_eq!(transport.list_streams().await.unwrap().len(), 1);
        assert_eq!(transport.subscription_names().len(), 1);
    }

    #[tokio::test]
    async fn test_init_honors_base_from_block_override() {
        let transport = Arc::new(MockTransport::default());
        let manager = manager(transport.clone()).with_base_from_block("12000");
        manager.init().await.unwrap();
        let specs = transport.created_specs.lock().unwrap();
        assert_eq!(specs[0].from_block, "12000");
    }

    #[tokio::test]
    async fn test_activate_pool_creates_four_subscriptions() {
        let transport = Arc::new(MockTransport::default());
        let manager = manager(transport.clone());
        manager
            .activate_pool("F1", Some("app-data"), Some("750"))
            .await
            .unwrap();

        let mut names = transport.subscription_names();
        names.sort();
        assert_eq!(
            names,
            vec![
                "tessera/0xabc:F1:ApprovalForAll:app-data".to_string(),
                "tessera/0xabc:F1:TokenPoolCreation:app-data".to_string(),
                "tessera/0xabc:F1:TransferBatch:app-data".to_string(),
                "tessera/0xabc:F1:TransferSingle:app-data".to_string(),
            ]
        );

        let specs = transport.created_specs.lock().unwrap();
        for spec in specs.iter() {
            if spec.event.name == "ApprovalForAll" {
                // Approvals predating activation must stay visible.
                assert_eq!(spec.from_block, "0");
            } else {
                assert_eq!(spec.from_block, "750");
            }
            assert_eq!(spec.address, "0xc047ac7");
            assert!(!spec.methods.is_empty());
        }
    }

    #[tokio::test]
    async fn test_activate_pool_uses_external_address_and_block() {
        let transport = Arc::new(MockTransport::default());
        let manager = manager(transport.clone());
        manager
            .activate_pool("N2&0xdef&500", None, None)
            .await
            .unwrap();

        let specs = transport.created_specs.lock().unwrap();
        for spec in specs.iter() {
            assert_eq!(spec.address, "0xdef");
            if spec.event.name == "ApprovalForAll" {
                assert_eq!(spec.from_block, "0");
            } else {
                assert_eq!(spec.from_block, "500");
            }
        }
    }

    #[tokio::test]
    async fn test_activate_pool_fails_whole_when_one_creation_fails() {
        let transport = Arc::new(MockTransport {
            fail_subscriptions_containing: Some("TransferBatch".to_string()),
            ..Default::default()
        });
        let first_manager = manager(transport.clone());
        assert!(first_manager.activate_pool("F1", None, None).await.is_err());

        // Retry succeeds once the transport recovers, re-fetching whatever
        // was already created.
        let transport = Arc::new(MockTransport::seeded(
            transport.list_streams().await.unwrap(),
            transport.list_subscriptions().await.unwrap(),
        ));
        let manager = manager(transport.clone());
        manager.activate_pool("F1", None, None).await.unwrap();
        assert_eq!(transport.subscription_names().len(), 4);
    }

    #[tokio::test]
    async fn test_migration_no_streams_is_no_drift() {
        let transport = Arc::new(MockTransport::default());
        let manager = manager(transport);
        assert!(!manager.check_migration().await.unwrap());
    }

    #[tokio::test]
    async fn test_migration_full_coverage_is_no_drift() {
        let stream = EventStream {
            id: "es-1".to_string(),
            name: "tessera/0xabc".to_string(),
        };
        let subscriptions = vec![
            seeded_subscription("es-1", "tessera/0xabc:base:TokenPoolCreation"),
            seeded_subscription("es-1", "tessera/0xabc:F1:TokenPoolCreation"),
            seeded_subscription("es-1", "tessera/0xabc:F1:TransferSingle"),
            seeded_subscription("es-1", "tessera/0xabc:F1:TransferBatch"),
            seeded_subscription("es-1", "tessera/0xabc:F1:ApprovalForAll"),
        ];
        let transport = Arc::new(MockTransport::seeded(vec![stream], subscriptions));
        let manager = manager(transport);
        assert!(!manager.check_migration().await.unwrap());
    }

    #[tokio::test]
    async fn test_migration_missing_event_kind_is_drift() {
        let stream = EventStream {
            id: "es-1".to_string(),
            name: "tessera/0xabc".to_string(),
        };
        let subscriptions = vec![
            seeded_subscription("es-1", "tessera/0xabc:F1:TokenPoolCreation"),
            seeded_subscription("es-1", "tessera/0xabc:F1:TransferSingle"),
            seeded_subscription("es-1", "tessera/0xabc:F1:ApprovalForAll"),
        ];
        let transport = Arc::new(MockTransport::seeded(vec![stream], subscriptions));
        let manager = manager(transport);
        assert!(manager.check_migration().await.unwrap());
    }

    #[tokio::test]
    async fn test_migration_duplicate_event_kind_is_drift() {
        let stream = EventStream {
            id: "es-1".to_string(),
            name: "tessera/0xabc".to_string(),
        };
        let subscriptions = vec![
            seeded_subscription("es-1", "tessera/0xabc:F1:TokenPoolCreation"),
            seeded_subscription("es-1", "tessera/0xabc:F1:TransferSingle"),
            seeded_subscription("es-1", "tessera/0xabc:F1:TransferSingle"),
            seeded_subscription("es-1", "tessera/0xabc:F1:ApprovalForAll"),
        ];
        let transport = Arc::new(MockTransport::seeded(vec![stream], subscriptions));
        let manager = manager(transport);
        assert!(manager.check_migration().await.unwrap());
    }

    #[tokio::test]
    async fn test_migration_unparseable_name_is_drift() {
        let stream = EventStream {
            id: "es-1".to_string(),
            name: "tessera/0xabc".to_string(),
        };
        let subscriptions = vec![seeded_subscription("es-1", "some-ancient-subscription")];
        let transport = Arc::new(MockTransport::seeded(vec![stream], subscriptions));
        let manager = manager(transport);
        assert!(manager.check_migration().await.unwrap());
    }

    #[tokio::test]
    async fn test_migration_falls_back_to_legacy_stream_name() {
        // Stream persisted under the first legacy candidate (bare instance
        // path), holding a fully covered pool.
        let stream = EventStream {
            id: "es-9".to_string(),
            name: "0xabc".to_string(),
        };
        let subscriptions = vec![
            seeded_subscription("es-9", "0xabc:F1:TokenPoolCreation"),
            seeded_subscription("es-9", "0xabc:F1:TransferSingle"),
            seeded_subscription("es-9", "0xabc:F1:TransferBatch"),
            seeded_subscription("es-9", "0xabc:F1:ApprovalForAll"),
        ];
        let transport = Arc::new(MockTransport::seeded(vec![stream], subscriptions));
        let manager = manager(transport);
        assert!(!manager.check_migration().await.unwrap());
    }

    #[tokio::test]
    async fn test_migration_ignores_other_streams_subscriptions() {
        let streams = vec![
            EventStream {
                id: "es-1".to_string(),
                name: "tessera/0xabc".to_string(),
            },
            EventStream {
                id: "es-2".to_string(),
                name: "unrelated".to_string(),
            },
        ];
        // The unparseable name lives under another stream and must not
        // trip the check.
        let subscriptions = vec![seeded_subscription("es-2", "garbage")];
        let transport = Arc::new(MockTransport::seeded(streams, subscriptions));
        let manager = manager(transport);
        assert!(!manager.check_migration().await.unwrap());
    }
}
