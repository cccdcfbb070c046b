//! Tessera connector - ERC1155 token pool connector.
//!
//! Wires the connector core to a blockchain gateway: ensures the event
//! stream and base subscription exist, audits existing subscriptions for
//! naming drift, activates configured pools, then normalizes delivered
//! contract events into domain notifications until shutdown.

mod config;
mod log_sink;

use anyhow::Result;
use clap::Parser;
use config::Config;
use std::sync::Arc;

use tessera::{EventNormalizer, NotificationSink, SubscriptionManager};
use tessera_evmconnect::{EvmConnect, EventStreamSocket};

use log_sink::LogNotificationSink;

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    let config = Config::parse();
    run_connector(config).await
}

async fn run_connector(config: Config) -> Result<()> {
    tracing::info!("Starting Tessera connector");
    tracing::info!("Gateway URL: {}", config.gateway_url);
    tracing::info!("Gateway WS URL: {}", config.gateway_ws_url);
    tracing::info!("Topic: {}", config.topic);
    tracing::info!("Instance path: {}", config.instance_path);
    tracing::info!("Contract address: {}", config.contract_address);

    let gateway = Arc::new(EvmConnect::new(config.gateway_url.clone())?);

    let mut manager = SubscriptionManager::new(
        gateway.clone(),
        config.topic.clone(),
        config.instance_path.clone(),
        config.contract_address.clone(),
    );
    if !config.legacy_stream_name.is_empty() {
        manager = manager.with_legacy_stream_names(config.legacy_stream_name.clone());
    }
    if let Some(from_block) = &config.from_block {
        manager = manager.with_base_from_block(from_block.clone());
    }

    // Read-only audit of pre-existing event-stream state; drift is an
    // operator concern, never fatal.
    match manager.check_migration().await {
        Ok(true) => tracing::warn!(
            "Event-stream subscriptions drift from the current naming scheme; \
             see warnings above for remediation"
        ),
        Ok(false) => tracing::info!("Event-stream subscriptions match the current scheme"),
        Err(e) => tracing::warn!("Migration check could not complete: {e:#}"),
    }

    manager.init().await?;

    for entry in &config.pool {
        let (locator, pool_data) = Config::parse_pool(entry);
        manager.activate_pool(locator, pool_data, None).await?;
    }

    let normalizer = EventNormalizer::new(gateway.clone());
    let sink = LogNotificationSink;

    let socket = EventStreamSocket::new(config.gateway_ws_url.clone(), config.topic.clone());
    let (mut events, socket_handle) = socket.spawn();

    tracing::info!("Connector ready, consuming events");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received SIGINT (Ctrl+C), shutting down");
                break;
            }
            delivered = events.recv() => match delivered {
                Some(event) => {
                    for notification in normalizer.normalize(&event).await {
                        if let Err(e) = sink.deliver(notification).await {
                            tracing::warn!("Notification delivery failed: {e:#}");
                        }
                    }
                }
                None => {
                    tracing::warn!("Event feed closed, shutting down");
                    break;
                }
            }
        }
    }

    socket_handle.abort();
    tracing::info!("Tessera connector shutdown complete");
    Ok(())
}
