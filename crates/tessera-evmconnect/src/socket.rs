//! WebSocket delivery of raw contract events from the gateway.
//!
//! The gateway pushes batches of log entries per topic and expects an ack
//! after each batch; unacked batches are redelivered, which is where the
//! connector's at-least-once assumption comes from. Entries are forwarded
//! individually to an mpsc channel in batch order.

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use tessera::event::GatewayEvent;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const CHANNEL_BUFFER: usize = 1024;

/// Consumes the gateway's WebSocket event feed for one topic.
pub struct EventStreamSocket {
    ws_url: Url,
    topic: String,
}

impl EventStreamSocket {
    pub fn new(ws_url: Url, topic: impl Into<String>) -> Self {
        Self {
            ws_url,
            topic: topic.into(),
        }
    }

    /// Spawn the socket loop.
    ///
    /// Returns the receiving end of the event channel and the task handle.
    /// The loop reconnects on failure and exits once the receiver is
    /// dropped.
    pub fn spawn(self) -> (mpsc::Receiver<GatewayEvent>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER);
        let handle = tokio::spawn(self.run(tx));
        (rx, handle)
    }

    async fn run(self, tx: mpsc::Sender<GatewayEvent>) {
        loop {
            match connect_async(self.ws_url.as_str()).await {
                Ok((mut stream, _)) => {
                    tracing::info!(
                        target: "evmconnect::socket",
                        url = %self.ws_url,
                        topic = %self.topic,
                        "Connected to gateway event feed"
                    );
                    let listen = json!({"type": "listen", "topic": self.topic});
                    if let Err(e) = stream.send(Message::Text(listen.to_string())).await {
                        tracing::warn!(
                            target: "evmconnect::socket",
                            error = %e,
                            "Failed to send listen request"
                        );
                    } else if !self.consume(&mut stream, &tx).await {
                        // Receiver gone, shut down for good.
                        return;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        target: "evmconnect::socket",
                        url = %self.ws_url,
                        error = %e,
                        "Gateway connection failed"
                    );
                }
            }

            if tx.is_closed() {
                return;
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }

    /// Read batches until the connection drops. Returns false when the
    /// receiver has gone away and the loop should stop entirely.
    async fn consume<S>(&self, stream: &mut S, tx: &mpsc::Sender<GatewayEvent>) -> bool
    where
        S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
            + Sink<Message, Error = tokio_tungstenite::tungstenite::Error>
            + Unpin,
    {
        while let Some(message) = stream.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    for event in parse_batch(&text) {
                        if tx.send(event).await.is_err() {
                            return false;
                        }
                    }
                    let ack = json!({"type": "ack", "topic": self.topic});
                    if let Err(e) = stream.send(Message::Text(ack.to_string())).await {
                        tracing::warn!(
                            target: "evmconnect::socket",
                            error = %e,
                            "Failed to ack batch, reconnecting"
                        );
                        break;
                    }
                }
                Ok(Message::Ping(payload)) => {
                    if stream.send(Message::Pong(payload)).await.is_err() {
                        break;
                    }
                }
                Ok(Message::Close(_)) => {
                    tracing::info!(
                        target: "evmconnect::socket",
                        "Gateway closed the connection"
                    );
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        target: "evmconnect::socket",
                        error = %e,
                        "Gateway read error, reconnecting"
                    );
                    break;
                }
            }
        }
        true
    }
}

/// Parse one delivery frame into events.
///
/// The gateway sends either a bare JSON array of log entries or an object
/// with an `events` array (batch envelope). Entries that do not deserialize
/// are logged and skipped rather than poisoning the rest of the batch.
fn parse_batch(text: &str) -> Vec<GatewayEvent> {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(
                target: "evmconnect::socket",
                error = %e,
                "Undecodable delivery frame"
            );
            return Vec::new();
        }
    };

    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(mut map) => match map.remove("events") {
            Some(Value::Array(entries)) => entries,
            _ => {
                // Control frames (e.g. connection confirmations) carry no
                // events.
                return Vec::new();
            }
        },
        _ => return Vec::new(),
    };

    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!(
                    target: "evmconnect::socket",
                    error = %e,
                    "Skipping undecodable log entry"
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(log_index: &str) -> Value {
        json!({
            "subscriptionName": "tessera/0xabc:F1:TransferSingle",
            "signature": "TransferSingle(address,address,address,uint256,uint256)",
            "address": "0x1",
            "blockNumber": "10",
            "transactionIndex": "0",
            "transactionHash": "0x2",
            "logIndex": log_index,
            "data": {}
        })
    }

    #[test]
    fn test_parse_bare_array() {
        let text = serde_json::to_string(&json!([entry("0"), entry("1")])).unwrap();
        let events = parse_batch(&text);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].log_index, "1");
    }

    #[test]
    fn test_parse_batch_envelope() {
        let text =
            serde_json::to_string(&json!({"batchNumber": 7, "events": [entry("3")]})).unwrap();
        let events = parse_batch(&text);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].log_index, "3");
    }

    #[test]
    fn test_control_frames_carry_no_events() {
        assert!(parse_batch(r#"{"type":"connected"}"#).is_empty());
        assert!(parse_batch("not json").is_empty());
    }

    #[test]
    fn test_undecodable_entries_are_skipped() {
        let text = serde_json::to_string(&json!([entry("0"), {"junk": true}])).unwrap();
        let events = parse_batch(&text);
        assert_eq!(events.len(), 1);
    }
}
