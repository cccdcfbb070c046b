//! Notification delivery seam.

use async_trait::async_trait;

use crate::notification::TokenNotification;

/// Receives normalized domain notifications from the event pipeline.
///
/// The connector binary plugs in a channel- or log-backed implementation;
/// tests use an in-memory collector.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: TokenNotification) -> anyhow::Result<()>;
}
