//! Log-backed notification sink.

use async_trait::async_trait;

use tessera::notification::TokenNotification;
use tessera::sink::NotificationSink;

/// Writes every normalized notification to the structured log as JSON.
///
/// Stands in for the platform-facing notification channel; swapping in a
/// real channel means swapping this sink.
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn deliver(&self, notification: TokenNotification) -> anyhow::Result<()> {
        let payload = serde_json::to_string(&notification)?;
        tracing::info!(
            target: "tessera::notifications",
            event_id = %notification.event_id(),
            %payload,
            "Notification"
        );
        Ok(())
    }
}
