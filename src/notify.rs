//! Alert notification delivery

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, instrument};

use crate::ChatId;
use crate::alerts::{AlertEvent, AlertTransition};
use crate::config::WebhookConfig;
use crate::error::{MonitorError, MonitorResult};

/// Delivery seam between the monitor and whatever transport carries
/// notifications to a chat.
///
/// Implementations report failures per recipient; the monitor counts them
/// and moves on rather than aborting the fan-out.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn on_alert_event(&self, recipient: ChatId, event: &AlertEvent) -> MonitorResult<()>;
}

/// Posts alert events as JSON to a webhook, one request per recipient.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(config: &WebhookConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.url.clone(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    #[instrument(skip(self, event), fields(metric = %event.metric_key))]
    async fn on_alert_event(&self, recipient: ChatId, event: &AlertEvent) -> MonitorResult<()> {
        let payload = json!({
            "chat_id": recipient,
            "message": render_message(event),
            "event": event,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|err| dispatch_error(recipient, err.to_string()))?;

        if !response.status().is_success() {
            return Err(dispatch_error(
                recipient,
                format!("HTTP {}", response.status()),
            ));
        }

        info!("delivered {} alert to chat {recipient}", event.severity);
        Ok(())
    }
}

fn dispatch_error(recipient: ChatId, reason: String) -> MonitorError {
    MonitorError::Dispatch { recipient, reason }
}

/// Human-readable line for chat display; the structured fields ride along
/// in the payload for machine consumers.
fn render_message(event: &AlertEvent) -> String {
    match event.transition {
        AlertTransition::Raised => format!(
            "🚨 **{}**: `{}` is at **{:.1}%** (limit: {:.0}%)",
            event.severity, event.metric_key, event.value, event.threshold
        ),
        AlertTransition::Escalated => format!(
            "📈 **{}**: `{}` climbed to **{:.1}%** (limit: {:.0}%)",
            event.severity, event.metric_key, event.value, event.threshold
        ),
        AlertTransition::Cleared => format!(
            "✅ `{}` is back to normal: **{:.1}%**",
            event.metric_key, event.value
        ),
    }
}
