use anyhow::{Context, Result};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use crate::event::{EventEnvelope, WorldEvent};

/// Forwards world events to NATS as JSON envelopes
#[derive(Clone)]
pub struct EventPublisher {
    client: async_nats::Client,
    prefix: String,
}

/// Subject an event is published on, with the optional deployment prefix
pub fn subject_for(prefix: &str, subject: &str) -> String {
    if prefix.is_empty() {
        subject.to_string()
    } else {
        format!("{}.{}", prefix.trim_end_matches('.'), subject)
    }
}

impl EventPublisher {
    pub fn new(client: async_nats::Client, prefix: impl Into<String>) -> Self {
        Self {
            client,
            prefix: prefix.into(),
        }
    }

    /// Publish a single event (core NATS, no acknowledgement)
    pub async fn publish(&self, event: &WorldEvent) -> Result<()> {
        let envelope = EventEnvelope::from_event(event)?;
        let subject = subject_for(&self.prefix, &envelope.subject);
        let payload = serde_json::to_vec(&envelope).context("Failed to serialize event envelope")?;

        debug!(
            event_id = %envelope.event_id,
            subject = %subject,
            "Publishing event to NATS"
        );

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .with_context(|| format!("Failed to publish event to subject '{}'", subject))?;

        Ok(())
    }

    /// Drain the event bus into NATS until the bus closes.
    ///
    /// Failures are logged and skipped; a slow bus drops the oldest events.
    pub async fn run(self, mut events: broadcast::Receiver<WorldEvent>) {
        info!(prefix = %self.prefix, "Event publisher started");

        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Err(e) = self.publish(&event).await {
                        warn!(error = %format!("{:#}", e), "Event publish failed");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event publisher lagging, events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }

        info!("Event publisher stopped");
    }
}
