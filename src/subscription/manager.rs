use crate::event::{EventEnvelope, WorldEvent};
use crate::subscription::protocol::{subject_matches, ClientMessage, ErrorMessage, EventMessage};
use axum::extract::ws::{Message, WebSocket};
use std::collections::HashSet;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Manages a single WebSocket connection with subject subscriptions
pub struct ConnectionManager {
    /// Subject prefixes this connection receives; empty means everything
    subscriptions: HashSet<String>,
}

impl ConnectionManager {
    pub fn new(initial: impl IntoIterator<Item = String>) -> Self {
        Self {
            subscriptions: initial.into_iter().filter(|s| !s.is_empty()).collect(),
        }
    }

    /// Handle WebSocket connection lifecycle
    pub async fn handle(mut self, mut socket: WebSocket, mut events: broadcast::Receiver<WorldEvent>) {
        info!(
            subscriptions = self.subscriptions.len(),
            "WebSocket connection established"
        );

        loop {
            tokio::select! {
                // Handle incoming client messages
                Some(msg) = socket.recv() => {
                    match msg {
                        Ok(Message::Text(text)) => {
                            if let Err(e) = self.handle_client_message(&text) {
                                warn!(error = %e, "Invalid client message");
                                if send_json(&mut socket, &ErrorMessage::new(e.to_string())).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Ok(Message::Close(_)) => {
                            info!("WebSocket client disconnected");
                            break;
                        }
                        Ok(Message::Ping(data)) => {
                            if let Err(e) = socket.send(Message::Pong(data)).await {
                                error!(error = %e, "Failed to send pong");
                                break;
                            }
                        }
                        Ok(_) => {
                            // Ignore binary, pong messages
                        }
                        Err(e) => {
                            warn!(error = %e, "WebSocket error");
                            break;
                        }
                    }
                }

                // Forward world events
                result = events.recv() => {
                    match result {
                        Ok(event) => {
                            if !self.should_forward(event.subject()) {
                                continue;
                            }
                            let envelope = match EventEnvelope::from_event(&event) {
                                Ok(envelope) => envelope,
                                Err(e) => {
                                    error!(error = %format!("{:#}", e), "Failed to build event envelope");
                                    continue;
                                }
                            };
                            if let Err(e) = send_json(&mut socket, &EventMessage::from(envelope)).await {
                                error!(error = %e, "Failed to send event");
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped = skipped, "WebSocket lagged, skipped events");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            error!("Event broadcast channel closed");
                            break;
                        }
                    }
                }

                else => {
                    break;
                }
            }
        }

        info!("WebSocket connection closed");
    }

    /// Apply a subscribe/unsubscribe request
    pub fn handle_client_message(&mut self, text: &str) -> anyhow::Result<()> {
        let msg: ClientMessage = serde_json::from_str(text)?;

        match msg {
            ClientMessage::Subscribe { subject } => {
                info!(subject = %subject, "Client subscribed to subject");
                self.subscriptions.insert(subject);
            }
            ClientMessage::Unsubscribe { subject } => {
                info!(subject = %subject, "Client unsubscribed from subject");
                self.subscriptions.remove(&subject);
            }
        }

        Ok(())
    }

    /// Check if an event on `subject` should reach this connection
    pub fn should_forward(&self, subject: &str) -> bool {
        self.subscriptions.is_empty()
            || self
                .subscriptions
                .iter()
                .any(|filter| subject_matches(filter, subject))
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

async fn send_json<T: serde::Serialize>(socket: &mut WebSocket, msg: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string(msg)?;
    socket.send(Message::Text(json)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_all_without_subscriptions() {
        let manager = ConnectionManager::default();
        assert!(manager.should_forward("world.tick"));
        assert!(manager.should_forward("agent.position.updated"));
    }

    #[test]
    fn test_initial_filters_and_updates() {
        let mut manager = ConnectionManager::new(vec!["world.hazard".to_string(), String::new()]);
        assert!(manager.should_forward("world.hazard.fire.updated"));
        assert!(!manager.should_forward("world.tick"));

        manager
            .handle_client_message(r#"{"type":"subscribe","subject":"world.tick"}"#)
            .unwrap();
        assert!(manager.should_forward("world.tick"));

        manager
            .handle_client_message(r#"{"type":"unsubscribe","subject":"world.hazard"}"#)
            .unwrap();
        assert!(!manager.should_forward("world.hazard.fire.updated"));
        assert!(manager.should_forward("world.tick"));

        assert!(manager.handle_client_message("not json").is_err());
    }
}
