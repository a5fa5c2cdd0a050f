use serde::{Deserialize, Serialize};

use crate::event::EventEnvelope;

/// Client → Server message types
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "subscribe")]
    Subscribe { subject: String },
    #[serde(rename = "unsubscribe")]
    Unsubscribe { subject: String },
}

/// Server → Client: one world event
#[derive(Debug, Clone, Serialize)]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub msg_type: &'static str,
    #[serde(flatten)]
    pub envelope: EventEnvelope,
}

impl From<EventEnvelope> for EventMessage {
    fn from(envelope: EventEnvelope) -> Self {
        Self {
            msg_type: "event",
            envelope,
        }
    }
}

/// Server → Client: Error message
#[derive(Debug, Clone, Serialize)]
pub struct ErrorMessage {
    #[serde(rename = "type")]
    pub msg_type: &'static str,
    pub error: String,
}

impl ErrorMessage {
    pub fn new(error: String) -> Self {
        Self {
            msg_type: "error",
            error,
        }
    }
}

/// True when `subject` equals `filter` or sits below it at a dot boundary
pub fn subject_matches(filter: &str, subject: &str) -> bool {
    match subject.strip_prefix(filter) {
        Some(rest) => rest.is_empty() || rest.starts_with('.') || filter.ends_with('.'),
        None => false,
    }
}
