// NATS message bus adapter: event fan-out and request/reply tools

mod client;
mod publisher;
mod tools;

pub use client::{NatsClient, NatsConfig};
pub use publisher::EventPublisher;
pub use tools::ToolServer;
