use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

/// NATS configuration
#[derive(Clone, Debug, Deserialize)]
pub struct NatsConfig {
    #[serde(default = "default_url")]
    pub url: String,
    /// Run without the bus when false (HTTP only)
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Tool requests arrive on `{tools_subject}.{toolName}`
    #[serde(default = "default_tools_subject")]
    pub tools_subject: String,
    /// Optional prefix prepended to every event subject
    #[serde(default)]
    pub event_prefix: String,
}

fn default_url() -> String {
    std::env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_string())
}

fn default_enabled() -> bool {
    true
}

fn default_tools_subject() -> String {
    "world.tools".to_string()
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            enabled: default_enabled(),
            tools_subject: default_tools_subject(),
            event_prefix: String::new(),
        }
    }
}

/// Core NATS connection (fire-and-forget publish, request/reply)
#[derive(Clone)]
pub struct NatsClient {
    client: async_nats::Client,
    config: NatsConfig,
}

impl NatsClient {
    pub async fn connect(config: NatsConfig) -> Result<Self> {
        info!("Connecting to NATS at {}", config.url);

        let client = async_nats::connect(&config.url)
            .await
            .with_context(|| format!("Failed to connect to NATS at '{}'", config.url))?;

        info!("Connected to NATS");
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &NatsConfig {
        &self.config
    }

    /// Get underlying NATS client
    pub fn client(&self) -> &async_nats::Client {
        &self.client
    }
}
