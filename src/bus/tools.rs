use anyhow::{Context, Result};
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::commands::{parse_args, ToolDispatcher, ToolResponse};

/// Serves tool calls over NATS request/reply on `{subject}.{toolName}`
pub struct ToolServer {
    client: async_nats::Client,
    subject: String,
    dispatcher: ToolDispatcher,
}

/// Tool name from a request subject, if it sits under `prefix`
pub fn tool_name<'a>(prefix: &str, subject: &'a str) -> Option<&'a str> {
    subject
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('.'))
        .filter(|name| !name.is_empty())
}

/// Serialize a tool response for the reply subject
pub fn to_payload(response: &ToolResponse) -> Vec<u8> {
    serde_json::to_vec(response).unwrap_or_else(|e| {
        format!(
            r#"{{"success":false,"error":"failed to serialize response: {}","code":"internal_inconsistency"}}"#,
            e
        )
        .into_bytes()
    })
}

impl ToolServer {
    pub fn new(
        client: async_nats::Client,
        subject: impl Into<String>,
        dispatcher: ToolDispatcher,
    ) -> Self {
        Self {
            client,
            subject: subject.into(),
            dispatcher,
        }
    }

    /// Subscribe and serve until the subscription ends.
    ///
    /// Each request runs on its own task so a slow route lookup never
    /// holds up other callers.
    pub async fn run(self) -> Result<()> {
        let wildcard = format!("{}.>", self.subject);
        let mut requests = self
            .client
            .subscribe(wildcard.clone())
            .await
            .with_context(|| format!("Failed to subscribe to '{}'", wildcard))?;

        info!(subject = %wildcard, "Tool server listening");

        while let Some(message) = requests.next().await {
            let subject = message.subject.to_string();
            let Some(tool) = tool_name(&self.subject, &subject).map(str::to_string) else {
                continue;
            };
            let Some(reply) = message.reply.clone() else {
                debug!(tool = %tool, "Tool request without reply subject ignored");
                continue;
            };

            let client = self.client.clone();
            let dispatcher = self.dispatcher.clone();
            tokio::spawn(async move {
                let response = match parse_args(&message.payload) {
                    Ok(args) => dispatcher.call(&tool, args).await,
                    Err(e) => ToolResponse::failure(e.code(), e.to_string()),
                };

                if let Err(e) = client.publish(reply, to_payload(&response).into()).await {
                    warn!(tool = %tool, error = %e, "Failed to send tool reply");
                }
            });
        }

        info!("Tool server stopped");
        Ok(())
    }
}
