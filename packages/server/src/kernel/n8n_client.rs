use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use super::{BaseChatWebhook, WebhookReply, WebhookRequest};

/// Fields that may carry the answer, in order of preference
const ANSWER_FIELDS: [&str; 4] = ["output", "response", "text", "answer"];

/// n8n chat workflow reached through its webhook URL
pub struct N8nChatWebhook {
    url: String,
    client: reqwest::Client,
}

impl N8nChatWebhook {
    pub fn new(url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { url, client })
    }
}

#[async_trait]
impl BaseChatWebhook for N8nChatWebhook {
    async fn ask(&self, request: &WebhookRequest) -> Result<WebhookReply> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .context("Failed to send chat webhook request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Chat webhook error {}: {}", status, body);
        }

        let body: Value = response
            .json()
            .await
            .context("Failed to parse chat webhook response")?;

        parse_webhook_reply(&body).context("Chat webhook response has no answer")
    }
}

/// Read the answer from an object or a one-element array.
///
/// Returns `None` when no answer field holds non-blank text.
pub fn parse_webhook_reply(body: &Value) -> Option<WebhookReply> {
    let object = match body {
        Value::Array(items) => items.first()?,
        other => other,
    };

    let answer = ANSWER_FIELDS
        .iter()
        .filter_map(|field| object.get(*field).and_then(Value::as_str))
        .map(str::trim)
        .find(|text| !text.is_empty())?
        .to_string();

    let sources = object
        .get("sources")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    Some(WebhookReply { answer, sources })
}
