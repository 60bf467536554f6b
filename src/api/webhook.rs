//! Client for the external workflow webhook
//!
//! Chat messages and their retrieved context are POSTed as JSON. Workflow
//! engines answer in many shapes (plain text, `{"output": ..}`, arrays of
//! items, nested `data`), so replies are reduced to one display string.

use crate::config::WebhookConfig;
use crate::error::{DocrelayError, Result};
use crate::storage::{Chunk, DocumentId};
use crate::utils::preview;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Object keys that carry the reply text, in order of preference
const REPLY_KEYS: &[&str] = &["output", "text", "message", "response", "answer", "reply", "content"];

/// One retrieved passage as sent to the webhook
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ContextPassage {
    pub document_id: DocumentId,
    pub index: usize,
    pub content: String,
}

impl From<&Chunk> for ContextPassage {
    fn from(chunk: &Chunk) -> Self {
        Self {
            document_id: chunk.document_id,
            index: chunk.index,
            content: chunk.content.clone(),
        }
    }
}

/// Request body sent to the webhook
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    pub message: String,
    pub session_id: Option<String>,
    pub document_ids: Vec<DocumentId>,
    pub context: Vec<ContextPassage>,
}

pub struct WebhookClient {
    client: reqwest::Client,
    url: String,
}

impl WebhookClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// `None` when no webhook URL is configured
    pub fn from_config(config: &WebhookConfig) -> Result<Option<Self>> {
        match &config.url {
            Some(url) => Ok(Some(Self::new(
                url.clone(),
                Duration::from_secs(config.timeout_secs),
            )?)),
            None => Ok(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send a payload and return the normalized reply text
    pub async fn send(&self, payload: &WebhookPayload) -> Result<String> {
        log::debug!(
            "POST {} ({} context passages)",
            self.url,
            payload.context.len()
        );

        let response = self.client.post(&self.url).json(payload).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(DocrelayError::Webhook(format!(
                "{} returned {}: {}",
                self.url,
                status,
                preview(body.trim(), 200)
            )));
        }

        let reply = normalize_reply_body(&body);
        if reply.is_empty() {
            return Err(DocrelayError::Webhook(format!("{} returned an empty reply", self.url)));
        }
        Ok(reply)
    }
}

/// Normalize a raw response body: JSON is unwrapped with [`normalize_reply`],
/// anything else is returned trimmed.
pub fn normalize_reply_body(body: &str) -> String {
    let trimmed = body.trim();
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => normalize_reply(&value).unwrap_or_else(|| match value {
            Value::Null => String::new(),
            other => other.to_string(),
        }),
        Err(_) => trimmed.to_string(),
    }
}

/// Pull the reply text out of a JSON value, if it has any
pub fn normalize_reply(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
        Value::Array(items) => items.iter().find_map(normalize_reply),
        Value::Object(map) => REPLY_KEYS
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(normalize_reply)
            .or_else(|| map.get("data").and_then(normalize_reply)),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null => None,
    }
}
