//! Dynamic notification tools.
//!
//! Each enabled channel becomes a `notify:<name>` tool whose parameters are
//! the channel's JSON schema. HTTP delivery failures are returned as result
//! text rather than errors so the LLM can see and react to them.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::{Result, ToolError};
use crate::traits::{AgentTool, NotificationChannel, ToolContext};

const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// A tool synthesized from one notification channel.
pub struct NotificationTool {
    channel: NotificationChannel,
    tool_name: String,
}

impl NotificationTool {
    /// Build the `notify:<channel_name>` tool for a channel.
    #[must_use]
    pub fn new(channel: NotificationChannel) -> Self {
        let tool_name = format!("notify:{}", channel.name);
        Self { channel, tool_name }
    }
}

#[derive(Deserialize)]
struct HttpRequestConfig {
    #[serde(default)]
    url: String,
    #[serde(default)]
    method: String,
    #[serde(default)]
    headers: std::collections::HashMap<String, String>,
}

#[async_trait]
impl AgentTool for NotificationTool {
    fn name(&self) -> &str {
        &self.tool_name
    }

    fn description(&self) -> String {
        if self.channel.description.is_empty() {
            format!("Send a notification to the {} channel", self.channel.name)
        } else {
            self.channel.description.clone()
        }
    }

    fn parameters(&self) -> Value {
        if self.channel.json_schema.is_empty() {
            return serde_json::json!({"type": "object", "additionalProperties": true});
        }
        serde_json::from_str(&self.channel.json_schema)
            .unwrap_or_else(|_| serde_json::json!({"type": "object", "additionalProperties": true}))
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<String> {
        match self.channel.channel_type.as_str() {
            "http_request" => send_http_request(&self.channel.config, &args).await,
            other => Ok(format!("Unknown channel type: {other}")),
        }
    }
}

async fn send_http_request(config_json: &str, payload: &Value) -> Result<String> {
    let config: HttpRequestConfig = serde_json::from_str(config_json)
        .map_err(|e| ToolError::failed(format!("parse config: {e}")))?;

    let method = if config.method.is_empty() {
        reqwest::Method::POST
    } else {
        config
            .method
            .parse::<reqwest::Method>()
            .map_err(|e| ToolError::failed(format!("invalid method: {e}")))?
    };

    let client = reqwest::Client::builder()
        .timeout(NOTIFY_TIMEOUT)
        .build()
        .map_err(|e| ToolError::failed(e.to_string()))?;

    let mut req = client
        .request(method, &config.url)
        .header("Content-Type", "application/json")
        .body(payload.to_string());
    for (key, value) in &config.headers {
        req = req.header(key, value);
    }

    let resp = match req.send().await {
        Ok(r) => r,
        Err(e) => return Ok(format!("Failed to send: {e}")),
    };

    let status = resp.status();
    if status.as_u16() >= 400 {
        let body = resp.text().await.unwrap_or_default();
        return Ok(format!("Failed with status {}: {body}", status.as_u16()));
    }

    Ok("Notification sent successfully".into())
}
