//! URL fetch tool.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::{Result, ToolError};
use crate::traits::{AgentTool, ToolContext};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Response body cap.
const MAX_RESPONSE_SIZE: usize = 500 * 1024;

/// Fetch the text content of a URL.
pub struct FetchTool {
    http: reqwest::Client,
}

impl FetchTool {
    /// Create the tool with its own 30-second-timeout client.
    #[must_use]
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { http }
    }
}

impl Default for FetchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct FetchArgs {
    #[serde(default)]
    url: String,
}

#[async_trait]
impl AgentTool for FetchTool {
    fn name(&self) -> &str {
        "fetch_url"
    }

    fn description(&self) -> String {
        "Fetch the content of a URL. Returns the text content of the page. Use this to read \
         web pages, documentation, or API responses."
            .into()
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {"type": "string", "description": "The URL to fetch"}
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<String> {
        let args: FetchArgs = serde_json::from_value(args)?;
        if args.url.is_empty() {
            return Err(ToolError::failed("url is required"));
        }
        if !args.url.starts_with("http://") && !args.url.starts_with("https://") {
            return Err(ToolError::failed("url must start with http:// or https://"));
        }

        let resp = self
            .http
            .get(&args.url)
            .header("User-Agent", "Blippy/1.0")
            .header("Accept", "text/html,text/plain,application/json,*/*")
            .send()
            .await
            .map_err(|e| ToolError::failed(format!("fetch failed: {e}")))?;

        let status = resp.status();
        if status.as_u16() >= 400 {
            return Err(ToolError::failed(format!("HTTP {}: {status}", status.as_u16())));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| ToolError::failed(format!("read response: {e}")))?;
        let capped = &body[..body.len().min(MAX_RESPONSE_SIZE)];
        Ok(String::from_utf8_lossy(capped).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_url_is_an_error() {
        let tool = FetchTool::new();
        let err = tool
            .execute(serde_json::json!({}), &ToolContext::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("url is required"));
    }

    #[tokio::test]
    async fn rejects_non_http_schemes() {
        let tool = FetchTool::new();
        let err = tool
            .execute(serde_json::json!({"url": "file:///etc/passwd"}), &ToolContext::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("http://"));
    }

    #[test]
    fn schema_requires_url() {
        let tool = FetchTool::new();
        assert_eq!(tool.parameters()["required"], serde_json::json!(["url"]));
    }
}
