//! OpenRouter Responses-API client.
//!
//! One client instance is shared process-wide. Streaming requests have no
//! client-side timeout; the caller's cancellation token bounds them.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::{OpenRouterError, Result};
use crate::sse::parse_sse_lines;
use crate::types::{
    ContentPart, Input, Model, Response, ResponseRequest, StreamEvent,
};

const BASE_URL: &str = "https://openrouter.ai/api/v1";
const MODELS_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Mailbox capacity for the streaming event channel.
const STREAM_CHANNEL_CAPACITY: usize = 64;

/// OpenRouter API client with a 1-hour models cache.
pub struct OpenRouterClient {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
    models_cache: Mutex<Option<(Vec<Model>, Instant)>>,
}

impl OpenRouterClient {
    /// Create a client with the production base URL.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, BASE_URL)
    }

    /// Create a client against a custom base URL (tests).
    #[must_use]
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            http: reqwest::Client::new(),
            models_cache: Mutex::new(None),
        }
    }

    /// Execute a non-streaming response request.
    pub async fn create_response(&self, req: &ResponseRequest) -> Result<Response> {
        let resp = self
            .http
            .post(format!("{}/responses", self.base_url))
            .bearer_auth(&self.api_key)
            .json(req)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OpenRouterError::Status { status: status.as_u16(), body });
        }

        Ok(resp.json::<Response>().await?)
    }

    /// Open a streaming response request.
    ///
    /// Returns an event channel and an error channel, matching the
    /// two-channel contract the loop consumes. The spawned reader task
    /// closes both channels when the stream ends, fails, or is cancelled.
    pub fn create_response_stream(
        &self,
        req: &ResponseRequest,
        cancel: CancellationToken,
    ) -> (mpsc::Receiver<StreamEvent>, mpsc::Receiver<OpenRouterError>) {
        let (event_tx, event_rx) = mpsc::channel::<StreamEvent>(STREAM_CHANNEL_CAPACITY);
        let (err_tx, err_rx) = mpsc::channel::<OpenRouterError>(1);

        let mut req = req.clone();
        req.stream = true;

        let http = self.http.clone();
        let api_key = self.api_key.clone();
        let url = format!("{}/responses", self.base_url);

        let _handle = tokio::spawn(async move {
            let resp = match http.post(&url).bearer_auth(&api_key).json(&req).send().await {
                Ok(r) => r,
                Err(e) => {
                    let _ = err_tx.send(OpenRouterError::Http(e)).await;
                    return;
                }
            };

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                let _ = err_tx
                    .send(OpenRouterError::Status { status: status.as_u16(), body })
                    .await;
                return;
            }

            let byte_stream = resp.bytes_stream();
            let mut lines = Box::pin(parse_sse_lines(byte_stream));

            loop {
                let data = tokio::select! {
                    () = cancel.cancelled() => return,
                    data = lines.next() => match data {
                        Some(d) => d,
                        None => return,
                    },
                };

                let event: StreamEvent = match serde_json::from_str(&data) {
                    Ok(ev) => ev,
                    Err(e) => {
                        // Malformed events are skipped, not fatal
                        debug!(error = %e, "skipping malformed stream event");
                        continue;
                    }
                };

                tokio::select! {
                    () = cancel.cancelled() => return,
                    sent = event_tx.send(event) => {
                        if sent.is_err() {
                            return;
                        }
                    }
                }
            }
        });

        (event_rx, err_rx)
    }

    /// List available models, cached for one hour.
    pub async fn list_models(&self) -> Result<Vec<Model>> {
        if let Some((models, fetched)) = self.models_cache.lock().as_ref() {
            if fetched.elapsed() < MODELS_CACHE_TTL {
                return Ok(models.clone());
            }
        }

        let resp = self
            .http
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OpenRouterError::Status { status: status.as_u16(), body });
        }

        #[derive(serde::Deserialize)]
        struct Pricing {
            #[serde(default)]
            prompt: String,
            #[serde(default)]
            completion: String,
        }
        #[derive(serde::Deserialize)]
        struct WireModel {
            id: String,
            #[serde(default)]
            name: String,
            #[serde(default = "default_pricing")]
            pricing: Pricing,
        }
        fn default_pricing() -> Pricing {
            Pricing { prompt: String::new(), completion: String::new() }
        }
        #[derive(serde::Deserialize)]
        struct ModelsBody {
            data: Vec<WireModel>,
        }

        let body: ModelsBody = resp.json().await?;
        let models: Vec<Model> = body
            .data
            .into_iter()
            .map(|m| Model {
                id: m.id,
                name: m.name,
                prompt_pricing: m.pricing.prompt,
                completion_pricing: m.pricing.completion,
            })
            .collect();

        *self.models_cache.lock() = Some((models.clone(), Instant::now()));
        Ok(models)
    }

    /// Generate a brief conversation title from the first exchange.
    pub async fn generate_title(
        &self,
        model: &str,
        user_message: &str,
        assistant_response: &str,
    ) -> Result<String> {
        let prompt = format!(
            "Generate a brief title (3-6 words) for this conversation:\n\n\
             User: {user_message}\n\
             Assistant: {assistant_response}\n\n\
             Reply with only the title, no quotes or explanation."
        );

        let req = ResponseRequest {
            model: model.to_owned(),
            input: vec![Input::user_message(prompt)],
            ..Default::default()
        };

        let resp = self.create_response(&req).await?;
        resp.output
            .iter()
            .find_map(|item| {
                if item.item_type == "message" {
                    item.content.first().map(|part: &ContentPart| part.text.trim().to_owned())
                } else {
                    None
                }
            })
            .filter(|title| !title.is_empty())
            .ok_or(OpenRouterError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_request_sets_stream_flag() {
        // create_response_stream clones the request with stream = true; the
        // serialized body must carry it.
        let mut req = ResponseRequest {
            model: "openai/gpt-5".into(),
            input: vec![Input::user_message("hi")],
            ..Default::default()
        };
        req.stream = true;
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["stream"], true);
    }

    #[tokio::test]
    async fn cancelled_stream_closes_channels() {
        let client = OpenRouterClient::with_base_url("key", "http://127.0.0.1:1/api");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let req = ResponseRequest {
            model: "m".into(),
            input: vec![Input::user_message("hi")],
            ..Default::default()
        };
        let (mut events, mut errs) = client.create_response_stream(&req, cancel);

        // The connection to a dead port fails fast; either channel closing
        // (or an error arriving) is an acceptable terminal state.
        let event = events.recv().await;
        assert!(event.is_none());
        let _ = errs.recv().await;
    }
}
