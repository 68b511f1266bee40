//! Wire shapes for the OpenRouter Responses API.
//!
//! Requests carry an `input` array of tagged items; responses carry an
//! `output` array. Because OpenRouter does not support
//! `previous_response_id` server-side continuation, callers echo prior
//! `function_call` items alongside their `function_call_output`s.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A request to `POST /responses`.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ResponseRequest {
    pub model: String,
    pub input: Vec<Input>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub instructions: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub previous_response_id: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Value>,
}

/// One element of a request's `input` array.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Input {
    /// `message`, `function_call`, or `function_call_output`.
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub input_type: String,
    /// Role for `message` items.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub role: String,
    /// Structured content for `message` items.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<ContentPart>,
    /// Item ID (assistant messages, function calls, and outputs).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// `completed` for echoed assistant messages.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    /// Empty array required on echoed assistant messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Vec<Value>>,
    /// Correlates a `function_call` with its `function_call_output`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub call_id: String,
    /// Function name for `function_call` items.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Raw JSON arguments for `function_call` items.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub arguments: String,
    /// Result text for `function_call_output` items.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub output: String,
}

impl Input {
    /// A `message` item with the user role.
    #[must_use]
    pub fn user_message(text: impl Into<String>) -> Self {
        Self {
            input_type: "message".into(),
            role: "user".into(),
            content: vec![ContentPart::input_text(text)],
            ..Default::default()
        }
    }

    /// An echoed assistant `message` item (status `completed`).
    #[must_use]
    pub fn assistant_message(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            input_type: "message".into(),
            role: "assistant".into(),
            id: id.into(),
            status: "completed".into(),
            content: vec![ContentPart::output_text(text)],
            annotations: Some(Vec::new()),
            ..Default::default()
        }
    }

    /// A `function_call` echo item.
    #[must_use]
    pub fn function_call(
        id: impl Into<String>,
        call_id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            input_type: "function_call".into(),
            id: id.into(),
            call_id: call_id.into(),
            name: name.into(),
            arguments: arguments.into(),
            ..Default::default()
        }
    }

    /// A `function_call_output` item.
    #[must_use]
    pub fn function_call_output(
        id: impl Into<String>,
        call_id: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            input_type: "function_call_output".into(),
            id: id.into(),
            call_id: call_id.into(),
            output: output.into(),
            ..Default::default()
        }
    }
}

/// A content element inside a `message` item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContentPart {
    /// `input_text` or `output_text`.
    #[serde(rename = "type")]
    pub part_type: String,
    pub text: String,
}

impl ContentPart {
    /// An `input_text` part.
    #[must_use]
    pub fn input_text(text: impl Into<String>) -> Self {
        Self { part_type: "input_text".into(), text: text.into() }
    }

    /// An `output_text` part.
    #[must_use]
    pub fn output_text(text: impl Into<String>) -> Self {
        Self { part_type: "output_text".into(), text: text.into() }
    }
}

/// A complete model response.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Response {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub output: Vec<OutputItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

/// One element of a response's `output` array.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct OutputItem {
    /// `message` or `function_call`.
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<ContentPart>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub call_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub arguments: String,
}

impl OutputItem {
    /// Whether this item is a `function_call`.
    #[must_use]
    pub fn is_function_call(&self) -> bool {
        self.item_type == "function_call"
    }
}

/// An error payload embedded in a response object.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ResponseError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: String,
}

/// One event from the streaming endpoint.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct StreamEvent {
    /// Event kind, e.g. `response.output_text.delta`.
    #[serde(rename = "type", default)]
    pub event_type: String,
    /// Text fragment for delta events.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub delta: String,
    /// A complete response object; authoritative for the round's tool calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Response>,
}

impl StreamEvent {
    /// Whether this event carries an output-text fragment.
    #[must_use]
    pub fn is_text_delta(&self) -> bool {
        self.event_type == "response.output_text.delta" && !self.delta.is_empty()
    }
}

/// A model listed by the `/models` endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub id: String,
    pub name: String,
    pub prompt_pricing: String,
    pub completion_pricing: String,
}
