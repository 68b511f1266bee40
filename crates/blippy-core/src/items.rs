//! Message content items.
//!
//! A message's `items_json` column holds an ordered array of tagged items.
//! The serialized shape is `{type, text?, name?, input?, result?, id?, call_id?}`
//! with empty fields omitted, which is what subscribers and the web client
//! consume verbatim.

use serde::{Deserialize, Serialize};

/// One element of a message's ordered content list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Item {
    /// A contiguous span of assistant or user text.
    Text {
        /// The text content.
        text: String,
    },
    /// A completed tool call with its result.
    ToolExecution {
        /// Decoded tool name.
        name: String,
        /// Raw JSON arguments the model supplied.
        #[serde(default, skip_serializing_if = "String::is_empty")]
        input: String,
        /// Text result returned by the handler.
        #[serde(default, skip_serializing_if = "String::is_empty")]
        result: String,
        /// Provider-assigned function-call ID.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        /// Correlation ID pairing the call with its output.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        call_id: Option<String>,
    },
}

impl Item {
    /// Construct a text item.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// Concatenate all text items into a single string, separated by blank lines.
#[must_use]
pub fn plain_text(items: &[Item]) -> String {
    let parts: Vec<&str> = items
        .iter()
        .filter_map(|item| match item {
            Item::Text { text } if !text.is_empty() => Some(text.as_str()),
            _ => None,
        })
        .collect();
    parts.join("\n\n")
}
