//! Per-conversation streaming event variants.
//!
//! One event stream per conversation carries everything a live subscriber
//! needs to render a turn. Delivery is lossy for slow consumers, so only
//! `MessageDone` is authoritative; clients re-read the store on it.

use serde::{Deserialize, Serialize};

/// An event published to a conversation topic during a turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationEvent {
    /// A turn has begun.
    TurnStarted,
    /// A fragment of assistant text, in emission order.
    TextDelta {
        /// The text fragment.
        content: String,
    },
    /// One completed tool invocation (completion order, not call order).
    ToolResult {
        /// Decoded tool name.
        name: String,
        /// Raw JSON arguments.
        input: String,
        /// Handler result text.
        result: String,
    },
    /// A complete message has been persisted.
    MessageDone {
        /// Message row ID.
        message_id: String,
        /// `user` or `assistant`.
        role: String,
        /// The persisted items JSON array.
        items_json: String,
        /// RFC 3339 creation timestamp.
        created_at: String,
    },
    /// The turn finished. `title` is set only when newly generated this turn.
    TurnDone {
        /// Newly generated conversation title, or empty.
        #[serde(default, skip_serializing_if = "String::is_empty")]
        title: String,
    },
    /// A turn-level failure; always followed by an empty `TurnDone`.
    Error {
        /// Failure description.
        message: String,
    },
}

impl ConversationEvent {
    /// A `TurnDone` with no title.
    #[must_use]
    pub fn turn_done() -> Self {
        Self::TurnDone { title: String::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_started_tag() {
        let json = serde_json::to_string(&ConversationEvent::TurnStarted).unwrap();
        assert_eq!(json, r#"{"type":"turn_started"}"#);
    }

    #[test]
    fn text_delta_roundtrip() {
        let ev = ConversationEvent::TextDelta { content: "hi".into() };
        let json = serde_json::to_string(&ev).unwrap();
        let back: ConversationEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ev);
    }

    #[test]
    fn turn_done_omits_empty_title() {
        let json = serde_json::to_string(&ConversationEvent::turn_done()).unwrap();
        assert_eq!(json, r#"{"type":"turn_done"}"#);
    }

    #[test]
    fn turn_done_carries_title() {
        let ev = ConversationEvent::TurnDone { title: "Fetch weather".into() };
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains(r#""title":"Fetch weather""#));
    }
}
