//! # blippy-core
//!
//! Foundation types shared by every Blippy crate:
//!
//! - **Branded IDs**: `AgentId`, `ConversationId`, ... as newtypes for type safety
//! - **Items**: the tagged message-content variants persisted in `items_json`
//! - **Events**: the per-conversation streaming event variants carried by the broker

#![deny(unsafe_code)]

pub mod events;
pub mod ids;
pub mod items;

pub use events::ConversationEvent;
pub use ids::{AgentId, ConversationId, MessageId, TriggerId, TriggerRunId};
pub use items::{plain_text, Item};
