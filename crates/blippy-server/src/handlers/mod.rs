//! HTTP request handlers, one module per resource.

pub mod agents;
pub mod channels;
pub mod chat;
pub mod conversations;
pub mod models;
pub mod roots;
pub mod triggers;
pub mod webhook;
