//! Row types for the persisted tables.
//!
//! Thin mirrors of the table columns; JSON columns stay as strings and are
//! parsed by the consumers that understand their shapes. All timestamps are
//! RFC 3339 UTC strings.

use serde::{Deserialize, Serialize};

/// A persona configuration row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub system_prompt: String,
    /// JSON array of enabled tool names.
    pub enabled_tools_json: String,
    /// JSON array of enabled notification-channel IDs.
    pub enabled_notification_channels_json: String,
    /// JSON array of `{root_id, enabled_tools}` pairs.
    pub enabled_filesystem_roots_json: String,
    /// Model name; empty means fall back to the process default.
    pub model: String,
    /// JSON array of host env var names forwarded into tool execution.
    pub forwarded_host_env_vars_json: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A chat thread bound to one agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationRow {
    pub id: String,
    pub agent_id: String,
    /// Empty until generated on the first completed turn; never cleared after.
    pub title: String,
    /// Last LLM response ID for continuity.
    pub previous_response_id: String,
    pub created_at: String,
    pub updated_at: String,
}

/// An append-only message row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageRow {
    pub id: String,
    pub conversation_id: String,
    /// `user` or `assistant`.
    pub role: String,
    /// JSON array of tagged items in emission order.
    pub items_json: String,
    pub created_at: String,
}

/// A persisted invocation rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TriggerRow {
    pub id: String,
    pub agent_id: String,
    pub name: String,
    pub prompt: String,
    /// 5-field cron expression; `None` marks a one-shot trigger.
    pub cron_expr: Option<String>,
    pub enabled: bool,
    pub next_run_at: Option<String>,
    pub model: String,
    pub conversation_title: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TriggerRow {
    /// Whether this trigger recurs on a cron schedule.
    #[must_use]
    pub fn is_cron(&self) -> bool {
        self.cron_expr.as_deref().is_some_and(|expr| !expr.is_empty())
    }
}

/// An audit row for one trigger execution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TriggerRunRow {
    pub id: String,
    pub trigger_id: String,
    pub conversation_id: Option<String>,
    /// `running`, `completed`, or `failed`.
    pub status: String,
    pub error_message: Option<String>,
    pub started_at: String,
    pub finished_at: Option<String>,
}

/// A notification channel definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelRow {
    pub id: String,
    pub name: String,
    /// Channel type; `http_request` is the only defined one.
    pub channel_type: String,
    pub config_json: String,
    pub description: String,
    pub json_schema_json: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A filesystem root agents may be granted access to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RootRow {
    pub id: String,
    pub name: String,
    /// Absolute path on the host.
    pub path: String,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A per-agent file (memory storage).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentFileRow {
    pub agent_id: String,
    pub path: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cron_trigger_detection() {
        let mut row = TriggerRow {
            id: "t1".into(),
            agent_id: "a1".into(),
            name: "n".into(),
            prompt: "p".into(),
            cron_expr: Some("*/5 * * * *".into()),
            enabled: true,
            next_run_at: None,
            model: String::new(),
            conversation_title: String::new(),
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert!(row.is_cron());
        row.cron_expr = Some(String::new());
        assert!(!row.is_cron());
        row.cron_expr = None;
        assert!(!row.is_cron());
    }
}
