//! Core trait and seam abstractions for the tool system.
//!
//! [`AgentTool`] is the trait every tool implements. The seam traits
//! (`ChannelLister`, `RootLister`, `TriggerCreator`, `AgentCaller`,
//! `AgentFileStore`) are what tools use to reach persistence and the
//! runner without depending on those crates; the runtime provides the
//! concrete implementations. The `AgentCaller` indirection is what breaks
//! the agents-execute-tools-that-call-agents cycle.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::errors::Result;

/// Maximum agent-to-agent recursion depth.
pub const DEFAULT_MAX_DEPTH: u32 = 5;

/// Execution context passed to every tool invocation.
///
/// Carried by value along the call chain; multiple turns run concurrently,
/// so none of this may live in globals.
#[derive(Clone, Debug, Default)]
pub struct ToolContext {
    /// Conversation the turn belongs to.
    pub conversation_id: String,
    /// Agent driving the turn.
    pub agent_id: String,
    /// Current agent-to-agent recursion depth (0 = root).
    pub depth: u32,
    /// Host env var names the agent may forward into tool execution.
    pub forwarded_env_vars: Vec<String>,
    /// Per-turn filesystem roots, keyed by fs tool name.
    pub fs_tool_roots: HashMap<String, Vec<FilesystemRoot>>,
    /// Cooperative cancellation for the turn.
    pub cancellation: CancellationToken,
}

/// A configured filesystem root available to fs tools.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilesystemRoot {
    pub id: String,
    pub name: String,
    /// Absolute path on the host.
    pub path: String,
    pub description: String,
}

/// Per-agent root configuration: which fs tools a root is enabled for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentFsRootConfig {
    pub root_id: String,
    pub enabled_tools: Vec<String>,
}

/// A notification channel definition used to synthesize `notify:*` tools.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationChannel {
    pub id: String,
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool parameters; empty means any JSON object.
    pub json_schema: String,
    /// Channel type; `http_request` is the only defined one.
    pub channel_type: String,
    /// Type-specific configuration JSON.
    pub config: String,
}

/// The trait every tool implements.
#[async_trait]
pub trait AgentTool: Send + Sync {
    /// Internal tool name (may contain `:`; encoded before transport).
    fn name(&self) -> &str;

    /// Human-readable description sent to the LLM.
    fn description(&self) -> String;

    /// JSON Schema for the tool's arguments.
    fn parameters(&self) -> Value;

    /// Execute with raw JSON arguments, returning result text.
    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<String>;
}

/// Build the provider-facing definition for a tool, encoding its name.
#[must_use]
pub fn tool_definition(tool: &dyn AgentTool) -> Value {
    serde_json::json!({
        "type": "function",
        "name": crate::names::encode_tool_name(tool.name()),
        "description": tool.description(),
        "parameters": tool.parameters(),
    })
}

/// Notification channel lookups.
#[async_trait]
pub trait ChannelLister: Send + Sync {
    /// Channels matching the given IDs.
    async fn list_channels_by_ids(&self, ids: &[String]) -> Result<Vec<NotificationChannel>>;
    /// Channel by unique name, or `None`.
    async fn get_channel_by_name(&self, name: &str) -> Result<Option<NotificationChannel>>;
}

/// Filesystem root lookups.
#[async_trait]
pub trait RootLister: Send + Sync {
    /// Roots matching the given IDs.
    async fn list_roots_by_ids(&self, ids: &[String]) -> Result<Vec<FilesystemRoot>>;
}

/// Subagent invocation seam; implemented by the runner.
///
/// The cancellation token is the calling turn's: cancelling the parent
/// turn cancels the nested run.
#[async_trait]
pub trait AgentCaller: Send + Sync {
    /// Run an agent autonomously and return its plain-text response.
    async fn run_agent(
        &self,
        agent_id: &str,
        prompt: &str,
        depth: u32,
        model: &str,
        cancel: CancellationToken,
    ) -> Result<String>;
}

/// A trigger to persist via [`TriggerCreator`].
#[derive(Clone, Debug)]
pub struct NewTrigger {
    pub agent_id: String,
    pub name: String,
    pub prompt: String,
    /// Cron expression for recurring triggers; `None` marks a one-shot.
    pub cron_expr: Option<String>,
    pub next_run_at: DateTime<Utc>,
    pub model: String,
}

/// Trigger creation seam; implemented over the store.
#[async_trait]
pub trait TriggerCreator: Send + Sync {
    /// Persist a trigger and return its ID.
    async fn create_trigger(&self, trigger: &NewTrigger) -> Result<String>;
}

/// A stored agent file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentFileEntry {
    pub path: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Per-agent file persistence seam (memory tools).
#[async_trait]
pub trait AgentFileStore: Send + Sync {
    /// Create or overwrite a file.
    async fn upsert_file(&self, agent_id: &str, path: &str, content: &str) -> Result<()>;
    /// Fetch a file, or `None` when missing.
    async fn get_file(&self, agent_id: &str, path: &str) -> Result<Option<AgentFileEntry>>;
    /// List files under a path prefix.
    async fn list_files(&self, agent_id: &str, prefix: &str) -> Result<Vec<AgentFileEntry>>;
    /// Delete a file; `false` when it did not exist.
    async fn delete_file(&self, agent_id: &str, path: &str) -> Result<bool>;
}
