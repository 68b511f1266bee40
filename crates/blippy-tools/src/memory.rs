//! Memory tools — persistent agent files under the `memories/` prefix.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::{Result, ToolError};
use crate::traits::{AgentFileStore, AgentTool, ToolContext};

const MEMORY_PATH_PREFIX: &str = "memories/";

/// The tool names that mark an agent as memory-enabled.
pub const MEMORY_TOOL_NAMES: &[&str] =
    &["memory_view", "memory_create", "memory_edit", "memory_delete"];

fn memory_path(path: &str) -> String {
    format!("{MEMORY_PATH_PREFIX}{}", path.trim_start_matches('/'))
}

fn strip_memory_prefix(path: &str) -> &str {
    path.strip_prefix(MEMORY_PATH_PREFIX).unwrap_or(path)
}

fn require_agent(ctx: &ToolContext) -> Result<&str> {
    if ctx.agent_id.is_empty() {
        return Err(ToolError::failed("no current agent in context"));
    }
    Ok(&ctx.agent_id)
}

// ─────────────────────────────────────────────────────────────────────────────
// memory_view
// ─────────────────────────────────────────────────────────────────────────────

/// View memory files or list the memory directory.
pub struct MemoryViewTool {
    files: Arc<dyn AgentFileStore>,
}

impl MemoryViewTool {
    pub fn new(files: Arc<dyn AgentFileStore>) -> Self {
        Self { files }
    }
}

#[derive(Deserialize)]
struct ViewArgs {
    #[serde(default)]
    path: String,
}

#[async_trait]
impl AgentTool for MemoryViewTool {
    fn name(&self) -> &str {
        "memory_view"
    }

    fn description(&self) -> String {
        "View your memory files. Without a path (or with a directory path ending in /), lists \
         all files. With a file path, returns the file content."
            .into()
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "File path to view, or directory path (ending in /) to list. Omit to list all memory files."
                }
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let args: ViewArgs = serde_json::from_value(args)?;
        let agent_id = require_agent(ctx)?;

        if args.path.is_empty() || args.path.ends_with('/') {
            let files = self.files.list_files(agent_id, &memory_path(&args.path)).await?;
            if files.is_empty() {
                return Ok("No memory files found.".into());
            }
            let mut out = String::new();
            for file in &files {
                out.push_str(&format!(
                    "- {} (updated: {})\n",
                    strip_memory_prefix(&file.path),
                    file.updated_at
                ));
            }
            return Ok(out);
        }

        match self.files.get_file(agent_id, &memory_path(&args.path)).await? {
            Some(file) => Ok(file.content),
            None => Err(ToolError::failed(format!("file not found: {}", args.path))),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// memory_create
// ─────────────────────────────────────────────────────────────────────────────

/// Create or overwrite a memory file.
pub struct MemoryCreateTool {
    files: Arc<dyn AgentFileStore>,
}

impl MemoryCreateTool {
    pub fn new(files: Arc<dyn AgentFileStore>) -> Self {
        Self { files }
    }
}

#[derive(Deserialize)]
struct CreateArgs {
    #[serde(default)]
    path: String,
    #[serde(default)]
    content: String,
}

#[async_trait]
impl AgentTool for MemoryCreateTool {
    fn name(&self) -> &str {
        "memory_create"
    }

    fn description(&self) -> String {
        "Create or overwrite a memory file. Use this to save information for future reference \
         across conversations. Always update MEMORY.md to reference any new files you create."
            .into()
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "File path (e.g. \"MEMORY.md\", \"projects/acme.md\")"},
                "content": {"type": "string", "description": "The file content to write"}
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let args: CreateArgs = serde_json::from_value(args)?;
        if args.path.is_empty() {
            return Err(ToolError::failed("path is required"));
        }
        if args.content.is_empty() {
            return Err(ToolError::failed("content is required"));
        }
        let agent_id = require_agent(ctx)?;

        self.files.upsert_file(agent_id, &memory_path(&args.path), &args.content).await?;
        Ok(format!("File {} saved.", args.path))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// memory_edit
// ─────────────────────────────────────────────────────────────────────────────

/// Edit a memory file by exact string replacement.
pub struct MemoryEditTool {
    files: Arc<dyn AgentFileStore>,
}

impl MemoryEditTool {
    pub fn new(files: Arc<dyn AgentFileStore>) -> Self {
        Self { files }
    }
}

#[derive(Deserialize)]
struct EditArgs {
    #[serde(default)]
    path: String,
    #[serde(default)]
    old_str: String,
    #[serde(default)]
    new_str: String,
}

#[async_trait]
impl AgentTool for MemoryEditTool {
    fn name(&self) -> &str {
        "memory_edit"
    }

    fn description(&self) -> String {
        "Edit a memory file by replacing a specific string. The old_str must match exactly once \
         in the file."
            .into()
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "File path to edit"},
                "old_str": {"type": "string", "description": "The exact string to find and replace"},
                "new_str": {"type": "string", "description": "The replacement string"}
            },
            "required": ["path", "old_str", "new_str"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let args: EditArgs = serde_json::from_value(args)?;
        if args.path.is_empty() || args.old_str.is_empty() {
            return Err(ToolError::failed("path and old_str are required"));
        }
        let agent_id = require_agent(ctx)?;

        let full_path = memory_path(&args.path);
        let file = self
            .files
            .get_file(agent_id, &full_path)
            .await?
            .ok_or_else(|| ToolError::failed(format!("file not found: {}", args.path)))?;

        let count = file.content.matches(&args.old_str).count();
        if count == 0 {
            return Err(ToolError::failed(format!("old_str not found in {}", args.path)));
        }
        if count > 1 {
            return Err(ToolError::failed(format!(
                "old_str matches {count} times in {} (must match exactly once)",
                args.path
            )));
        }

        let updated = file.content.replacen(&args.old_str, &args.new_str, 1);
        self.files.upsert_file(agent_id, &full_path, &updated).await?;
        Ok(format!("File {} updated.", args.path))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// memory_delete
// ─────────────────────────────────────────────────────────────────────────────

/// Delete a memory file.
pub struct MemoryDeleteTool {
    files: Arc<dyn AgentFileStore>,
}

impl MemoryDeleteTool {
    pub fn new(files: Arc<dyn AgentFileStore>) -> Self {
        Self { files }
    }
}

#[derive(Deserialize)]
struct DeleteArgs {
    #[serde(default)]
    path: String,
}

#[async_trait]
impl AgentTool for MemoryDeleteTool {
    fn name(&self) -> &str {
        "memory_delete"
    }

    fn description(&self) -> String {
        "Delete a memory file.".into()
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "File path to delete"}
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let args: DeleteArgs = serde_json::from_value(args)?;
        if args.path.is_empty() {
            return Err(ToolError::failed("path is required"));
        }
        let agent_id = require_agent(ctx)?;

        if !self.files.delete_file(agent_id, &memory_path(&args.path)).await? {
            return Err(ToolError::failed(format!("file not found: {}", args.path)));
        }
        Ok(format!("File {} deleted.", args.path))
    }
}
