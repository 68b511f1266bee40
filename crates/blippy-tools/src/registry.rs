//! Tool registry — central index of the static tools.
//!
//! Populated once at startup and read-only thereafter; no locking at
//! steady state. Dynamic tools (`notify:*`, `fs_*`) are synthesized per
//! turn by the executor and never live here.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, ToolError};
use crate::traits::{tool_definition, AgentTool, ToolContext};

/// Central registry mapping tool names to their implementations.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn AgentTool>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { tools: HashMap::new() }
    }

    /// Register a tool. Overwrites any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn AgentTool>) {
        debug!(tool_name = tool.name(), "tool registered");
        let _ = self.tools.insert(tool.name().to_owned(), tool);
    }

    /// Look up a tool by (decoded) name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn AgentTool>> {
        self.tools.get(name).cloned()
    }

    /// Whether a tool with the given name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Provider-facing definitions for the enabled subset, in caller order.
    ///
    /// Unknown names are skipped silently — an agent may reference a tool
    /// that this process was started without (e.g. `bash` with no sandbox
    /// key).
    #[must_use]
    pub fn list(&self, enabled_names: &[String]) -> Vec<Value> {
        enabled_names
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool_definition(tool.as_ref()))
            .collect()
    }

    /// Execute a registered tool by (decoded) name.
    pub async fn execute(&self, name: &str, args: Value, ctx: &ToolContext) -> Result<String> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound { name: name.to_owned() })?;
        tool.execute(args, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    struct EchoTool;

    #[async_trait]
    impl AgentTool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> String {
            "Echoes input".into()
        }
        fn parameters(&self) -> Value {
            serde_json::json!({"type": "object"})
        }
        async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<String> {
            Ok(args.get("text").and_then(Value::as_str).unwrap_or("no text").to_owned())
        }
    }

    struct OtherTool;

    #[async_trait]
    impl AgentTool for OtherTool {
        fn name(&self) -> &str {
            "other"
        }
        fn description(&self) -> String {
            "Other".into()
        }
        fn parameters(&self) -> Value {
            serde_json::json!({"type": "object"})
        }
        async fn execute(&self, _args: Value, _ctx: &ToolContext) -> Result<String> {
            Ok("other".into())
        }
    }

    fn registry() -> ToolRegistry {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        reg.register(Arc::new(OtherTool));
        reg
    }

    #[test]
    fn list_preserves_caller_order_and_skips_unknown() {
        let reg = registry();
        let defs = reg.list(&["other".into(), "missing".into(), "echo".into()]);
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0]["name"], "other");
        assert_eq!(defs[1]["name"], "echo");
    }

    #[tokio::test]
    async fn execute_dispatches() {
        let reg = registry();
        let ctx = ToolContext::default();
        let out = reg
            .execute("echo", serde_json::json!({"text": "hi"}), &ctx)
            .await
            .unwrap();
        assert_eq!(out, "hi");
    }

    #[tokio::test]
    async fn execute_unknown_is_not_found() {
        let reg = registry();
        let ctx = ToolContext::default();
        let err = reg.execute("ghost", serde_json::json!({}), &ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "tool not found: ghost");
    }

    #[test]
    fn register_overwrites_same_name() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        reg.register(Arc::new(EchoTool));
        assert_eq!(reg.list(&["echo".into()]).len(), 1);
    }
}
