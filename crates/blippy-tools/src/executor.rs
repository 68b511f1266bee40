//! Tool executor — resolves dynamic tools and runs tool calls concurrently.
//!
//! One LLM response may carry several `function_call` items; the executor
//! runs them all in parallel, reports each completion as it lands, and
//! returns continuation inputs ordered by the original call order so the
//! call/output pairing stays stable for the next request.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use blippy_openrouter::{Input, OutputItem};

use crate::errors::{Result, ToolError};
use crate::fs::{build_fs_tool, FS_TOOL_NAMES};
use crate::names::decode_tool_name;
use crate::notification::NotificationTool;
use crate::registry::ToolRegistry;
use crate::traits::{
    tool_definition, AgentFsRootConfig, AgentTool, ChannelLister, FilesystemRoot, RootLister,
    ToolContext,
};

/// One completed tool call, delivered in completion order.
#[derive(Clone, Debug)]
pub struct ToolCompletion {
    /// Provider-assigned function-call ID.
    pub id: String,
    /// Call/output correlation ID.
    pub call_id: String,
    /// Tool name as the model sent it (encoded).
    pub name: String,
    /// Raw JSON arguments.
    pub arguments: String,
    /// Result text (errors already coerced to `"Error: ..."`).
    pub output: String,
}

/// Dispatches tool calls to static and dynamic tools.
#[derive(Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    channels: Arc<dyn ChannelLister>,
    roots: Arc<dyn RootLister>,
}

impl ToolExecutor {
    /// Create an executor over the static registry and the dynamic-tool seams.
    pub fn new(
        registry: Arc<ToolRegistry>,
        channels: Arc<dyn ChannelLister>,
        roots: Arc<dyn RootLister>,
    ) -> Self {
        Self { registry, channels, roots }
    }

    /// Assemble the active tool set for an agent.
    ///
    /// Returns the provider-facing tool definitions plus the per-turn
    /// `{fs tool name → roots}` map the caller must place into the tool
    /// context before running the turn.
    pub async fn tools_for_agent(
        &self,
        enabled_tools: &[String],
        enabled_channels: &[String],
        fs_configs: &[AgentFsRootConfig],
    ) -> Result<(Vec<Value>, HashMap<String, Vec<FilesystemRoot>>)> {
        let mut defs = self.registry.list(enabled_tools);

        if !enabled_channels.is_empty() {
            let channels = self.channels.list_channels_by_ids(enabled_channels).await?;
            for channel in channels {
                let tool = NotificationTool::new(channel);
                defs.push(tool_definition(&tool));
            }
        }

        let mut fs_tool_roots: HashMap<String, Vec<FilesystemRoot>> = HashMap::new();
        if !fs_configs.is_empty() {
            let ids: Vec<String> = fs_configs.iter().map(|c| c.root_id.clone()).collect();
            let roots = self.roots.list_roots_by_ids(&ids).await?;

            for config in fs_configs {
                let Some(root) = roots.iter().find(|r| r.id == config.root_id) else {
                    warn!(root_id = %config.root_id, "enabled filesystem root not found, skipping");
                    continue;
                };
                for tool_name in &config.enabled_tools {
                    if FS_TOOL_NAMES.contains(&tool_name.as_str()) {
                        fs_tool_roots.entry(tool_name.clone()).or_default().push(root.clone());
                    }
                }
            }

            for name in FS_TOOL_NAMES {
                if let Some(roots) = fs_tool_roots.get(*name) {
                    let tool = build_fs_tool(name, roots.clone())
                        .expect("fs tool names are statically known");
                    defs.push(tool_definition(tool.as_ref()));
                }
            }
        }

        Ok((defs, fs_tool_roots))
    }

    /// Execute every `function_call` in a model response concurrently.
    ///
    /// The continuation inputs echo each call (mirroring the model's own
    /// emission, since OpenRouter has no server-side response continuation)
    /// followed by one `function_call_output` per call in the original call
    /// order. `on_result` fires once per call in completion order.
    pub async fn process_output(
        &self,
        ctx: &ToolContext,
        output: &[OutputItem],
        mut on_result: impl FnMut(ToolCompletion),
    ) -> Result<Vec<Input>> {
        let calls: Vec<OutputItem> =
            output.iter().filter(|item| item.is_function_call()).cloned().collect();
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        // Echo the function calls from the model's response first.
        let mut inputs: Vec<Input> = calls
            .iter()
            .map(|call| Input::function_call(&call.id, &call.call_id, &call.name, &call.arguments))
            .collect();

        let mut workers = tokio::task::JoinSet::new();
        for (index, call) in calls.iter().cloned().enumerate() {
            let executor = self.clone();
            let ctx = ctx.clone();
            let _handle = workers.spawn(async move {
                let decoded = decode_tool_name(&call.name);
                debug!(tool = %decoded, call_id = %call.call_id, "tool call started");
                let result = executor.execute_tool(&ctx, &decoded, &call.arguments).await;
                let output = match result {
                    Ok(text) if text.is_empty() => "(no output)".to_owned(),
                    Ok(text) => text,
                    Err(e) => format!("Error: {e}"),
                };
                (index, call, output)
            });
        }

        let mut outputs: Vec<Option<String>> = vec![None; calls.len()];
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((index, call, output)) => {
                    on_result(ToolCompletion {
                        id: call.id.clone(),
                        call_id: call.call_id.clone(),
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                        output: output.clone(),
                    });
                    outputs[index] = Some(output);
                }
                Err(e) => {
                    // A panicked worker loses its index; the fill below keeps
                    // the call/output pairing intact.
                    warn!(error = %e, "tool worker failed");
                }
            }
        }

        for (call, output) in calls.iter().zip(outputs) {
            let output = output.unwrap_or_else(|| "Error: tool execution failed".to_owned());
            inputs.push(Input::function_call_output("", &call.call_id, output));
        }

        Ok(inputs)
    }

    /// Run one tool call by decoded name.
    async fn execute_tool(&self, ctx: &ToolContext, name: &str, raw_args: &str) -> Result<String> {
        let args: Value = if raw_args.is_empty() {
            Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(raw_args)
                .map_err(|e| ToolError::InvalidArguments(e.to_string()))?
        };

        // Dynamic notification channel tools
        if let Some(channel_name) = name.strip_prefix("notify:") {
            return match self.channels.get_channel_by_name(channel_name).await? {
                Some(channel) => NotificationTool::new(channel).execute(args, ctx).await,
                None => Ok(format!("Channel '{channel_name}' not found")),
            };
        }

        // Dynamic filesystem tools resolve against the per-turn root map
        if FS_TOOL_NAMES.contains(&name) {
            let roots = ctx.fs_tool_roots.get(name).cloned().unwrap_or_default();
            if roots.is_empty() {
                return Err(ToolError::NotFound { name: name.to_owned() });
            }
            let tool = build_fs_tool(name, roots).expect("fs tool names are statically known");
            return tool.execute(args, ctx).await;
        }

        self.registry.execute(name, args, ctx).await
    }
}
