//! Synchronous subagent invocation tool.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::{Result, ToolError};
use crate::traits::{AgentCaller, AgentTool, ToolContext, DEFAULT_MAX_DEPTH};

/// Call another agent and wait for its response.
pub struct CallAgentTool {
    caller: Arc<dyn AgentCaller>,
}

impl CallAgentTool {
    pub fn new(caller: Arc<dyn AgentCaller>) -> Self {
        Self { caller }
    }
}

#[derive(Deserialize)]
struct CallAgentArgs {
    #[serde(default)]
    agent_id: String,
    #[serde(default)]
    prompt: String,
    #[serde(default)]
    model: String,
}

#[async_trait]
impl AgentTool for CallAgentTool {
    fn name(&self) -> &str {
        "call_agent"
    }

    fn description(&self) -> String {
        "Call another agent synchronously and get its response. Use this to delegate tasks to \
         specialized agents."
            .into()
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "agent_id": {
                    "type": "string",
                    "description": "The ID of the agent to call. If omitted, defaults to the current agent."
                },
                "prompt": {
                    "type": "string",
                    "description": "The instruction for the agent"
                },
                "model": {
                    "type": "string",
                    "description": "Optional model override for this agent call"
                }
            },
            "required": ["prompt"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let mut args: CallAgentArgs = serde_json::from_value(args)?;

        if args.agent_id.is_empty() {
            if ctx.agent_id.is_empty() {
                return Err(ToolError::failed("agent_id is required (no current agent in context)"));
            }
            args.agent_id = ctx.agent_id.clone();
        }
        if args.prompt.is_empty() {
            return Err(ToolError::failed("prompt is required"));
        }

        let new_depth = ctx.depth + 1;
        if new_depth > DEFAULT_MAX_DEPTH {
            return Err(ToolError::failed(format!(
                "max agent depth exceeded ({DEFAULT_MAX_DEPTH})"
            )));
        }

        // Runner failures surface as result text so the calling model can
        // adapt rather than abort its own turn.
        match self
            .caller
            .run_agent(
                &args.agent_id,
                &args.prompt,
                new_depth,
                &args.model,
                ctx.cancellation.clone(),
            )
            .await
        {
            Ok(response) => Ok(response),
            Err(e) => Ok(format!("Error calling agent: {e}")),
        }
    }
}
