//! Future-run scheduling tool.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use croner::Cron;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::{Result, ToolError};
use crate::traits::{AgentTool, NewTrigger, ToolContext, TriggerCreator};

/// Schedule a one-time or recurring agent run by creating a trigger.
pub struct ScheduleAgentRunTool {
    creator: Arc<dyn TriggerCreator>,
}

impl ScheduleAgentRunTool {
    pub fn new(creator: Arc<dyn TriggerCreator>) -> Self {
        Self { creator }
    }
}

#[derive(Deserialize)]
struct ScheduleArgs {
    #[serde(default)]
    prompt: String,
    #[serde(default)]
    delay: String,
    #[serde(default)]
    cron: String,
    #[serde(default)]
    agent_id: String,
    #[serde(default)]
    model: String,
}

#[async_trait]
impl AgentTool for ScheduleAgentRunTool {
    fn name(&self) -> &str {
        "schedule_agent_run"
    }

    fn description(&self) -> String {
        "Schedule a future agent run. Use delay for one-time runs (e.g., '1h', '30m') or cron \
         for recurring (e.g., '0 9 * * *' for daily at 9am)."
            .into()
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "The instruction for the scheduled run"
                },
                "delay": {
                    "type": "string",
                    "description": "Delay before running (e.g., '1h', '30m', '24h'). Mutually exclusive with cron."
                },
                "cron": {
                    "type": "string",
                    "description": "Cron expression for recurring runs (e.g., '0 9 * * *'). Mutually exclusive with delay."
                },
                "agent_id": {
                    "type": "string",
                    "description": "Agent to run. Defaults to current agent if not specified."
                },
                "model": {
                    "type": "string",
                    "description": "Optional model override for the scheduled run"
                }
            },
            "required": ["prompt"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let args: ScheduleArgs = serde_json::from_value(args)?;

        if args.prompt.is_empty() {
            return Err(ToolError::failed("prompt is required"));
        }
        if !args.delay.is_empty() && !args.cron.is_empty() {
            return Err(ToolError::failed("delay and cron are mutually exclusive"));
        }
        if args.delay.is_empty() && args.cron.is_empty() {
            return Err(ToolError::failed("either delay or cron must be specified"));
        }

        let agent_id = if args.agent_id.is_empty() {
            if ctx.agent_id.is_empty() {
                return Err(ToolError::failed("agent_id is required (no current agent in context)"));
            }
            ctx.agent_id.clone()
        } else {
            args.agent_id
        };

        let (next_run_at, cron_expr) = if !args.delay.is_empty() {
            let duration = humantime::parse_duration(&args.delay)
                .map_err(|e| ToolError::failed(format!("invalid delay format: {e}")))?;
            if duration.is_zero() {
                return Err(ToolError::failed("delay must be positive"));
            }
            let duration = chrono::Duration::from_std(duration)
                .map_err(|e| ToolError::failed(format!("invalid delay format: {e}")))?;
            (Utc::now() + duration, None)
        } else {
            let cron = Cron::new(&args.cron)
                .parse()
                .map_err(|e| ToolError::failed(format!("invalid cron expression: {e}")))?;
            let next = cron
                .find_next_occurrence(&Utc::now(), false)
                .map_err(|e| ToolError::failed(format!("invalid cron expression: {e}")))?;
            (next, Some(args.cron.clone()))
        };

        let name = truncate(&args.prompt, 50);
        let trigger_id = self
            .creator
            .create_trigger(&NewTrigger {
                agent_id,
                name,
                prompt: args.prompt,
                cron_expr: cron_expr.clone(),
                next_run_at,
                model: args.model,
            })
            .await
            .map_err(|e| ToolError::failed(format!("create trigger: {e}")))?;

        let when = next_run_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        if cron_expr.is_some() {
            Ok(format!("Scheduled recurring run (trigger {trigger_id}). Next run at {when}."))
        } else {
            Ok(format!("Scheduled one-time run (trigger {trigger_id}) at {when}."))
        }
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_owned();
    }
    let prefix: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{prefix}...")
}
