//! Autonomous execution — the runner wraps the agent loop for
//! non-interactive invocations (webhooks, triggers, subagents).
//!
//! Every run creates a fresh conversation, enforces the recursion-depth
//! bound, and prepends the autonomous preamble so the model knows no human
//! is present.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use blippy_core::ConversationEvent;
use blippy_store::repositories::{AgentRepo, ConversationRepo};
use blippy_store::Store;
use blippy_tools::DEFAULT_MAX_DEPTH;

use crate::broker::Broker;
use crate::errors::{Result, RuntimeError};
use crate::turn::{AgentLoop, TurnOptions};

/// Prepended to agent system prompts during autonomous runs.
pub const AUTONOMOUS_INSTRUCTIONS: &str = "You are running autonomously without user interaction. A user is NOT present and cannot respond to questions or provide feedback.

CRITICAL: You must complete the task independently:
- Do NOT ask clarifying questions or request user input
- Make reasonable assumptions when details are ambiguous
- Use your available tools to accomplish the task
- If a tool call fails, immediately retry with a corrected approach - do not just explain what you would do
- Keep working until the task is complete or truly impossible
- Only stop with a text response when you have finished the task or cannot proceed

";

/// Configuration of a single autonomous run.
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    pub agent_id: String,
    pub prompt: String,
    /// Agent-to-agent recursion depth; 0 for top-level runs.
    pub depth: u32,
    /// Optional model override.
    pub model: String,
    /// Optional title for the created conversation.
    pub title: String,
}

/// Outcome of an autonomous run.
#[derive(Clone, Debug)]
pub struct RunOutcome {
    pub conversation_id: String,
    pub response: String,
}

/// Executes agent conversations without an interactive caller.
pub struct Runner {
    store: Store,
    broker: Broker,
    agent_loop: Arc<AgentLoop>,
    max_depth: u32,
}

impl Runner {
    /// Create a runner with the default recursion bound.
    pub fn new(store: Store, broker: Broker, agent_loop: Arc<AgentLoop>) -> Self {
        Self { store, broker, agent_loop, max_depth: DEFAULT_MAX_DEPTH }
    }

    /// Run one agent conversation to completion.
    #[instrument(skip_all, fields(agent_id = %opts.agent_id, depth = opts.depth))]
    pub async fn run(&self, cancel: CancellationToken, opts: RunOptions) -> Result<RunOutcome> {
        if opts.depth > self.max_depth {
            return Err(RuntimeError::MaxDepthExceeded {
                depth: opts.depth,
                max: self.max_depth,
            });
        }

        let (agent, conversation) = {
            let conn = self.store.conn()?;
            let agent = AgentRepo::get(&conn, &opts.agent_id)?;
            let conversation = ConversationRepo::create(&conn, &agent.id, &opts.title)?;
            (agent, conversation)
        };

        let _ = self.agent_loop.save_user_message(&conversation.id, &opts.prompt)?;

        // A fresh conversation cannot already be busy, but the gate is the
        // single source of turn exclusivity either way.
        if !self.broker.set_busy(&conversation.id) {
            return Err(RuntimeError::Busy(conversation.id));
        }
        self.broker.publish(&conversation.id, ConversationEvent::TurnStarted);

        let response = self
            .agent_loop
            .run_turn(
                cancel,
                TurnOptions {
                    conversation: conversation.clone(),
                    agent,
                    user_content: opts.prompt.clone(),
                    history: Vec::new(),
                    model_override: opts.model.clone(),
                    extra_instructions: AUTONOMOUS_INSTRUCTIONS.to_owned(),
                    depth: opts.depth,
                },
            )
            .await?;

        info!(conversation_id = %conversation.id, "autonomous run completed");
        Ok(RunOutcome { conversation_id: conversation.id, response })
    }
}
