//! The agent loop — one turn from user input to a persisted assistant
//! message, interleaving streaming rounds with concurrent tool execution.
//!
//! A turn opens a streaming request and consumes it round by round: text
//! deltas accumulate and fan out live; a `response` object finalizes the
//! round's model output and hands its function calls to the executor; if
//! tools ran, their continuation inputs are appended and a fresh stream is
//! opened. Finalization persists the assistant message, generates the
//! conversation title on the first completed turn, and updates the
//! conversation row. The busy flag is cleared on every exit path.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use blippy_core::{plain_text, ConversationEvent, Item, MessageId};
use blippy_openrouter::{Input, OpenRouterClient, OutputItem, ResponseRequest};
use blippy_store::repositories::{AgentFileRepo, ConversationRepo, CreateMessageParams, MessageRepo};
use blippy_store::rows::{AgentRow, ConversationRow, MessageRow};
use blippy_store::Store;
use blippy_tools::{
    decode_tool_name, AgentFsRootConfig, FilesystemRoot, ToolContext, ToolExecutor,
    MEMORY_TOOL_NAMES,
};

use crate::broker::Broker;
use crate::errors::{Result, RuntimeError};
use crate::history::build_history_inputs;

const MEMORY_GUIDANCE: &str = "## Memory\n\
You have persistent memory across conversations via memory tools.\n\
MEMORY.md is your index file — it is loaded here at the start of every conversation.\n\
Keep MEMORY.md concise and use it to reference detailed topic files (e.g. projects/acme.md).\n\
Always update MEMORY.md when you create or delete other memory files.\n\n";

/// Configuration of a single agent turn.
pub struct TurnOptions {
    pub conversation: ConversationRow,
    pub agent: AgentRow,
    pub user_content: String,
    /// Prior messages in chronological order; empty for fresh conversations.
    pub history: Vec<MessageRow>,
    /// Overrides the agent's model when non-empty.
    pub model_override: String,
    /// Prepended to the system prompt (autonomous runs).
    pub extra_instructions: String,
    /// Agent-to-agent recursion depth.
    pub depth: u32,
}

/// Clears the busy flag when the turn's task exits, whatever the path.
struct BusyGuard {
    broker: Broker,
    topic: String,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.broker.clear_busy(&self.topic);
    }
}

/// Executes the agentic LLM loop, publishing events to the broker.
pub struct AgentLoop {
    store: Store,
    client: Arc<OpenRouterClient>,
    executor: ToolExecutor,
    broker: Broker,
    default_model: String,
}

impl AgentLoop {
    /// Create the loop over its collaborators.
    pub fn new(
        store: Store,
        client: Arc<OpenRouterClient>,
        executor: ToolExecutor,
        broker: Broker,
        default_model: impl Into<String>,
    ) -> Self {
        Self { store, client, executor, broker, default_model: default_model.into() }
    }

    /// The process-default model name.
    #[must_use]
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Persist a user message and publish its `MessageDone`.
    ///
    /// Called before the turn task starts so the caller can hand the
    /// message ID to the client synchronously.
    pub fn save_user_message(&self, conversation_id: &str, content: &str) -> Result<String> {
        let items = vec![Item::text(content)];
        let items_json = serde_json::to_string(&items)?;
        let message_id = MessageId::new().into_inner();
        let created_at = Utc::now().to_rfc3339();

        {
            let conn = self.store.conn()?;
            let _ = MessageRepo::create(
                &conn,
                &CreateMessageParams {
                    id: message_id.clone(),
                    conversation_id: conversation_id.to_owned(),
                    role: "user".into(),
                    items_json: items_json.clone(),
                    created_at: created_at.clone(),
                },
            )?;
        }

        self.broker.publish(
            conversation_id,
            ConversationEvent::MessageDone {
                message_id: message_id.clone(),
                role: "user".into(),
                items_json,
                created_at,
            },
        );

        Ok(message_id)
    }

    /// Run one turn to completion, returning the assistant's text response.
    ///
    /// The caller must have set the busy flag (and usually published
    /// `TurnStarted`); this method clears it on every exit path.
    pub async fn run_turn(&self, cancel: CancellationToken, opts: TurnOptions) -> Result<String> {
        let conversation_id = opts.conversation.id.clone();
        let _busy = BusyGuard { broker: self.broker.clone(), topic: conversation_id.clone() };

        let (request, fs_tool_roots) = match self.prepare_turn(&opts).await {
            Ok(prepared) => prepared,
            Err(e) => {
                self.publish_failure(&conversation_id, &e);
                return Err(e);
            }
        };

        let ctx = ToolContext {
            conversation_id: conversation_id.clone(),
            agent_id: opts.conversation.agent_id.clone(),
            depth: opts.depth,
            forwarded_env_vars: parse_string_list(&opts.agent.forwarded_host_env_vars_json),
            fs_tool_roots,
            cancellation: cancel.clone(),
        };

        match self
            .run_rounds(&ctx, &cancel, &opts.conversation, request, &opts.user_content)
            .await
        {
            Ok(response) => Ok(response),
            Err(e) => {
                self.publish_failure(&conversation_id, &e);
                Err(e)
            }
        }
    }

    fn publish_failure(&self, conversation_id: &str, error: &RuntimeError) {
        self.broker
            .publish(conversation_id, ConversationEvent::Error { message: error.to_string() });
        self.broker.publish(conversation_id, ConversationEvent::turn_done());
    }

    /// Build the provider request and the per-turn fs-root map.
    async fn prepare_turn(
        &self,
        opts: &TurnOptions,
    ) -> Result<(ResponseRequest, HashMap<String, Vec<FilesystemRoot>>)> {
        let enabled_tools = parse_string_list(&opts.agent.enabled_tools_json);
        let enabled_channels = parse_string_list(&opts.agent.enabled_notification_channels_json);
        let fs_configs = parse_fs_configs(&opts.agent.enabled_filesystem_roots_json);

        let (tools, fs_tool_roots) = self
            .executor
            .tools_for_agent(&enabled_tools, &enabled_channels, &fs_configs)
            .await?;

        // Model resolution: override > agent > process default
        let model = if !opts.model_override.is_empty() {
            opts.model_override.clone()
        } else if !opts.agent.model.is_empty() {
            opts.agent.model.clone()
        } else {
            self.default_model.clone()
        };

        let mut inputs = Vec::new();
        for msg in &opts.history {
            inputs.extend(build_history_inputs(msg));
        }
        inputs.push(Input::user_message(&opts.user_content));

        let memory_section =
            if enabled_tools.iter().any(|t| MEMORY_TOOL_NAMES.contains(&t.as_str())) {
                self.memory_section(&opts.agent.id)
            } else {
                String::new()
            };

        let instructions =
            format!("{}{}{}", opts.extra_instructions, memory_section, opts.agent.system_prompt);

        Ok((ResponseRequest { model, input: inputs, instructions, tools, ..Default::default() },
            fs_tool_roots))
    }

    /// The memory usage note plus the current MEMORY.md index, if present.
    fn memory_section(&self, agent_id: &str) -> String {
        let mut section = MEMORY_GUIDANCE.to_owned();
        if let Ok(conn) = self.store.conn() {
            if let Ok(file) = AgentFileRepo::get(&conn, agent_id, "memories/MEMORY.md") {
                section.push_str("### MEMORY.md\n");
                section.push_str(&file.content);
                section.push_str("\n\n");
            }
        }
        section
    }

    /// Drive streaming rounds until the model stops calling tools.
    async fn run_rounds(
        &self,
        ctx: &ToolContext,
        cancel: &CancellationToken,
        conv: &ConversationRow,
        mut request: ResponseRequest,
        user_content: &str,
    ) -> Result<String> {
        let mut items: Vec<Item> = Vec::new();
        let mut last_processed_response = String::new();
        let mut round = 0u32;

        'rounds: loop {
            round += 1;
            debug!(conversation_id = %conv.id, round, "opening stream");
            let (mut events, mut errs) = self.client.create_response_stream(&request, cancel.clone());
            let mut current_text = String::new();
            let mut response_id = String::new();
            let mut errs_open = true;

            loop {
                tokio::select! {
                    biased;

                    () = cancel.cancelled() => return Err(RuntimeError::Cancelled),

                    err = errs.recv(), if errs_open => match err {
                        Some(e) => return Err(RuntimeError::Stream(e)),
                        None => errs_open = false,
                    },

                    event = events.recv() => {
                        let Some(event) = event else {
                            // End of stream with no pending function calls
                            if !current_text.is_empty() {
                                items.push(Item::text(current_text));
                            }
                            return self.finish_turn(conv, user_content, items, &response_id).await;
                        };

                        if event.is_text_delta() {
                            current_text.push_str(&event.delta);
                            self.broker.publish(
                                &conv.id,
                                ConversationEvent::TextDelta { content: event.delta.clone() },
                            );
                        }

                        if let Some(response) = event.response {
                            // The response object is authoritative for this
                            // round's tool calls; a re-emitted object with the
                            // same id must not be double-processed.
                            if !response.id.is_empty() && response.id == last_processed_response {
                                continue;
                            }
                            response_id = response.id.clone();
                            last_processed_response = response.id.clone();

                            if response.output.iter().any(OutputItem::is_function_call) {
                                // Snapshot the accumulated text before the
                                // tool results append behind it.
                                if !current_text.is_empty() {
                                    items.push(Item::text(std::mem::take(&mut current_text)));
                                }

                                let broker = &self.broker;
                                let conv_id = conv.id.as_str();
                                let round_items = &mut items;
                                let continuation = self
                                    .executor
                                    .process_output(ctx, &response.output, |completion| {
                                        let name = decode_tool_name(&completion.name);
                                        round_items.push(Item::ToolExecution {
                                            name: name.clone(),
                                            input: completion.arguments.clone(),
                                            result: completion.output.clone(),
                                            id: some_nonempty(&completion.id),
                                            call_id: some_nonempty(&completion.call_id),
                                        });
                                        broker.publish(conv_id, ConversationEvent::ToolResult {
                                            name,
                                            input: completion.arguments,
                                            result: completion.output,
                                        });
                                    })
                                    .await?;

                                request.input.extend(continuation);
                                continue 'rounds;
                            }
                        }
                    }
                }
            }
        }
    }

    /// Persist the assistant message, title the conversation, and close the
    /// turn.
    async fn finish_turn(
        &self,
        conv: &ConversationRow,
        user_content: &str,
        items: Vec<Item>,
        response_id: &str,
    ) -> Result<String> {
        if items.is_empty() {
            self.broker.publish(&conv.id, ConversationEvent::turn_done());
            return Ok(String::new());
        }

        let items_json = serde_json::to_string(&items)?;
        let message_id = MessageId::new().into_inner();
        let created_at = Utc::now().to_rfc3339();

        {
            let conn = self.store.conn()?;
            let _ = MessageRepo::create(
                &conn,
                &CreateMessageParams {
                    id: message_id.clone(),
                    conversation_id: conv.id.clone(),
                    role: "assistant".into(),
                    items_json: items_json.clone(),
                    created_at: created_at.clone(),
                },
            )?;
        }

        self.broker.publish(
            &conv.id,
            ConversationEvent::MessageDone {
                message_id,
                role: "assistant".into(),
                items_json,
                created_at,
            },
        );

        // First completed turn generates the title; failure is non-fatal.
        let mut title = String::new();
        if conv.title.is_empty() && !user_content.is_empty() {
            match self
                .client
                .generate_title(&self.default_model, user_content, &plain_text(&items))
                .await
            {
                Ok(generated) => title = generated,
                Err(e) => {
                    warn!(conversation_id = %conv.id, error = %e, "failed to generate title");
                }
            }
        }

        if !response_id.is_empty() || !title.is_empty() {
            let new_title = if title.is_empty() { conv.title.clone() } else { title.clone() };
            let now = Utc::now().to_rfc3339();
            let conn = self.store.conn()?;
            let _ = ConversationRepo::update_turn(&conn, &conv.id, &new_title, response_id, &now)?;
        }

        info!(conversation_id = %conv.id, items = items.len(), "turn completed");
        self.broker.publish(&conv.id, ConversationEvent::TurnDone { title });

        Ok(plain_text(&items))
    }
}

fn some_nonempty(s: &str) -> Option<String> {
    if s.is_empty() { None } else { Some(s.to_owned()) }
}

fn parse_string_list(json: &str) -> Vec<String> {
    if json.is_empty() {
        return Vec::new();
    }
    serde_json::from_str(json).unwrap_or_default()
}

fn parse_fs_configs(json: &str) -> Vec<AgentFsRootConfig> {
    #[derive(Deserialize)]
    struct StoredFsRoot {
        #[serde(default)]
        root_id: String,
        #[serde(default)]
        enabled_tools: Vec<String>,
    }

    if json.is_empty() {
        return Vec::new();
    }
    let stored: Vec<StoredFsRoot> = serde_json::from_str(json).unwrap_or_default();
    stored
        .into_iter()
        .map(|r| AgentFsRootConfig { root_id: r.root_id, enabled_tools: r.enabled_tools })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
