//! Store-backed implementations of the tool-system seams.
//!
//! Tools reach persistence and the runner only through the narrow traits in
//! `blippy-tools`; these adapters bind them to the `SQLite` store and the
//! runner without giving tools a direct dependency on either.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use blippy_store::repositories::{
    AgentFileRepo, ChannelRepo, CreateTriggerParams, RootRepo, TriggerRepo,
};
use blippy_store::Store;
use blippy_tools::{
    AgentCaller, AgentFileEntry, AgentFileStore, ChannelLister, FilesystemRoot, NewTrigger,
    NotificationChannel, Result as ToolResult, RootLister, ToolError, TriggerCreator,
};

use crate::runner::{RunOptions, Runner};

fn store_err(e: blippy_store::StoreError) -> ToolError {
    ToolError::failed(e.to_string())
}

/// Notification channel lookups over the store.
pub struct StoreChannelLister {
    store: Store,
}

impl StoreChannelLister {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ChannelLister for StoreChannelLister {
    async fn list_channels_by_ids(&self, ids: &[String]) -> ToolResult<Vec<NotificationChannel>> {
        let conn = self.store.conn().map_err(store_err)?;
        let rows = ChannelRepo::list_by_ids(&conn, ids).map_err(store_err)?;
        Ok(rows
            .into_iter()
            .map(|row| NotificationChannel {
                id: row.id,
                name: row.name,
                description: row.description,
                json_schema: row.json_schema_json,
                channel_type: row.channel_type,
                config: row.config_json,
            })
            .collect())
    }

    async fn get_channel_by_name(&self, name: &str) -> ToolResult<Option<NotificationChannel>> {
        let conn = self.store.conn().map_err(store_err)?;
        match ChannelRepo::get_by_name(&conn, name) {
            Ok(row) => Ok(Some(NotificationChannel {
                id: row.id,
                name: row.name,
                description: row.description,
                json_schema: row.json_schema_json,
                channel_type: row.channel_type,
                config: row.config_json,
            })),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(store_err(e)),
        }
    }
}

/// Filesystem root lookups over the store.
pub struct StoreRootLister {
    store: Store,
}

impl StoreRootLister {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RootLister for StoreRootLister {
    async fn list_roots_by_ids(&self, ids: &[String]) -> ToolResult<Vec<FilesystemRoot>> {
        let conn = self.store.conn().map_err(store_err)?;
        let rows = RootRepo::list_by_ids(&conn, ids).map_err(store_err)?;
        Ok(rows
            .into_iter()
            .map(|row| FilesystemRoot {
                id: row.id,
                name: row.name,
                path: row.path,
                description: row.description,
            })
            .collect())
    }
}

/// Trigger creation over the store (for `schedule_agent_run`).
pub struct StoreTriggerCreator {
    store: Store,
}

impl StoreTriggerCreator {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TriggerCreator for StoreTriggerCreator {
    async fn create_trigger(&self, trigger: &NewTrigger) -> ToolResult<String> {
        let conn = self.store.conn().map_err(store_err)?;
        let row = TriggerRepo::create(
            &conn,
            &CreateTriggerParams {
                agent_id: trigger.agent_id.clone(),
                name: trigger.name.clone(),
                prompt: trigger.prompt.clone(),
                cron_expr: trigger.cron_expr.clone(),
                next_run_at: Some(trigger.next_run_at.to_rfc3339()),
                model: trigger.model.clone(),
                conversation_title: String::new(),
            },
        )
        .map_err(store_err)?;
        Ok(row.id)
    }
}

/// Agent file persistence over the store (for the memory tools).
pub struct StoreAgentFiles {
    store: Store,
}

impl StoreAgentFiles {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AgentFileStore for StoreAgentFiles {
    async fn upsert_file(&self, agent_id: &str, path: &str, content: &str) -> ToolResult<()> {
        let conn = self.store.conn().map_err(store_err)?;
        let _ = AgentFileRepo::upsert(&conn, agent_id, path, content).map_err(store_err)?;
        Ok(())
    }

    async fn get_file(&self, agent_id: &str, path: &str) -> ToolResult<Option<AgentFileEntry>> {
        let conn = self.store.conn().map_err(store_err)?;
        match AgentFileRepo::get(&conn, agent_id, path) {
            Ok(row) => Ok(Some(AgentFileEntry {
                path: row.path,
                content: row.content,
                created_at: row.created_at,
                updated_at: row.updated_at,
            })),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(store_err(e)),
        }
    }

    async fn list_files(&self, agent_id: &str, prefix: &str) -> ToolResult<Vec<AgentFileEntry>> {
        let conn = self.store.conn().map_err(store_err)?;
        let rows = AgentFileRepo::list_by_prefix(&conn, agent_id, prefix).map_err(store_err)?;
        Ok(rows
            .into_iter()
            .map(|row| AgentFileEntry {
                path: row.path,
                content: row.content,
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
            .collect())
    }

    async fn delete_file(&self, agent_id: &str, path: &str) -> ToolResult<bool> {
        let conn = self.store.conn().map_err(store_err)?;
        match AgentFileRepo::delete(&conn, agent_id, path) {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(store_err(e)),
        }
    }
}

/// Late-bound runner handle implementing the subagent-calling seam.
///
/// The registry is built before the runner exists (the runner needs the
/// loop, which needs the executor, which needs the registry), so the
/// `call_agent` tool holds this handle and the binary sets the runner once
/// wiring completes.
#[derive(Default)]
pub struct RunnerHandle {
    inner: RwLock<Option<Arc<Runner>>>,
}

impl RunnerHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the runner. Called once at startup.
    pub fn set(&self, runner: Arc<Runner>) {
        *self.inner.write() = Some(runner);
    }
}

#[async_trait]
impl AgentCaller for RunnerHandle {
    async fn run_agent(
        &self,
        agent_id: &str,
        prompt: &str,
        depth: u32,
        model: &str,
        cancel: CancellationToken,
    ) -> ToolResult<String> {
        let runner = self
            .inner
            .read()
            .clone()
            .ok_or_else(|| ToolError::failed("agent runner not initialized"))?;

        let outcome = runner
            .run(
                cancel,
                RunOptions {
                    agent_id: agent_id.to_owned(),
                    prompt: prompt.to_owned(),
                    depth,
                    model: model.to_owned(),
                    title: String::new(),
                },
            )
            .await
            .map_err(|e| ToolError::failed(e.to_string()))?;
        Ok(outcome.response)
    }
}
