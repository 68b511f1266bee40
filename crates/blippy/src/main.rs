//! Blippy server binary — wires the store, tool system, agent loop,
//! runner, scheduler, and HTTP surface together.

#![deny(unsafe_code)]

mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

use blippy_openrouter::OpenRouterClient;
use blippy_runtime::{
    AgentLoop, Broker, Runner, RunnerHandle, Scheduler, StoreAgentFiles, StoreChannelLister,
    StoreRootLister, StoreTriggerCreator,
};
use blippy_server::AppState;
use blippy_store::Store;
use blippy_tools::{
    BashTool, CallAgentTool, FetchTool, MemoryCreateTool, MemoryDeleteTool, MemoryEditTool,
    MemoryViewTool, ScheduleAgentRunTool, ToolExecutor, ToolRegistry,
};

use crate::config::Config;

/// Initialize the global tracing subscriber. `RUST_LOG` overrides the
/// default `info` filter.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();
    let _ = subscriber.try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::from_env()?;

    let store = Store::open(&config.database_path)
        .with_context(|| format!("open database at {}", config.database_path))?;
    let client = Arc::new(OpenRouterClient::new(config.openrouter_api_key.as_str()));

    let channel_lister = Arc::new(StoreChannelLister::new(store.clone()));
    let root_lister = Arc::new(StoreRootLister::new(store.clone()));
    let trigger_creator = Arc::new(StoreTriggerCreator::new(store.clone()));
    let agent_files = Arc::new(StoreAgentFiles::new(store.clone()));
    let runner_handle = Arc::new(RunnerHandle::new());

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(FetchTool::new()));
    if let Some(sprites_api_key) = &config.sprites_api_key {
        registry.register(Arc::new(BashTool::new(sprites_api_key.as_str())));
        info!("bash tool enabled (SPRITES_API_KEY set)");
    }
    registry.register(Arc::new(CallAgentTool::new(runner_handle.clone())));
    registry.register(Arc::new(ScheduleAgentRunTool::new(trigger_creator)));
    registry.register(Arc::new(MemoryViewTool::new(agent_files.clone())));
    registry.register(Arc::new(MemoryCreateTool::new(agent_files.clone())));
    registry.register(Arc::new(MemoryEditTool::new(agent_files.clone())));
    registry.register(Arc::new(MemoryDeleteTool::new(agent_files)));

    let executor = ToolExecutor::new(Arc::new(registry), channel_lister, root_lister);
    let broker = Broker::new();

    let agent_loop = Arc::new(AgentLoop::new(
        store.clone(),
        client.clone(),
        executor,
        broker.clone(),
        config.model.clone(),
    ));
    let runner = Arc::new(Runner::new(store.clone(), broker.clone(), agent_loop.clone()));
    runner_handle.set(runner.clone());

    let scheduler = Scheduler::new(store.clone(), runner.clone());
    scheduler.start();

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        let _signal = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received");
                shutdown.cancel();
            }
        });
    }

    let state = AppState { store, broker, agent_loop, runner, client };
    blippy_server::listen(state, config.port, shutdown.clone()).await?;

    scheduler.stop().await;
    Ok(())
}
