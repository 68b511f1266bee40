//! Trigger scheduler — ticks persisted triggers into runner invocations.
//!
//! On start the scheduler resyncs every cron trigger's `next_run_at` to the
//! strict next occurrence, then ticks on a fixed period. Due triggers run
//! serially within a tick, each wrapped in a `trigger_runs` audit row. Cron
//! triggers advance; one-shots are deleted whatever the outcome.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use croner::Cron;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use blippy_store::repositories::{TriggerRepo, TriggerRunRepo};
use blippy_store::rows::TriggerRow;
use blippy_store::Store;

use crate::errors::{Result, RuntimeError};
use crate::runner::{RunOptions, Runner};

/// Tick period.
const TICK_INTERVAL: Duration = Duration::from_secs(10);

/// Compute the strict next occurrence of a 5-field cron expression.
pub fn next_cron_occurrence(expr: &str, after: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let cron = Cron::new(expr)
        .parse()
        .map_err(|e| RuntimeError::InvalidCron(e.to_string()))?;
    cron.find_next_occurrence(&after, false)
        .map_err(|e| RuntimeError::InvalidCron(e.to_string()))
}

struct SchedulerInner {
    store: Store,
    runner: Arc<Runner>,
    tick_interval: Duration,
    cancel: CancellationToken,
}

/// Owns the tick loop and its stop signal.
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Create a scheduler with the production tick period.
    pub fn new(store: Store, runner: Arc<Runner>) -> Self {
        Self::with_interval(store, runner, TICK_INTERVAL)
    }

    /// Create a scheduler with a custom tick period (tests).
    pub fn with_interval(store: Store, runner: Arc<Runner>, tick_interval: Duration) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                store,
                runner,
                tick_interval,
                cancel: CancellationToken::new(),
            }),
            handle: Mutex::new(None),
        }
    }

    /// Spawn the tick loop.
    pub fn start(&self) {
        let inner = self.inner.clone();
        let handle = tokio::spawn(async move { inner.run().await });
        *self.handle.lock() = Some(handle);
    }

    /// Signal the tick loop to stop and wait for it to exit.
    pub async fn stop(&self) {
        self.inner.cancel.cancel();
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl SchedulerInner {
    async fn run(&self) {
        if let Err(e) = self.resync_cron() {
            error!(error = %e, "failed to sync cron triggers on startup");
        }

        let mut interval = tokio::time::interval(self.tick_interval);
        // The first tick fires immediately; skip it so due triggers are
        // picked up one period after start, matching the tick contract.
        let _ = interval.tick().await;

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    info!("scheduler stopped");
                    return;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        error!(error = %e, "scheduler tick error");
                    }
                }
            }
        }
    }

    /// Reset every cron trigger's `next_run_at` to the next occurrence.
    fn resync_cron(&self) -> Result<()> {
        let conn = self.store.conn()?;
        let triggers = TriggerRepo::list_all(&conn)?;
        let now = Utc::now();

        for trigger in triggers {
            let Some(expr) = trigger.cron_expr.as_deref().filter(|e| !e.is_empty()) else {
                continue;
            };
            match next_cron_occurrence(expr, now) {
                Ok(next) => {
                    if let Err(e) =
                        TriggerRepo::update_next_run(&conn, &trigger.id, Some(&next.to_rfc3339()))
                    {
                        error!(trigger_id = %trigger.id, error = %e, "failed to update trigger next run");
                    }
                }
                Err(e) => {
                    warn!(trigger_id = %trigger.id, cron_expr = expr, error = %e, "invalid cron expression");
                }
            }
        }

        Ok(())
    }

    async fn tick(&self) -> Result<()> {
        let due = {
            let conn = self.store.conn()?;
            TriggerRepo::list_due(&conn, &Utc::now().to_rfc3339())?
        };

        for trigger in due {
            if self.cancel.is_cancelled() {
                return Ok(());
            }
            if let Err(e) = self.execute_trigger(&trigger).await {
                error!(trigger_id = %trigger.id, error = %e, "failed to execute trigger");
            }
        }

        Ok(())
    }

    async fn execute_trigger(&self, trigger: &TriggerRow) -> Result<()> {
        let run = {
            let conn = self.store.conn()?;
            TriggerRunRepo::create(&conn, &trigger.id, &Utc::now().to_rfc3339())?
        };

        let outcome = self
            .runner
            .run(
                self.cancel.child_token(),
                RunOptions {
                    agent_id: trigger.agent_id.clone(),
                    prompt: trigger.prompt.clone(),
                    depth: 0,
                    model: trigger.model.clone(),
                    title: trigger.conversation_title.clone(),
                },
            )
            .await;

        let finished_at = Utc::now().to_rfc3339();
        let (status, error_message, conversation_id) = match &outcome {
            Ok(result) => ("completed", None, Some(result.conversation_id.as_str())),
            Err(e) => ("failed", Some(e.to_string()), None),
        };
        {
            let conn = self.store.conn()?;
            if let Err(e) = TriggerRunRepo::finish(
                &conn,
                &run.id,
                status,
                error_message.as_deref(),
                conversation_id,
                &finished_at,
            ) {
                error!(run_id = %run.id, error = %e, "failed to update trigger run");
            }
        }

        if trigger.is_cron() {
            let expr = trigger.cron_expr.as_deref().unwrap_or_default();
            match next_cron_occurrence(expr, Utc::now()) {
                Ok(next) => {
                    let conn = self.store.conn()?;
                    if let Err(e) =
                        TriggerRepo::update_next_run(&conn, &trigger.id, Some(&next.to_rfc3339()))
                    {
                        error!(trigger_id = %trigger.id, error = %e, "failed to update trigger next run");
                    }
                }
                Err(e) => {
                    error!(trigger_id = %trigger.id, error = %e, "failed to parse cron expression");
                }
            }
        } else {
            // One-shot: delete regardless of outcome.
            let conn = self.store.conn()?;
            if let Err(e) = TriggerRepo::delete(&conn, &trigger.id) {
                error!(trigger_id = %trigger.id, error = %e, "failed to delete one-shot trigger");
            }
        }

        if let Ok(result) = outcome {
            info!(
                trigger_id = %trigger.id,
                run_id = %run.id,
                conversation_id = %result.conversation_id,
                "trigger execution completed"
            );
        }

        Ok(())
    }
}
