//! Trigger and trigger-run repositories.

use blippy_core::{TriggerId, TriggerRunId};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::errors::{Result, StoreError};
use crate::rows::{TriggerRow, TriggerRunRow};

/// Fields for creating a trigger.
#[derive(Clone, Debug, Default)]
pub struct CreateTriggerParams {
    pub agent_id: String,
    pub name: String,
    pub prompt: String,
    /// Cron expression for recurring triggers; `None` marks a one-shot.
    pub cron_expr: Option<String>,
    pub next_run_at: Option<String>,
    pub model: String,
    pub conversation_title: String,
}

/// Fields for updating a trigger from the CRUD surface.
#[derive(Clone, Debug, Default)]
pub struct UpdateTriggerParams {
    pub name: String,
    pub prompt: String,
    pub cron_expr: Option<String>,
    pub enabled: bool,
    pub next_run_at: Option<String>,
    pub model: String,
    pub conversation_title: String,
}

fn map_trigger(row: &Row<'_>) -> rusqlite::Result<TriggerRow> {
    Ok(TriggerRow {
        id: row.get(0)?,
        agent_id: row.get(1)?,
        name: row.get(2)?,
        prompt: row.get(3)?,
        cron_expr: row.get(4)?,
        enabled: row.get::<_, i64>(5)? != 0,
        next_run_at: row.get(6)?,
        model: row.get(7)?,
        conversation_title: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn map_run(row: &Row<'_>) -> rusqlite::Result<TriggerRunRow> {
    Ok(TriggerRunRow {
        id: row.get(0)?,
        trigger_id: row.get(1)?,
        conversation_id: row.get(2)?,
        status: row.get(3)?,
        error_message: row.get(4)?,
        started_at: row.get(5)?,
        finished_at: row.get(6)?,
    })
}

const TRIGGER_COLUMNS: &str = "id, agent_id, name, prompt, cron_expr, enabled, next_run_at, \
     model, conversation_title, created_at, updated_at";

const RUN_COLUMNS: &str =
    "id, trigger_id, conversation_id, status, error_message, started_at, finished_at";

/// Trigger repository.
pub struct TriggerRepo;

impl TriggerRepo {
    /// Create a trigger, enabled by default.
    pub fn create(conn: &Connection, params: &CreateTriggerParams) -> Result<TriggerRow> {
        let id = TriggerId::new().into_inner();
        let now = chrono::Utc::now().to_rfc3339();
        let _ = conn.execute(
            "INSERT INTO triggers (id, agent_id, name, prompt, cron_expr, enabled, next_run_at,
             model, conversation_title, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?7, ?8, ?9, ?9)",
            params![
                id,
                params.agent_id,
                params.name,
                params.prompt,
                params.cron_expr,
                params.next_run_at,
                params.model,
                params.conversation_title,
                now,
            ],
        )?;
        Self::get(conn, &id)
    }

    /// Fetch a trigger by ID.
    pub fn get(conn: &Connection, id: &str) -> Result<TriggerRow> {
        conn.query_row(
            &format!("SELECT {TRIGGER_COLUMNS} FROM triggers WHERE id = ?1"),
            params![id],
            map_trigger,
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found("trigger", id))
    }

    /// List every trigger (used by the scheduler's cron resync).
    pub fn list_all(conn: &Connection) -> Result<Vec<TriggerRow>> {
        let mut stmt =
            conn.prepare(&format!("SELECT {TRIGGER_COLUMNS} FROM triggers ORDER BY created_at"))?;
        let rows = stmt.query_map([], map_trigger)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// List enabled triggers whose `next_run_at` is due, oldest first.
    pub fn list_due(conn: &Connection, now: &str) -> Result<Vec<TriggerRow>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {TRIGGER_COLUMNS} FROM triggers
             WHERE enabled = 1 AND next_run_at IS NOT NULL AND next_run_at <= ?1
             ORDER BY next_run_at ASC"
        ))?;
        let rows = stmt.query_map(params![now], map_trigger)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Overwrite a trigger's mutable fields.
    pub fn update(conn: &Connection, id: &str, params: &UpdateTriggerParams) -> Result<TriggerRow> {
        let now = chrono::Utc::now().to_rfc3339();
        let changed = conn.execute(
            "UPDATE triggers SET name = ?1, prompt = ?2, cron_expr = ?3, enabled = ?4,
             next_run_at = ?5, model = ?6, conversation_title = ?7, updated_at = ?8
             WHERE id = ?9",
            params![
                params.name,
                params.prompt,
                params.cron_expr,
                i64::from(params.enabled),
                params.next_run_at,
                params.model,
                params.conversation_title,
                now,
                id,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("trigger", id));
        }
        Self::get(conn, id)
    }

    /// Advance a trigger's next run time.
    pub fn update_next_run(conn: &Connection, id: &str, next_run_at: Option<&str>) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let changed = conn.execute(
            "UPDATE triggers SET next_run_at = ?1, updated_at = ?2 WHERE id = ?3",
            params![next_run_at, now, id],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("trigger", id));
        }
        Ok(())
    }

    /// Delete a trigger (one-shots after execution, or via the CRUD surface).
    pub fn delete(conn: &Connection, id: &str) -> Result<()> {
        let changed = conn.execute("DELETE FROM triggers WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::not_found("trigger", id));
        }
        Ok(())
    }
}

/// Trigger-run audit repository.
pub struct TriggerRunRepo;

impl TriggerRunRepo {
    /// Insert a `running` audit row at execution start.
    pub fn create(conn: &Connection, trigger_id: &str, started_at: &str) -> Result<TriggerRunRow> {
        let id = TriggerRunId::new().into_inner();
        let _ = conn.execute(
            "INSERT INTO trigger_runs (id, trigger_id, status, started_at)
             VALUES (?1, ?2, 'running', ?3)",
            params![id, trigger_id, started_at],
        )?;
        Self::get(conn, &id)
    }

    /// Fetch a run by ID.
    pub fn get(conn: &Connection, id: &str) -> Result<TriggerRunRow> {
        conn.query_row(
            &format!("SELECT {RUN_COLUMNS} FROM trigger_runs WHERE id = ?1"),
            params![id],
            map_run,
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found("trigger_run", id))
    }

    /// Record the terminal outcome of a run.
    pub fn finish(
        conn: &Connection,
        id: &str,
        status: &str,
        error_message: Option<&str>,
        conversation_id: Option<&str>,
        finished_at: &str,
    ) -> Result<()> {
        let changed = conn.execute(
            "UPDATE trigger_runs SET status = ?1, error_message = ?2, conversation_id = ?3,
             finished_at = ?4 WHERE id = ?5",
            params![status, error_message, conversation_id, finished_at, id],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("trigger_run", id));
        }
        Ok(())
    }

    /// List a trigger's runs, newest first.
    pub fn list_by_trigger(conn: &Connection, trigger_id: &str) -> Result<Vec<TriggerRunRow>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {RUN_COLUMNS} FROM trigger_runs WHERE trigger_id = ?1 ORDER BY started_at DESC"
        ))?;
        let rows = stmt.query_map(params![trigger_id], map_run)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{AgentRepo, CreateAgentParams};
    use crate::test_support::test_conn;

    fn seed_agent(conn: &Connection) -> String {
        AgentRepo::create(conn, &CreateAgentParams::default()).unwrap().id
    }

    #[test]
    fn create_one_shot_trigger() {
        let (_pool, conn) = test_conn();
        let agent_id = seed_agent(&conn);
        let trigger = TriggerRepo::create(
            &conn,
            &CreateTriggerParams {
                agent_id,
                name: "check feeds".into(),
                prompt: "Check the feeds".into(),
                next_run_at: Some("2026-01-01T00:00:00Z".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(trigger.enabled);
        assert!(!trigger.is_cron());
    }

    #[test]
    fn list_due_filters_and_orders() {
        let (_pool, conn) = test_conn();
        let agent_id = seed_agent(&conn);

        let later = TriggerRepo::create(
            &conn,
            &CreateTriggerParams {
                agent_id: agent_id.clone(),
                name: "later".into(),
                prompt: "p".into(),
                next_run_at: Some("2026-01-01T00:00:05Z".into()),
                ..Default::default()
            },
        )
        .unwrap();
        let earlier = TriggerRepo::create(
            &conn,
            &CreateTriggerParams {
                agent_id: agent_id.clone(),
                name: "earlier".into(),
                prompt: "p".into(),
                next_run_at: Some("2026-01-01T00:00:01Z".into()),
                ..Default::default()
            },
        )
        .unwrap();
        let future = TriggerRepo::create(
            &conn,
            &CreateTriggerParams {
                agent_id,
                name: "future".into(),
                prompt: "p".into(),
                next_run_at: Some("2030-01-01T00:00:00Z".into()),
                ..Default::default()
            },
        )
        .unwrap();

        let due = TriggerRepo::list_due(&conn, "2026-06-01T00:00:00Z").unwrap();
        let ids: Vec<&str> = due.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec![earlier.id.as_str(), later.id.as_str()]);
        assert!(!ids.contains(&future.id.as_str()));
    }

    #[test]
    fn disabled_triggers_are_never_due() {
        let (_pool, conn) = test_conn();
        let agent_id = seed_agent(&conn);
        let trigger = TriggerRepo::create(
            &conn,
            &CreateTriggerParams {
                agent_id,
                name: "t".into(),
                prompt: "p".into(),
                next_run_at: Some("2020-01-01T00:00:00Z".into()),
                ..Default::default()
            },
        )
        .unwrap();
        let _ = TriggerRepo::update(
            &conn,
            &trigger.id,
            &UpdateTriggerParams {
                name: trigger.name.clone(),
                prompt: trigger.prompt.clone(),
                enabled: false,
                next_run_at: trigger.next_run_at.clone(),
                ..Default::default()
            },
        )
        .unwrap();

        assert!(TriggerRepo::list_due(&conn, "2030-01-01T00:00:00Z").unwrap().is_empty());
    }

    #[test]
    fn trigger_run_lifecycle() {
        let (_pool, conn) = test_conn();
        let agent_id = seed_agent(&conn);
        let trigger = TriggerRepo::create(
            &conn,
            &CreateTriggerParams {
                agent_id,
                name: "t".into(),
                prompt: "p".into(),
                next_run_at: Some("2026-01-01T00:00:00Z".into()),
                ..Default::default()
            },
        )
        .unwrap();

        let run = TriggerRunRepo::create(&conn, &trigger.id, "2026-01-01T00:00:00Z").unwrap();
        assert_eq!(run.status, "running");
        assert!(run.finished_at.is_none());

        TriggerRunRepo::finish(&conn, &run.id, "failed", Some("boom"), None, "2026-01-01T00:00:02Z")
            .unwrap();
        let finished = TriggerRunRepo::get(&conn, &run.id).unwrap();
        assert_eq!(finished.status, "failed");
        assert_eq!(finished.error_message.as_deref(), Some("boom"));
    }

    #[test]
    fn deleting_trigger_keeps_conversation_row_intact() {
        let (_pool, conn) = test_conn();
        let agent_id = seed_agent(&conn);
        let conv =
            crate::repositories::ConversationRepo::create(&conn, &agent_id, "").unwrap();
        let trigger = TriggerRepo::create(
            &conn,
            &CreateTriggerParams {
                agent_id,
                name: "t".into(),
                prompt: "p".into(),
                next_run_at: Some("2026-01-01T00:00:00Z".into()),
                ..Default::default()
            },
        )
        .unwrap();
        let run = TriggerRunRepo::create(&conn, &trigger.id, "2026-01-01T00:00:00Z").unwrap();
        TriggerRunRepo::finish(
            &conn,
            &run.id,
            "completed",
            None,
            Some(&conv.id),
            "2026-01-01T00:00:01Z",
        )
        .unwrap();

        // One-shot cleanup deletes the trigger; its runs cascade, the
        // conversation survives.
        TriggerRepo::delete(&conn, &trigger.id).unwrap();
        assert!(crate::repositories::ConversationRepo::get(&conn, &conv.id).is_ok());
    }
}
