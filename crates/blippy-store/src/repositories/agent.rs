//! Agent repository.

use blippy_core::AgentId;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::errors::{Result, StoreError};
use crate::rows::AgentRow;

/// Fields for creating an agent.
#[derive(Clone, Debug, Default)]
pub struct CreateAgentParams {
    pub name: String,
    pub description: String,
    pub system_prompt: String,
    pub enabled_tools_json: String,
    pub enabled_notification_channels_json: String,
    pub enabled_filesystem_roots_json: String,
    pub model: String,
    pub forwarded_host_env_vars_json: String,
}

/// Fields for updating an agent. All fields are overwritten.
pub type UpdateAgentParams = CreateAgentParams;

fn map_row(row: &Row<'_>) -> rusqlite::Result<AgentRow> {
    Ok(AgentRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        system_prompt: row.get(3)?,
        enabled_tools_json: row.get(4)?,
        enabled_notification_channels_json: row.get(5)?,
        enabled_filesystem_roots_json: row.get(6)?,
        model: row.get(7)?,
        forwarded_host_env_vars_json: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

const COLUMNS: &str = "id, name, description, system_prompt, enabled_tools_json, \
     enabled_notification_channels_json, enabled_filesystem_roots_json, model, \
     forwarded_host_env_vars_json, created_at, updated_at";

/// Agent repository.
pub struct AgentRepo;

impl AgentRepo {
    /// Create a new agent.
    pub fn create(conn: &Connection, params: &CreateAgentParams) -> Result<AgentRow> {
        let id = AgentId::new().into_inner();
        let now = chrono::Utc::now().to_rfc3339();
        let _ = conn.execute(
            "INSERT INTO agents (id, name, description, system_prompt, enabled_tools_json,
             enabled_notification_channels_json, enabled_filesystem_roots_json, model,
             forwarded_host_env_vars_json, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                id,
                params.name,
                params.description,
                params.system_prompt,
                json_or_default(&params.enabled_tools_json, "[]"),
                json_or_default(&params.enabled_notification_channels_json, "[]"),
                json_or_default(&params.enabled_filesystem_roots_json, "[]"),
                params.model,
                json_or_default(&params.forwarded_host_env_vars_json, "[]"),
                now,
                now,
            ],
        )?;
        Self::get(conn, &id)
    }

    /// Fetch an agent by ID.
    pub fn get(conn: &Connection, id: &str) -> Result<AgentRow> {
        conn.query_row(
            &format!("SELECT {COLUMNS} FROM agents WHERE id = ?1"),
            params![id],
            map_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found("agent", id))
    }

    /// List all agents, newest first.
    pub fn list(conn: &Connection) -> Result<Vec<AgentRow>> {
        let mut stmt =
            conn.prepare(&format!("SELECT {COLUMNS} FROM agents ORDER BY created_at DESC"))?;
        let rows = stmt.query_map([], map_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Overwrite an agent's configuration.
    pub fn update(conn: &Connection, id: &str, params: &UpdateAgentParams) -> Result<AgentRow> {
        let now = chrono::Utc::now().to_rfc3339();
        let changed = conn.execute(
            "UPDATE agents SET name = ?1, description = ?2, system_prompt = ?3,
             enabled_tools_json = ?4, enabled_notification_channels_json = ?5,
             enabled_filesystem_roots_json = ?6, model = ?7,
             forwarded_host_env_vars_json = ?8, updated_at = ?9
             WHERE id = ?10",
            params![
                params.name,
                params.description,
                params.system_prompt,
                json_or_default(&params.enabled_tools_json, "[]"),
                json_or_default(&params.enabled_notification_channels_json, "[]"),
                json_or_default(&params.enabled_filesystem_roots_json, "[]"),
                params.model,
                json_or_default(&params.forwarded_host_env_vars_json, "[]"),
                now,
                id,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("agent", id));
        }
        Self::get(conn, id)
    }

    /// Delete an agent; conversations, messages, and triggers cascade.
    pub fn delete(conn: &Connection, id: &str) -> Result<()> {
        let changed = conn.execute("DELETE FROM agents WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::not_found("agent", id));
        }
        Ok(())
    }
}

fn json_or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.is_empty() { default } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_conn;

    #[test]
    fn create_and_get() {
        let (_pool, conn) = test_conn();
        let agent = AgentRepo::create(
            &conn,
            &CreateAgentParams {
                name: "researcher".into(),
                system_prompt: "Be terse.".into(),
                enabled_tools_json: r#"["fetch_url"]"#.into(),
                ..Default::default()
            },
        )
        .unwrap();

        let fetched = AgentRepo::get(&conn, &agent.id).unwrap();
        assert_eq!(fetched.name, "researcher");
        assert_eq!(fetched.enabled_tools_json, r#"["fetch_url"]"#);
        assert_eq!(fetched.enabled_notification_channels_json, "[]");
    }

    #[test]
    fn get_missing_is_not_found() {
        let (_pool, conn) = test_conn();
        let err = AgentRepo::get(&conn, "nope").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn update_overwrites_and_bumps_updated_at() {
        let (_pool, conn) = test_conn();
        let agent = AgentRepo::create(&conn, &CreateAgentParams::default()).unwrap();
        let updated = AgentRepo::update(
            &conn,
            &agent.id,
            &UpdateAgentParams {
                name: "renamed".into(),
                model: "openai/gpt-5".into(),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.name, "renamed");
        assert_eq!(updated.model, "openai/gpt-5");
    }

    #[test]
    fn delete_cascades_to_conversations() {
        let (_pool, conn) = test_conn();
        let agent = AgentRepo::create(&conn, &CreateAgentParams::default()).unwrap();
        let conv = crate::repositories::ConversationRepo::create(&conn, &agent.id, "").unwrap();

        AgentRepo::delete(&conn, &agent.id).unwrap();
        let err = crate::repositories::ConversationRepo::get(&conn, &conv.id).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn delete_missing_is_not_found() {
        let (_pool, conn) = test_conn();
        assert!(AgentRepo::delete(&conn, "ghost").unwrap_err().is_not_found());
    }
}
