//! Conversation repository.

use blippy_core::ConversationId;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::errors::{Result, StoreError};
use crate::rows::ConversationRow;

fn map_row(row: &Row<'_>) -> rusqlite::Result<ConversationRow> {
    Ok(ConversationRow {
        id: row.get(0)?,
        agent_id: row.get(1)?,
        title: row.get(2)?,
        previous_response_id: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

const COLUMNS: &str = "id, agent_id, title, previous_response_id, created_at, updated_at";

/// Conversation repository.
pub struct ConversationRepo;

impl ConversationRepo {
    /// Create a conversation bound to an agent. `title` may be empty.
    pub fn create(conn: &Connection, agent_id: &str, title: &str) -> Result<ConversationRow> {
        let id = ConversationId::new().into_inner();
        let now = chrono::Utc::now().to_rfc3339();
        let _ = conn.execute(
            "INSERT INTO conversations (id, agent_id, title, previous_response_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, '', ?4, ?4)",
            params![id, agent_id, title, now],
        )?;
        Self::get(conn, &id)
    }

    /// Fetch a conversation by ID.
    pub fn get(conn: &Connection, id: &str) -> Result<ConversationRow> {
        conn.query_row(
            &format!("SELECT {COLUMNS} FROM conversations WHERE id = ?1"),
            params![id],
            map_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found("conversation", id))
    }

    /// List all conversations, most recently updated first.
    pub fn list_all(conn: &Connection) -> Result<Vec<ConversationRow>> {
        let mut stmt = conn
            .prepare(&format!("SELECT {COLUMNS} FROM conversations ORDER BY updated_at DESC"))?;
        let rows = stmt.query_map([], map_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// List an agent's conversations, most recently updated first.
    pub fn list_by_agent(conn: &Connection, agent_id: &str) -> Result<Vec<ConversationRow>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM conversations WHERE agent_id = ?1 ORDER BY updated_at DESC"
        ))?;
        let rows = stmt.query_map(params![agent_id], map_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// End-of-turn update: title, response ID, and `updated_at` in one write.
    ///
    /// The title passed in must already respect monotonicity (callers keep
    /// the old title when no new one was generated).
    pub fn update_turn(
        conn: &Connection,
        id: &str,
        title: &str,
        previous_response_id: &str,
        updated_at: &str,
    ) -> Result<ConversationRow> {
        let changed = conn.execute(
            "UPDATE conversations SET title = ?1, previous_response_id = ?2, updated_at = ?3
             WHERE id = ?4",
            params![title, previous_response_id, updated_at, id],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("conversation", id));
        }
        Self::get(conn, id)
    }

    /// Delete a conversation; messages cascade.
    pub fn delete(conn: &Connection, id: &str) -> Result<()> {
        let changed = conn.execute("DELETE FROM conversations WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::not_found("conversation", id));
        }
        Ok(())
    }
}
