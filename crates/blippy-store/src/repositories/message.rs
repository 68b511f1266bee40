//! Message repository.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::errors::{Result, StoreError};
use crate::rows::MessageRow;

/// Fields for inserting a message. The caller supplies the ID and timestamp
/// so the persisted row matches the `MessageDone` event exactly.
#[derive(Clone, Debug)]
pub struct CreateMessageParams {
    pub id: String,
    pub conversation_id: String,
    pub role: String,
    pub items_json: String,
    pub created_at: String,
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        role: row.get(2)?,
        items_json: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Message repository.
pub struct MessageRepo;

impl MessageRepo {
    /// Insert a message row.
    pub fn create(conn: &Connection, params: &CreateMessageParams) -> Result<MessageRow> {
        let _ = conn.execute(
            "INSERT INTO messages (id, conversation_id, role, items_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                params.id,
                params.conversation_id,
                params.role,
                params.items_json,
                params.created_at,
            ],
        )?;
        Self::get(conn, &params.id)
    }

    /// Fetch a message by ID.
    pub fn get(conn: &Connection, id: &str) -> Result<MessageRow> {
        conn.query_row(
            "SELECT id, conversation_id, role, items_json, created_at FROM messages WHERE id = ?1",
            params![id],
            map_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found("message", id))
    }

    /// List a conversation's messages, oldest first.
    pub fn list_by_conversation(conn: &Connection, conversation_id: &str) -> Result<Vec<MessageRow>> {
        let mut stmt = conn.prepare(
            "SELECT id, conversation_id, role, items_json, created_at FROM messages
             WHERE conversation_id = ?1 ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![conversation_id], map_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }
}
