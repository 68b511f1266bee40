//! Per-agent file repository (memory storage).

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::errors::{Result, StoreError};
use crate::rows::AgentFileRow;

fn map_row(row: &Row<'_>) -> rusqlite::Result<AgentFileRow> {
    Ok(AgentFileRow {
        agent_id: row.get(0)?,
        path: row.get(1)?,
        content: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

const COLUMNS: &str = "agent_id, path, content, created_at, updated_at";

/// Agent file repository.
pub struct AgentFileRepo;

impl AgentFileRepo {
    /// Insert or overwrite a file; `created_at` is preserved on overwrite.
    pub fn upsert(conn: &Connection, agent_id: &str, path: &str, content: &str) -> Result<AgentFileRow> {
        let now = chrono::Utc::now().to_rfc3339();
        let _ = conn.execute(
            "INSERT INTO agent_files (agent_id, path, content, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT (agent_id, path)
             DO UPDATE SET content = excluded.content, updated_at = excluded.updated_at",
            params![agent_id, path, content, now],
        )?;
        Self::get(conn, agent_id, path)
    }

    /// Fetch a file.
    pub fn get(conn: &Connection, agent_id: &str, path: &str) -> Result<AgentFileRow> {
        conn.query_row(
            &format!("SELECT {COLUMNS} FROM agent_files WHERE agent_id = ?1 AND path = ?2"),
            params![agent_id, path],
            map_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found("agent file", path))
    }

    /// List an agent's files under a path prefix, ordered by path.
    pub fn list_by_prefix(conn: &Connection, agent_id: &str, prefix: &str) -> Result<Vec<AgentFileRow>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM agent_files WHERE agent_id = ?1 AND path LIKE ?2 ORDER BY path"
        ))?;
        let pattern = format!("{}%", prefix.replace('%', "\\%"));
        let rows = stmt.query_map(params![agent_id, pattern], map_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Delete a file.
    pub fn delete(conn: &Connection, agent_id: &str, path: &str) -> Result<()> {
        let changed = conn.execute(
            "DELETE FROM agent_files WHERE agent_id = ?1 AND path = ?2",
            params![agent_id, path],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("agent file", path));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{AgentRepo, CreateAgentParams};
    use crate::test_support::test_conn;

    #[test]
    fn upsert_preserves_created_at() {
        let (_pool, conn) = test_conn();
        let agent = AgentRepo::create(&conn, &CreateAgentParams::default()).unwrap();

        let first = AgentFileRepo::upsert(&conn, &agent.id, "memories/MEMORY.md", "v1").unwrap();
        let second = AgentFileRepo::upsert(&conn, &agent.id, "memories/MEMORY.md", "v2").unwrap();

        assert_eq!(second.content, "v2");
        assert_eq!(second.created_at, first.created_at);
    }

    #[test]
    fn list_by_prefix_scopes_to_agent() {
        let (_pool, conn) = test_conn();
        let a = AgentRepo::create(&conn, &CreateAgentParams::default()).unwrap();
        let b = AgentRepo::create(&conn, &CreateAgentParams::default()).unwrap();

        let _ = AgentFileRepo::upsert(&conn, &a.id, "memories/MEMORY.md", "a").unwrap();
        let _ = AgentFileRepo::upsert(&conn, &a.id, "memories/projects/x.md", "x").unwrap();
        let _ = AgentFileRepo::upsert(&conn, &b.id, "memories/MEMORY.md", "b").unwrap();

        let files = AgentFileRepo::list_by_prefix(&conn, &a.id, "memories/").unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.agent_id == a.id));
    }

    #[test]
    fn delete_missing_is_not_found() {
        let (_pool, conn) = test_conn();
        let agent = AgentRepo::create(&conn, &CreateAgentParams::default()).unwrap();
        let err = AgentFileRepo::delete(&conn, &agent.id, "memories/none.md").unwrap_err();
        assert!(err.is_not_found());
    }
}
