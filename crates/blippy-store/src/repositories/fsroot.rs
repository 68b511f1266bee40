//! Filesystem root repository.

use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::errors::{Result, StoreError};
use crate::rows::RootRow;

/// Fields for creating a filesystem root.
#[derive(Clone, Debug, Default)]
pub struct CreateRootParams {
    pub name: String,
    pub path: String,
    pub description: String,
}

/// Fields for updating a filesystem root.
pub type UpdateRootParams = CreateRootParams;

fn map_row(row: &Row<'_>) -> rusqlite::Result<RootRow> {
    Ok(RootRow {
        id: row.get(0)?,
        name: row.get(1)?,
        path: row.get(2)?,
        description: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

const COLUMNS: &str = "id, name, path, description, created_at, updated_at";

/// Filesystem root repository.
pub struct RootRepo;

impl RootRepo {
    /// Create a root. Names are unique.
    pub fn create(conn: &Connection, params: &CreateRootParams) -> Result<RootRow> {
        let id = Uuid::now_v7().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let _ = conn.execute(
            "INSERT INTO filesystem_roots (id, name, path, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![id, params.name, params.path, params.description, now],
        )?;
        Self::get(conn, &id)
    }

    /// Fetch a root by ID.
    pub fn get(conn: &Connection, id: &str) -> Result<RootRow> {
        conn.query_row(
            &format!("SELECT {COLUMNS} FROM filesystem_roots WHERE id = ?1"),
            params![id],
            map_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found("filesystem root", id))
    }

    /// List all roots, by name.
    pub fn list(conn: &Connection) -> Result<Vec<RootRow>> {
        let mut stmt =
            conn.prepare(&format!("SELECT {COLUMNS} FROM filesystem_roots ORDER BY name"))?;
        let rows = stmt.query_map([], map_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// List roots matching the given IDs.
    pub fn list_by_ids(conn: &Connection, ids: &[String]) -> Result<Vec<RootRow>> {
        let all = Self::list(conn)?;
        Ok(all.into_iter().filter(|r| ids.iter().any(|id| *id == r.id)).collect())
    }

    /// Overwrite a root's fields.
    pub fn update(conn: &Connection, id: &str, params: &UpdateRootParams) -> Result<RootRow> {
        let now = chrono::Utc::now().to_rfc3339();
        let changed = conn.execute(
            "UPDATE filesystem_roots SET name = ?1, path = ?2, description = ?3, updated_at = ?4
             WHERE id = ?5",
            params![params.name, params.path, params.description, now, id],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("filesystem root", id));
        }
        Self::get(conn, id)
    }

    /// Delete a root.
    pub fn delete(conn: &Connection, id: &str) -> Result<()> {
        let changed = conn.execute("DELETE FROM filesystem_roots WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::not_found("filesystem root", id));
        }
        Ok(())
    }
}
