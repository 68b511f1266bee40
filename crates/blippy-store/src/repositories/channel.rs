//! Notification channel repository.

use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::errors::{Result, StoreError};
use crate::rows::ChannelRow;

/// Fields for creating a notification channel.
#[derive(Clone, Debug, Default)]
pub struct CreateChannelParams {
    pub name: String,
    pub channel_type: String,
    pub config_json: String,
    pub description: String,
    pub json_schema_json: String,
}

/// Fields for updating a notification channel.
pub type UpdateChannelParams = CreateChannelParams;

fn map_row(row: &Row<'_>) -> rusqlite::Result<ChannelRow> {
    Ok(ChannelRow {
        id: row.get(0)?,
        name: row.get(1)?,
        channel_type: row.get(2)?,
        config_json: row.get(3)?,
        description: row.get(4)?,
        json_schema_json: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

const COLUMNS: &str = "id, name, type, config_json, description, json_schema_json, created_at, updated_at";

/// Notification channel repository.
pub struct ChannelRepo;

impl ChannelRepo {
    /// Create a channel. Names are unique.
    pub fn create(conn: &Connection, params: &CreateChannelParams) -> Result<ChannelRow> {
        let id = Uuid::now_v7().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let _ = conn.execute(
            "INSERT INTO notification_channels (id, name, type, config_json, description,
             json_schema_json, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                id,
                params.name,
                params.channel_type,
                if params.config_json.is_empty() { "{}" } else { &params.config_json },
                params.description,
                params.json_schema_json,
                now,
            ],
        )?;
        Self::get(conn, &id)
    }

    /// Fetch a channel by ID.
    pub fn get(conn: &Connection, id: &str) -> Result<ChannelRow> {
        conn.query_row(
            &format!("SELECT {COLUMNS} FROM notification_channels WHERE id = ?1"),
            params![id],
            map_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found("notification channel", id))
    }

    /// Fetch a channel by its unique name.
    pub fn get_by_name(conn: &Connection, name: &str) -> Result<ChannelRow> {
        conn.query_row(
            &format!("SELECT {COLUMNS} FROM notification_channels WHERE name = ?1"),
            params![name],
            map_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found("notification channel", name))
    }

    /// List all channels, by name.
    pub fn list(conn: &Connection) -> Result<Vec<ChannelRow>> {
        let mut stmt = conn
            .prepare(&format!("SELECT {COLUMNS} FROM notification_channels ORDER BY name"))?;
        let rows = stmt.query_map([], map_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// List channels matching the given IDs, preserving no particular order.
    ///
    /// Fetches all rows and filters in memory; channel counts are tiny and
    /// this sidesteps dynamic `IN` clause construction.
    pub fn list_by_ids(conn: &Connection, ids: &[String]) -> Result<Vec<ChannelRow>> {
        let all = Self::list(conn)?;
        Ok(all.into_iter().filter(|c| ids.iter().any(|id| *id == c.id)).collect())
    }

    /// Overwrite a channel's fields.
    pub fn update(conn: &Connection, id: &str, params: &UpdateChannelParams) -> Result<ChannelRow> {
        let now = chrono::Utc::now().to_rfc3339();
        let changed = conn.execute(
            "UPDATE notification_channels SET name = ?1, type = ?2, config_json = ?3,
             description = ?4, json_schema_json = ?5, updated_at = ?6 WHERE id = ?7",
            params![
                params.name,
                params.channel_type,
                params.config_json,
                params.description,
                params.json_schema_json,
                now,
                id,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("notification channel", id));
        }
        Self::get(conn, id)
    }

    /// Delete a channel.
    pub fn delete(conn: &Connection, id: &str) -> Result<()> {
        let changed =
            conn.execute("DELETE FROM notification_channels WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::not_found("notification channel", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_conn;

    #[test]
    fn create_get_by_name() {
        let (_pool, conn) = test_conn();
        let channel = ChannelRepo::create(
            &conn,
            &CreateChannelParams {
                name: "ops".into(),
                channel_type: "http_request".into(),
                config_json: r#"{"url":"https://hooks.example.com/ops"}"#.into(),
                ..Default::default()
            },
        )
        .unwrap();

        let by_name = ChannelRepo::get_by_name(&conn, "ops").unwrap();
        assert_eq!(by_name.id, channel.id);
        assert_eq!(by_name.channel_type, "http_request");
    }

    #[test]
    fn names_are_unique() {
        let (_pool, conn) = test_conn();
        let params = CreateChannelParams {
            name: "ops".into(),
            channel_type: "http_request".into(),
            ..Default::default()
        };
        let _ = ChannelRepo::create(&conn, &params).unwrap();
        assert!(ChannelRepo::create(&conn, &params).is_err());
    }

    #[test]
    fn list_by_ids_filters() {
        let (_pool, conn) = test_conn();
        let a = ChannelRepo::create(
            &conn,
            &CreateChannelParams { name: "a".into(), channel_type: "http_request".into(), ..Default::default() },
        )
        .unwrap();
        let _ = ChannelRepo::create(
            &conn,
            &CreateChannelParams { name: "b".into(), channel_type: "http_request".into(), ..Default::default() },
        )
        .unwrap();

        let filtered = ChannelRepo::list_by_ids(&conn, &[a.id.clone()]).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, a.id);
    }
}
