//! Database models and persistence operations.

use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

/// Database model for workspaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceRecord {
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Database model for integrations as stored on disk.
///
/// `auth_data` is the encrypted credential payload and is never decoded here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationRecord {
    pub id: String,
    pub workspace_name: String,
    pub name: String,
    pub type_: String, // `type` is a keyword in Rust
    pub base_url: Option<String>,
    pub auth_type: String,
    pub auth_data: Vec<u8>,
    pub headers: String,
    pub timeout_seconds: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Row values written on insert and update. Timestamps are stamped by SQLite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIntegrationRecord {
    pub id: String,
    pub workspace_name: String,
    pub name: String,
    pub type_: String,
    pub base_url: Option<String>,
    pub auth_type: String,
    pub auth_data: Vec<u8>,
    pub headers: String,
    pub timeout_seconds: i64,
}

fn workspace_from_row(row: &Row<'_>) -> rusqlite::Result<WorkspaceRecord> {
    Ok(WorkspaceRecord {
        name: row.get(0)?,
        description: row.get(1)?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
    })
}

fn integration_from_row(row: &Row<'_>) -> rusqlite::Result<IntegrationRecord> {
    Ok(IntegrationRecord {
        id: row.get(0)?,
        workspace_name: row.get(1)?,
        name: row.get(2)?,
        type_: row.get(3)?,
        base_url: row.get(4)?,
        auth_type: row.get(5)?,
        auth_data: row.get(6)?,
        headers: row.get(7)?,
        timeout_seconds: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

const INTEGRATION_COLUMNS: &str = "id, workspace_name, name, type, base_url, auth_type, auth_data, headers, timeout_seconds, created_at, updated_at";

/// Database operations for workspaces.
pub struct WorkspaceRecordStore<'a> {
    conn: &'a rusqlite::Connection,
}

impl<'a> WorkspaceRecordStore<'a> {
    pub fn new(conn: &'a rusqlite::Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, name: &str, description: Option<&str>) -> crate::Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO workspaces (name, description)
            VALUES (?, ?)
            "#,
            params![name, description],
        )?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> crate::Result<Option<WorkspaceRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT name, description, created_at, updated_at
            FROM workspaces WHERE name = ?
            "#,
        )?;

        let mut rows = stmt.query_map(params![name], workspace_from_row)?;

        match rows.next() {
            Some(Ok(record)) => Ok(Some(record)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    pub fn list(&self) -> crate::Result<Vec<WorkspaceRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT name, description, created_at, updated_at
            FROM workspaces
            ORDER BY name ASC
            "#,
        )?;

        let records = stmt.query_map(params![], workspace_from_row)?;

        let mut workspaces = Vec::new();
        for record in records {
            workspaces.push(record?);
        }
        Ok(workspaces)
    }

    pub fn list_names(&self) -> crate::Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT name FROM workspaces ORDER BY name ASC")?;
        let names = stmt.query_map(params![], |row| row.get::<_, String>(0))?;
        Ok(names.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Returns the number of rows changed (0 when the workspace is missing).
    pub fn update_description(&self, name: &str, description: Option<&str>) -> crate::Result<usize> {
        let changed = self.conn.execute(
            r#"
            UPDATE workspaces
            SET description = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ','now')
            WHERE name = ?
            "#,
            params![description, name],
        )?;
        Ok(changed)
    }

    /// Delete a workspace; integrations go with it through the foreign key cascade.
    pub fn delete(&self, name: &str) -> crate::Result<usize> {
        let changed = self.conn.execute("DELETE FROM workspaces WHERE name = ?", params![name])?;
        Ok(changed)
    }
}

/// Database operations for integrations.
pub struct IntegrationRecordStore<'a> {
    conn: &'a rusqlite::Connection,
}

impl<'a> IntegrationRecordStore<'a> {
    pub fn new(conn: &'a rusqlite::Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, record: &NewIntegrationRecord) -> crate::Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO integrations (id, workspace_name, name, type, base_url, auth_type, auth_data, headers, timeout_seconds)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                record.id,
                record.workspace_name,
                record.name,
                record.type_,
                record.base_url,
                record.auth_type,
                record.auth_data,
                record.headers,
                record.timeout_seconds
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, workspace_name: &str, name: &str) -> crate::Result<Option<IntegrationRecord>> {
        let sql = format!(
            "SELECT {} FROM integrations WHERE workspace_name = ? AND name = ?",
            INTEGRATION_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let mut rows = stmt.query_map(params![workspace_name, name], integration_from_row)?;

        match rows.next() {
            Some(Ok(record)) => Ok(Some(record)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    pub fn list(&self, workspace_name: &str) -> crate::Result<Vec<IntegrationRecord>> {
        let sql = format!(
            "SELECT {} FROM integrations WHERE workspace_name = ? ORDER BY name ASC",
            INTEGRATION_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt.query_map(params![workspace_name], integration_from_row)?;

        let mut integrations = Vec::new();
        for record in records {
            integrations.push(record?);
        }
        Ok(integrations)
    }

    pub fn list_by_type(
        &self,
        workspace_name: &str,
        type_: &str,
    ) -> crate::Result<Vec<IntegrationRecord>> {
        let sql = format!(
            "SELECT {} FROM integrations WHERE workspace_name = ? AND type = ? ORDER BY name ASC",
            INTEGRATION_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt.query_map(params![workspace_name, type_], integration_from_row)?;

        let mut integrations = Vec::new();
        for record in records {
            integrations.push(record?);
        }
        Ok(integrations)
    }

    /// Names and types only; safe to call without the master key.
    pub fn list_names(&self, workspace_name: &str) -> crate::Result<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, type FROM integrations WHERE workspace_name = ? ORDER BY name ASC",
        )?;
        let rows = stmt.query_map(params![workspace_name], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Rewrite every mutable column of the integration identified by
    /// `(workspace_name, name)`. Returns the number of rows changed.
    pub fn update(&self, record: &NewIntegrationRecord) -> crate::Result<usize> {
        let changed = self.conn.execute(
            r#"
            UPDATE integrations
            SET type = ?, base_url = ?, auth_type = ?, auth_data = ?, headers = ?, timeout_seconds = ?,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ','now')
            WHERE workspace_name = ? AND name = ?
            "#,
            params![
                record.type_,
                record.base_url,
                record.auth_type,
                record.auth_data,
                record.headers,
                record.timeout_seconds,
                record.workspace_name,
                record.name
            ],
        )?;
        Ok(changed)
    }

    pub fn delete(&self, workspace_name: &str, name: &str) -> crate::Result<usize> {
        let changed = self.conn.execute(
            "DELETE FROM integrations WHERE workspace_name = ? AND name = ?",
            params![workspace_name, name],
        )?;
        Ok(changed)
    }
}

/// Database operations for the single-key config table.
pub struct ConfigStore<'a> {
    conn: &'a rusqlite::Connection,
}

impl<'a> ConfigStore<'a> {
    pub fn new(conn: &'a rusqlite::Connection) -> Self {
        Self { conn }
    }

    pub fn set(&self, key: &str, value: &str) -> crate::Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO config (key, value)
            VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> crate::Result<Option<String>> {
        let mut stmt = self.conn.prepare("SELECT value FROM config WHERE key = ?")?;

        let mut rows = stmt.query_map(params![key], |row| row.get::<_, String>(0))?;

        match rows.next() {
            Some(Ok(value)) => Ok(Some(value)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    /// Drop the pointer `key` if it currently holds `value`.
    pub fn delete_if_value(&self, key: &str, value: &str) -> crate::Result<()> {
        self.conn.execute(
            "DELETE FROM config WHERE key = ? AND value = ?",
            params![key, value],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConstraintKind, Database, DEFAULT_WORKSPACE};

    fn record(workspace: &str, name: &str, type_: &str) -> NewIntegrationRecord {
        NewIntegrationRecord {
            id: format!("{}-{}", workspace, name),
            workspace_name: workspace.to_string(),
            name: name.to_string(),
            type_: type_.to_string(),
            base_url: None,
            auth_type: "none".to_string(),
            auth_data: Vec::new(),
            headers: "{}".to_string(),
            timeout_seconds: 30,
        }
    }

    #[test]
    fn test_duplicate_integration_is_unique_violation() {
        let db = Database::open_in_memory().unwrap();
        db.with_connection(|conn| {
            let store = IntegrationRecordStore::new(conn);
            store.insert(&record(DEFAULT_WORKSPACE, "github", "github"))?;

            let mut dup = record(DEFAULT_WORKSPACE, "github", "github");
            dup.id = "another-id".to_string();
            let err = store.insert(&dup).unwrap_err();
            assert_eq!(err.constraint_kind(), Some(ConstraintKind::Unique));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_missing_workspace_is_foreign_key_violation() {
        let db = Database::open_in_memory().unwrap();
        db.with_connection(|conn| {
            let err = IntegrationRecordStore::new(conn)
                .insert(&record("nowhere", "github", "github"))
                .unwrap_err();
            assert_eq!(err.constraint_kind(), Some(ConstraintKind::ForeignKey));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_workspace_delete_cascades() {
        let db = Database::open_in_memory().unwrap();
        db.with_connection(|conn| {
            WorkspaceRecordStore::new(conn).insert("team", Some("Team"))?;
            let integrations = IntegrationRecordStore::new(conn);
            integrations.insert(&record("team", "slack", "slack"))?;
            assert_eq!(integrations.list("team")?.len(), 1);

            assert_eq!(WorkspaceRecordStore::new(conn).delete("team")?, 1);
            assert!(integrations.list("team")?.is_empty());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_list_by_type_filters_and_sorts() {
        let db = Database::open_in_memory().unwrap();
        db.with_connection(|conn| {
            let store = IntegrationRecordStore::new(conn);
            store.insert(&record(DEFAULT_WORKSPACE, "work", "github"))?;
            store.insert(&record(DEFAULT_WORKSPACE, "chat", "slack"))?;
            store.insert(&record(DEFAULT_WORKSPACE, "github", "github"))?;

            let names: Vec<String> = store
                .list_by_type(DEFAULT_WORKSPACE, "github")?
                .into_iter()
                .map(|r| r.name)
                .collect();
            assert_eq!(names, vec!["github", "work"]);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_config_upsert_and_conditional_delete() {
        let db = Database::open_in_memory().unwrap();
        db.with_connection(|conn| {
            let config = ConfigStore::new(conn);
            assert_eq!(config.get("current_workspace")?, None);

            config.set("current_workspace", "a")?;
            config.set("current_workspace", "b")?;
            assert_eq!(config.get("current_workspace")?.as_deref(), Some("b"));

            config.delete_if_value("current_workspace", "a")?;
            assert_eq!(config.get("current_workspace")?.as_deref(), Some("b"));

            config.delete_if_value("current_workspace", "b")?;
            assert_eq!(config.get("current_workspace")?, None);
            Ok(())
        })
        .unwrap();
    }
}
