//! Database migration management.

use rusqlite::{params, Connection};

use crate::schema::DEFAULT_WORKSPACE;

/// Database migration manager.
pub struct MigrationManager;

impl MigrationManager {
    /// Apply all pending migrations to the database.
    pub fn migrate(conn: &Connection) -> crate::Result<()> {
        // Create schema migrations table first
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))
            );
            "#,
        )?;

        let current_version = Self::current_version(conn)?.unwrap_or(0);

        if current_version < 1 {
            Self::apply_migration_1(conn)
                .map_err(|e| crate::Error::migration(format!("migration 1 failed: {}", e)))?;
        }

        Ok(())
    }

    /// Apply migration version 1 - workspaces, integrations and config.
    fn apply_migration_1(conn: &Connection) -> crate::Result<()> {
        conn.execute_batch(
            r#"
            -- Named namespaces owning integrations
            CREATE TABLE IF NOT EXISTS workspaces (
                name TEXT PRIMARY KEY,
                description TEXT,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
                updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))
            );

            -- Connections to external services. auth_type is cleartext so listing
            -- needs no key; auth_data holds the encrypted credential payload.
            CREATE TABLE IF NOT EXISTS integrations (
                id TEXT PRIMARY KEY,
                workspace_name TEXT NOT NULL REFERENCES workspaces(name) ON DELETE CASCADE,
                name TEXT NOT NULL,
                type TEXT NOT NULL,
                base_url TEXT,
                auth_type TEXT NOT NULL DEFAULT 'none',
                auth_data BLOB NOT NULL DEFAULT x'',
                headers TEXT NOT NULL DEFAULT '{}',
                timeout_seconds INTEGER NOT NULL DEFAULT 30,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
                updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
                UNIQUE(workspace_name, name)
            );

            -- Single-key settings such as the current workspace pointer
            CREATE TABLE IF NOT EXISTS config (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_integrations_workspace ON integrations(workspace_name);
            CREATE INDEX IF NOT EXISTS idx_integrations_workspace_type ON integrations(workspace_name, type);

            INSERT OR REPLACE INTO schema_migrations (version) VALUES (1);
            "#,
        )?;

        Ok(())
    }

    /// Seed the `default` workspace if it is missing.
    pub fn ensure_default_workspace(conn: &Connection) -> crate::Result<()> {
        conn.execute(
            "INSERT OR IGNORE INTO workspaces (name, description) VALUES (?, ?)",
            params![DEFAULT_WORKSPACE, "Default workspace"],
        )?;
        Ok(())
    }

    /// Get the current schema version.
    pub fn current_version(conn: &Connection) -> crate::Result<Option<u32>> {
        let mut stmt = conn.prepare("SELECT MAX(version) FROM schema_migrations")?;

        let version = stmt
            .query_row(params![], |row| row.get::<_, Option<u32>>(0))
            .ok()
            .flatten();

        Ok(version)
    }
}
