//! Database schema definitions and constants.

// Current schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Workspace seeded on every open; it can never be deleted.
pub const DEFAULT_WORKSPACE: &str = "default";

/// Config key holding the current workspace pointer.
pub const CONFIG_CURRENT_WORKSPACE: &str = "current_workspace";

// Table names
pub const TABLE_SCHEMA_MIGRATIONS: &str = "schema_migrations";
pub const TABLE_WORKSPACES: &str = "workspaces";
pub const TABLE_INTEGRATIONS: &str = "integrations";
pub const TABLE_CONFIG: &str = "config";

// Column names for workspaces table
pub mod workspaces {
    pub const NAME: &str = "name";
    pub const DESCRIPTION: &str = "description";
    pub const CREATED_AT: &str = "created_at";
    pub const UPDATED_AT: &str = "updated_at";
}

// Column names for integrations table
pub mod integrations {
    pub const ID: &str = "id";
    pub const WORKSPACE_NAME: &str = "workspace_name";
    pub const NAME: &str = "name";
    pub const TYPE: &str = "type";
    pub const BASE_URL: &str = "base_url";
    pub const AUTH_TYPE: &str = "auth_type";
    pub const AUTH_DATA: &str = "auth_data";
    pub const HEADERS: &str = "headers";
    pub const TIMEOUT_SECONDS: &str = "timeout_seconds";
    pub const CREATED_AT: &str = "created_at";
    pub const UPDATED_AT: &str = "updated_at";
}

// Column names for config table
pub mod config {
    pub const KEY: &str = "key";
    pub const VALUE: &str = "value";
}
