//! Workspace and integration names, read without the master key.
//!
//! Only clear-text columns are touched, so completion never triggers a
//! keychain prompt.

use std::path::Path;

use anyhow::Result;
use conductor_local_db::{
    ConfigStore, Database, IntegrationRecordStore, WorkspaceRecordStore,
    CONFIG_CURRENT_WORKSPACE, DEFAULT_WORKSPACE,
};

use super::{candidate, Completion};

/// Open an existing database read-only. A missing file is not created.
fn open_existing(path: &Path) -> Result<Option<Database>> {
    if !path.is_file() {
        return Ok(None);
    }
    Ok(Some(Database::open_read_only(path)?))
}

pub fn complete_workspaces(db_path: &Path) -> Result<Completion> {
    let Some(db) = open_existing(db_path)? else {
        return Ok(Completion::empty());
    };
    let names = db.with_connection(|conn| WorkspaceRecordStore::new(conn).list_names())?;
    Ok(Completion::values(names))
}

/// Integration names of `workspace`, or of the stored current workspace.
pub fn complete_integrations(db_path: &Path, workspace: Option<&str>) -> Result<Completion> {
    let Some(db) = open_existing(db_path)? else {
        return Ok(Completion::empty());
    };
    let names = db.with_connection(|conn| {
        let workspace = match workspace {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => ConfigStore::new(conn)
                .get(CONFIG_CURRENT_WORKSPACE)?
                .unwrap_or_else(|| DEFAULT_WORKSPACE.to_string()),
        };
        IntegrationRecordStore::new(conn).list_names(&workspace)
    })?;
    Ok(Completion::values(
        names
            .iter()
            .map(|(name, integration_type)| candidate(name, integration_type))
            .collect(),
    ))
}
