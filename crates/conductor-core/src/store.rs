//! Encrypted workspace and integration store.
//!
//! [`WorkspaceStore`] layers credential encryption and the error taxonomy on
//! top of the key-less row stores in `conductor-local-db`. Credentials are
//! decrypted in memory only; rows on disk hold the auth tag in clear and the
//! variant payload as AES-256-GCM ciphertext.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use conductor_crypto::{Cipher, MasterKey};
use conductor_local_db::{
    ConfigStore, ConstraintKind, Database, IntegrationRecord, IntegrationRecordStore,
    NewIntegrationRecord, WorkspaceRecord, WorkspaceRecordStore, CONFIG_CURRENT_WORKSPACE,
    DEFAULT_WORKSPACE,
};
use tracing::{debug, instrument, warn};

use crate::model::{
    parse_timestamp, validate_workspace_name, AuthConfig, AuthKind, Integration, NewIntegration,
    Workspace,
};
use crate::{Error, Result};

/// Upper bound for opening the store from async code.
pub const STORE_OPEN_TIMEOUT: Duration = Duration::from_secs(5);

/// Encrypted, multi-tenant store of workspaces and integrations.
#[derive(Clone)]
pub struct WorkspaceStore {
    db: Database,
    cipher: Cipher,
}

impl std::fmt::Debug for WorkspaceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceStore").field("db", &self.db).finish_non_exhaustive()
    }
}

impl WorkspaceStore {
    /// Wrap an already opened database.
    pub fn new(db: Database, key: &MasterKey) -> Self {
        Self {
            db,
            cipher: Cipher::new(key),
        }
    }

    /// Open (creating if needed) the store at `path`.
    pub fn open<P: AsRef<Path>>(path: P, key: &MasterKey) -> Result<Self> {
        Ok(Self::new(Database::open(path)?, key))
    }

    pub fn open_in_memory(key: &MasterKey) -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?, key))
    }

    /// Open the store on a blocking thread, giving up after `limit`.
    ///
    /// A panic inside the open is resumed on the caller.
    pub async fn open_with_timeout(path: PathBuf, key: MasterKey, limit: Duration) -> Result<Self> {
        let task = tokio::task::spawn_blocking(move || Self::open(&path, &key));
        match tokio::time::timeout(limit, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) if join_error.is_panic() => {
                std::panic::resume_unwind(join_error.into_panic())
            }
            Ok(Err(join_error)) => Err(Error::generic(format!(
                "store open task failed: {}",
                join_error
            ))),
            Err(_) => Err(Error::timeout("opening the workspace store")),
        }
    }

    /// The underlying key-less database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Release the connection. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        Ok(self.db.close()?)
    }
}

// Workspaces
impl WorkspaceStore {
    #[instrument(skip(self, description))]
    pub fn create_workspace(&self, name: &str, description: Option<&str>) -> Result<Workspace> {
        validate_workspace_name(name)?;
        let inserted = self
            .db
            .with_connection(|conn| WorkspaceRecordStore::new(conn).insert(name, description));
        match inserted {
            Ok(()) => {}
            Err(e) if matches!(
                e.constraint_kind(),
                Some(ConstraintKind::PrimaryKey | ConstraintKind::Unique)
            ) =>
            {
                return Err(Error::WorkspaceExists {
                    name: name.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        }
        debug!(workspace = name, "workspace created");
        self.get_workspace(name)
    }

    pub fn get_workspace(&self, name: &str) -> Result<Workspace> {
        let record = self
            .db
            .with_connection(|conn| WorkspaceRecordStore::new(conn).get(name))?;
        match record {
            Some(record) => workspace_from_record(record),
            None => Err(Error::WorkspaceNotFound {
                name: name.to_string(),
            }),
        }
    }

    pub fn list_workspaces(&self) -> Result<Vec<Workspace>> {
        self.db
            .with_connection(|conn| WorkspaceRecordStore::new(conn).list())?
            .into_iter()
            .map(workspace_from_record)
            .collect()
    }

    /// Replace the description of an existing workspace.
    pub fn update_workspace(&self, name: &str, description: Option<&str>) -> Result<Workspace> {
        let changed = self.db.with_connection(|conn| {
            WorkspaceRecordStore::new(conn).update_description(name, description)
        })?;
        if changed == 0 {
            return Err(Error::WorkspaceNotFound {
                name: name.to_string(),
            });
        }
        self.get_workspace(name)
    }

    /// Delete a workspace and, through the cascade, its integrations.
    ///
    /// The `default` workspace is refused. A current pointer naming the
    /// deleted workspace is dropped in the same transaction.
    #[instrument(skip(self))]
    pub fn delete_workspace(&self, name: &str) -> Result<()> {
        if name == DEFAULT_WORKSPACE {
            return Err(Error::DefaultWorkspaceProtected);
        }
        let changed = self.db.transaction(|conn| {
            let changed = WorkspaceRecordStore::new(conn).delete(name)?;
            ConfigStore::new(conn).delete_if_value(CONFIG_CURRENT_WORKSPACE, name)?;
            Ok(changed)
        })?;
        if changed == 0 {
            return Err(Error::WorkspaceNotFound {
                name: name.to_string(),
            });
        }
        debug!(workspace = name, "workspace deleted");
        Ok(())
    }

    /// Point the current workspace at an existing workspace.
    pub fn set_current_workspace(&self, name: &str) -> Result<()> {
        self.get_workspace(name)?;
        self.db
            .with_connection(|conn| ConfigStore::new(conn).set(CONFIG_CURRENT_WORKSPACE, name))?;
        Ok(())
    }

    /// The current workspace name; `default` when unset.
    pub fn get_current_workspace(&self) -> Result<String> {
        let current = self
            .db
            .with_connection(|conn| ConfigStore::new(conn).get(CONFIG_CURRENT_WORKSPACE))?;
        Ok(current.unwrap_or_else(|| DEFAULT_WORKSPACE.to_string()))
    }
}

// Integrations
impl WorkspaceStore {
    /// Create an integration, assigning a fresh UUID and encrypting its credentials.
    #[instrument(skip(self, new), fields(name = %new.name, integration_type = %new.integration_type))]
    pub fn create_integration(&self, workspace: &str, new: NewIntegration) -> Result<Integration> {
        let record = NewIntegrationRecord {
            id: uuid::Uuid::new_v4().to_string(),
            workspace_name: workspace.to_string(),
            name: new.name.clone(),
            type_: new.integration_type.clone(),
            base_url: new.base_url.clone(),
            auth_type: new.auth.kind().as_str().to_string(),
            auth_data: self.seal(&new.auth)?,
            headers: serde_json::to_string(&new.headers)?,
            timeout_seconds: i64::try_from(new.timeout_seconds)
                .map_err(|_| Error::generic("timeout is out of range"))?,
        };

        let inserted = self
            .db
            .with_connection(|conn| IntegrationRecordStore::new(conn).insert(&record));
        match inserted {
            Ok(()) => {}
            Err(e) => {
                return Err(match e.constraint_kind() {
                    Some(ConstraintKind::ForeignKey) => Error::WorkspaceNotFound {
                        name: workspace.to_string(),
                    },
                    Some(ConstraintKind::Unique | ConstraintKind::PrimaryKey) => {
                        Error::IntegrationExists {
                            workspace: workspace.to_string(),
                            name: new.name,
                        }
                    }
                    _ => e.into(),
                })
            }
        }
        debug!(workspace, "integration created");
        self.get_integration(workspace, &record.name)
    }

    /// Fetch and decrypt one integration.
    pub fn get_integration(&self, workspace: &str, name: &str) -> Result<Integration> {
        let record = self
            .db
            .with_connection(|conn| IntegrationRecordStore::new(conn).get(workspace, name))?;
        match record {
            Some(record) => self.open_record(record),
            None => Err(Error::IntegrationNotFound {
                workspace: workspace.to_string(),
                name: name.to_string(),
            }),
        }
    }

    pub fn list_integrations(&self, workspace: &str) -> Result<Vec<Integration>> {
        let records = self.db.with_connection(|conn| {
            if WorkspaceRecordStore::new(conn).get(workspace)?.is_none() {
                return Ok(None);
            }
            IntegrationRecordStore::new(conn).list(workspace).map(Some)
        })?;
        self.open_records(workspace, records)
    }

    pub fn list_integrations_by_type(
        &self,
        workspace: &str,
        integration_type: &str,
    ) -> Result<Vec<Integration>> {
        let records = self.db.with_connection(|conn| {
            if WorkspaceRecordStore::new(conn).get(workspace)?.is_none() {
                return Ok(None);
            }
            IntegrationRecordStore::new(conn)
                .list_by_type(workspace, integration_type)
                .map(Some)
        })?;
        self.open_records(workspace, records)
    }

    /// Rewrite every mutable field of an integration. Name and workspace are
    /// the lookup key and stay fixed; credentials are always re-encrypted.
    #[instrument(skip(self, integration), fields(workspace = %integration.workspace_name, name = %integration.name))]
    pub fn update_integration(&self, integration: &Integration) -> Result<Integration> {
        let record = NewIntegrationRecord {
            id: integration.id.clone(),
            workspace_name: integration.workspace_name.clone(),
            name: integration.name.clone(),
            type_: integration.integration_type.clone(),
            base_url: integration.base_url.clone(),
            auth_type: integration.auth.kind().as_str().to_string(),
            auth_data: self.seal(&integration.auth)?,
            headers: serde_json::to_string(&integration.headers)?,
            timeout_seconds: i64::try_from(integration.timeout_seconds)
                .map_err(|_| Error::generic("timeout is out of range"))?,
        };
        let changed = self
            .db
            .with_connection(|conn| IntegrationRecordStore::new(conn).update(&record))?;
        if changed == 0 {
            return Err(Error::IntegrationNotFound {
                workspace: integration.workspace_name.clone(),
                name: integration.name.clone(),
            });
        }
        self.get_integration(&integration.workspace_name, &integration.name)
    }

    /// Hard delete.
    pub fn delete_integration(&self, workspace: &str, name: &str) -> Result<()> {
        let changed = self
            .db
            .with_connection(|conn| IntegrationRecordStore::new(conn).delete(workspace, name))?;
        if changed == 0 {
            return Err(Error::IntegrationNotFound {
                workspace: workspace.to_string(),
                name: name.to_string(),
            });
        }
        debug!(workspace, name, "integration deleted");
        Ok(())
    }

    fn seal(&self, auth: &AuthConfig) -> Result<Vec<u8>> {
        match auth.payload()? {
            Some(payload) => Ok(self.cipher.encrypt(&payload)?),
            None => Ok(Vec::new()),
        }
    }

    fn open_records(
        &self,
        workspace: &str,
        records: Option<Vec<IntegrationRecord>>,
    ) -> Result<Vec<Integration>> {
        let records = records.ok_or_else(|| Error::WorkspaceNotFound {
            name: workspace.to_string(),
        })?;
        records
            .into_iter()
            .map(|r| self.open_listed_record(r))
            .collect()
    }

    fn open_record(&self, record: IntegrationRecord) -> Result<Integration> {
        let kind: AuthKind = record.auth_type.parse()?;
        let auth = self.open_auth(kind, &record.auth_data)?;
        integration_from_record(record, auth)
    }

    /// Listing view of a row. Credentials that no longer decrypt are listed
    /// as empty so the rest of the workspace stays readable; fetching that
    /// integration by name still fails.
    fn open_listed_record(&self, record: IntegrationRecord) -> Result<Integration> {
        let kind: AuthKind = record.auth_type.parse()?;
        let auth = match self.open_auth(kind, &record.auth_data) {
            Err(Error::InvalidCiphertext) => {
                warn!(
                    workspace = %record.workspace_name,
                    name = %record.name,
                    "integration credentials cannot be decrypted"
                );
                AuthConfig::empty(kind)
            }
            other => other?,
        };
        integration_from_record(record, auth)
    }

    fn open_auth(&self, kind: AuthKind, auth_data: &[u8]) -> Result<AuthConfig> {
        if auth_data.is_empty() {
            return Ok(AuthConfig::empty(kind));
        }
        let plaintext = self.cipher.decrypt(auth_data)?;
        AuthConfig::from_payload(kind, &plaintext)
    }
}

fn integration_from_record(record: IntegrationRecord, auth: AuthConfig) -> Result<Integration> {
    let headers: BTreeMap<String, String> = if record.headers.trim().is_empty() {
        BTreeMap::new()
    } else {
        serde_json::from_str(&record.headers)?
    };

    Ok(Integration {
        id: record.id,
        workspace_name: record.workspace_name,
        name: record.name,
        integration_type: record.type_,
        base_url: record.base_url,
        auth,
        headers,
        timeout_seconds: u64::try_from(record.timeout_seconds)
            .map_err(|_| Error::generic("timeout is out of range"))?,
        created_at: parse_timestamp(&record.created_at)?,
        updated_at: parse_timestamp(&record.updated_at)?,
    })
}

fn workspace_from_record(record: WorkspaceRecord) -> Result<Workspace> {
    Ok(Workspace {
        name: record.name,
        description: record.description,
        created_at: parse_timestamp(&record.created_at)?,
        updated_at: parse_timestamp(&record.updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_crypto::generate_key;

    fn store() -> WorkspaceStore {
        WorkspaceStore::open_in_memory(&generate_key().unwrap()).unwrap()
    }

    #[test]
    fn test_ciphertext_on_disk_differs_from_plaintext() {
        let store = store();
        store
            .create_integration(
                DEFAULT_WORKSPACE,
                NewIntegration::new("github", "github").with_auth(AuthConfig::Token {
                    token: "ghp_secret".into(),
                }),
            )
            .unwrap();

        let raw = store
            .database()
            .with_connection(|conn| IntegrationRecordStore::new(conn).get(DEFAULT_WORKSPACE, "github"))
            .unwrap()
            .unwrap();
        assert_eq!(raw.auth_type, "token");
        assert!(!raw.auth_data.is_empty());
        let needle = b"ghp_secret";
        assert!(!raw.auth_data.windows(needle.len()).any(|w| w == needle));
    }

    #[test]
    fn test_none_auth_stores_empty_blob() {
        let store = store();
        store
            .create_integration(DEFAULT_WORKSPACE, NewIntegration::new("public", "http"))
            .unwrap();
        let raw = store
            .database()
            .with_connection(|conn| IntegrationRecordStore::new(conn).get(DEFAULT_WORKSPACE, "public"))
            .unwrap()
            .unwrap();
        assert!(raw.auth_data.is_empty());
    }

    #[test]
    fn test_reencrypts_on_every_update() {
        let store = store();
        let created = store
            .create_integration(
                DEFAULT_WORKSPACE,
                NewIntegration::new("github", "github").with_auth(AuthConfig::Token {
                    token: "ghp_secret".into(),
                }),
            )
            .unwrap();
        let read_blob = || {
            store
                .database()
                .with_connection(|conn| {
                    IntegrationRecordStore::new(conn).get(DEFAULT_WORKSPACE, "github")
                })
                .unwrap()
                .unwrap()
                .auth_data
        };
        let before = read_blob();
        store.update_integration(&created).unwrap();
        assert_ne!(before, read_blob());
    }

    #[test]
    fn test_negative_stored_timeout_is_rejected() {
        let store = store();
        store
            .create_integration(DEFAULT_WORKSPACE, NewIntegration::new("public", "http"))
            .unwrap();
        store
            .database()
            .with_connection(|conn| {
                conn.execute("UPDATE integrations SET timeout_seconds = -5", [])?;
                Ok(())
            })
            .unwrap();

        match store.get_integration(DEFAULT_WORKSPACE, "public") {
            Err(Error::Generic(message)) => assert!(message.contains("timeout")),
            other => panic!("expected out of range timeout, got {:?}", other),
        }
    }
}
