//! Shared state for interactive commands: the encrypted store, the audit log
//! and the effective workspace.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use conductor_audit::{AuditLog, JsonLineSink};
use conductor_core::{IntegrationService, WorkspaceStore, STORE_OPEN_TIMEOUT};
use conductor_crypto::get_or_create_master_key;
use conductor_local_db::Database;
use conductor_rest_client::{DaemonClient, REQUEST_TIMEOUT};
use tracing::{debug, warn};

/// Environment variable selecting the workspace (below `--workspace`).
pub const WORKSPACE_ENV: &str = "CONDUCTOR_WORKSPACE";

/// Audit log file inside the conductor home directory.
pub const AUDIT_LOG_FILE: &str = "audit.log";

/// Deadline for any single interactive operation.
pub const INTERACTIVE_TIMEOUT: Duration = REQUEST_TIMEOUT;

#[derive(Clone)]
pub struct AppContext {
    store: WorkspaceStore,
    audit: AuditLog,
    workspace_override: Option<String>,
}

impl AppContext {
    /// Resolve the master key, open the default store and the audit log.
    pub async fn open(workspace_override: Option<String>) -> Result<Self> {
        let key = tokio::time::timeout(
            STORE_OPEN_TIMEOUT,
            tokio::task::spawn_blocking(get_or_create_master_key),
        )
        .await
        .map_err(|_| conductor_core::Error::timeout("master key resolution"))?
        .context("master key resolution task failed")?
        .context("failed to resolve the workspace master key")?;

        let path = Database::default_path().context("failed to locate the conductor home")?;
        debug!(path = %path.display(), "opening workspace store");
        let store = WorkspaceStore::open_with_timeout(path, key, STORE_OPEN_TIMEOUT)
            .await
            .context("failed to open the workspace store")?;

        Ok(Self::new(store, open_audit_log(), workspace_override))
    }

    pub fn new(store: WorkspaceStore, audit: AuditLog, workspace_override: Option<String>) -> Self {
        Self {
            store,
            audit,
            workspace_override: workspace_override.filter(|name| !name.trim().is_empty()),
        }
    }

    pub fn store(&self) -> &WorkspaceStore {
        &self.store
    }

    pub fn audit(&self) -> AuditLog {
        self.audit.clone()
    }

    pub fn service(&self) -> IntegrationService<'_> {
        IntegrationService::new(&self.store, self.audit.clone())
    }

    /// Run store work on a blocking thread, bounded by the interactive deadline.
    pub async fn blocking<F, T>(&self, operation: &str, work: F) -> Result<T>
    where
        F: FnOnce(&AppContext) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        blocking_within(INTERACTIVE_TIMEOUT, operation, self.clone(), work).await
    }

    /// The workspace commands act on: `--workspace` / `CONDUCTOR_WORKSPACE`,
    /// then the stored current pointer, then `default`.
    pub fn workspace(&self) -> Result<String> {
        match &self.workspace_override {
            Some(name) => Ok(name.clone()),
            None => Ok(self.store.get_current_workspace()?),
        }
    }
}

fn open_audit_log() -> AuditLog {
    let home = match Database::home_dir() {
        Ok(home) => home,
        Err(e) => {
            warn!("audit log disabled: {}", e);
            return AuditLog::disabled();
        }
    };
    match JsonLineSink::open_file(home.join(AUDIT_LOG_FILE)) {
        Ok(sink) => AuditLog::new(Arc::new(sink)),
        Err(e) => {
            warn!("audit log disabled: {}", e);
            AuditLog::disabled()
        }
    }
}

/// Daemon client honoring `CONDUCTOR_HOST`.
pub fn daemon_client() -> Result<DaemonClient> {
    DaemonClient::from_env().context("invalid controller daemon address")
}

/// Bound `future` by the interactive deadline.
pub async fn with_deadline<F, T>(operation: &str, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    with_deadline_of(INTERACTIVE_TIMEOUT, operation, future).await
}

async fn with_deadline_of<F, T>(limit: Duration, operation: &str, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(conductor_core::Error::timeout(operation).into()),
    }
}

async fn blocking_within<F, T>(
    limit: Duration,
    operation: &str,
    ctx: AppContext,
    work: F,
) -> Result<T>
where
    F: FnOnce(&AppContext) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let task = tokio::task::spawn_blocking(move || work(&ctx));
    with_deadline_of(limit, operation, async move {
        match task.await {
            Ok(result) => result,
            Err(join_error) if join_error.is_panic() => {
                std::panic::resume_unwind(join_error.into_panic())
            }
            Err(join_error) => Err(anyhow::anyhow!("{} task failed: {}", operation, join_error)),
        }
    })
    .await
}

/// Run `future` until it completes or the user interrupts it.
pub async fn interruptible<F, T>(future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        result = future => result,
        _ = tokio::signal::ctrl_c() => Err(conductor_core::Error::Cancelled.into()),
    }
}
