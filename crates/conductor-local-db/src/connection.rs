//! Database connection management.

use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// File name of the store inside the Conductor home directory.
pub const DATABASE_FILE_NAME: &str = "conductor.db";

/// How long a writer waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database connection wrapper.
///
/// Clones share one connection; writers serialize on its mutex. Once
/// [`Database::close`] has run every operation fails with [`crate::Error::Closed`].
#[derive(Debug, Clone)]
pub struct Database {
    connection: Arc<Mutex<Option<Connection>>>,
}

impl Database {
    /// Get the Conductor home directory.
    ///
    /// Priority order:
    /// 1. `CONDUCTOR_HOME` environment variable
    /// 2. `~/.conductor`
    pub fn home_dir() -> crate::Result<PathBuf> {
        if let Some(home) = std::env::var_os("CONDUCTOR_HOME").filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(home));
        }
        dirs::home_dir()
            .map(|home| home.join(".conductor"))
            .ok_or_else(|| crate::Error::generic("could not determine home directory"))
    }

    /// Get the default database path (`<conductor-home>/conductor.db`).
    pub fn default_path() -> crate::Result<PathBuf> {
        Ok(Self::home_dir()?.join(DATABASE_FILE_NAME))
    }
}

impl Database {
    /// Open a new database connection at the specified path.
    ///
    /// Missing parent directories are created with mode `0700`; the database
    /// file itself is created on first open.
    pub fn open<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_private_dir(parent)?;
        }
        debug!(path = %path.display(), "opening workspace database");
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn, true)?;
        Ok(Self::from_connection(conn))
    }

    /// Open an existing database without writing to it.
    ///
    /// Migrations are skipped, so callers must tolerate a schema written by
    /// any earlier version. A missing file is an error.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening workspace database read-only");
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
                | OpenFlags::SQLITE_OPEN_URI,
        )?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self::from_connection(conn))
    }

    /// Open an in-memory database for testing.
    pub fn open_in_memory() -> crate::Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn, false)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            connection: Arc::new(Mutex::new(Some(conn))),
        }
    }

    /// Initialize the database schema.
    fn initialize_schema(conn: &Connection, wal: bool) -> crate::Result<()> {
        if wal {
            let mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
            debug!(journal_mode = %mode, "journal mode set");
        }
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        crate::migrations::MigrationManager::migrate(conn)?;
        crate::migrations::MigrationManager::ensure_default_workspace(conn)?;

        Ok(())
    }

    /// Run `f` against the open connection.
    pub fn with_connection<F, T>(&self, f: F) -> crate::Result<T>
    where
        F: FnOnce(&Connection) -> crate::Result<T>,
    {
        let guard = self.connection.lock().map_err(|e| {
            crate::Error::generic(format!("Failed to acquire database lock: {}", e))
        })?;
        let conn = guard.as_ref().ok_or(crate::Error::Closed)?;
        f(conn)
    }

    /// Execute a transaction with automatic rollback on error.
    pub fn transaction<F, T>(&self, f: F) -> crate::Result<T>
    where
        F: FnOnce(&Connection) -> crate::Result<T>,
    {
        self.with_connection(|conn| {
            let tx = conn.unchecked_transaction()?;
            match f(&tx) {
                Ok(result) => {
                    tx.commit()?;
                    Ok(result)
                }
                Err(e) => {
                    tx.rollback()?;
                    Err(e)
                }
            }
        })
    }

    /// Close the connection. Closing twice is a no-op.
    pub fn close(&self) -> crate::Result<()> {
        let mut guard = self.connection.lock().map_err(|e| {
            crate::Error::generic(format!("Failed to acquire database lock: {}", e))
        })?;
        if let Some(conn) = guard.take() {
            conn.close().map_err(|(_, e)| crate::Error::from(e))?;
            debug!("workspace database closed");
        }
        Ok(())
    }
}

#[cfg(unix)]
fn create_private_dir(path: &Path) -> crate::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    if path.is_dir() {
        return Ok(());
    }
    std::fs::DirBuilder::new().recursive(true).mode(0o700).create(path)?;
    Ok(())
}

#[cfg(not(unix))]
fn create_private_dir(path: &Path) -> crate::Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}
