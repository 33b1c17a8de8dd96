//! Secret store backends for the master key.
//!
//! The OS keychain is reached through the `keyring` crate. Availability is
//! probed once when the backend is built and downgraded lazily whenever the
//! platform reports it cannot reach its storage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::error::{KeychainError, KeychainResult};

/// Keychain service name for every Conductor entry.
pub const SERVICE_NAME: &str = "conductor";

/// Keychain item holding the base64 master key.
pub const MASTER_KEY_ENTRY: &str = "workspace-master-key";

/// A place where named secrets can be read and written.
pub trait SecretStore: Send + Sync {
    /// Read a secret. `Ok(None)` means the entry does not exist.
    fn get(&self, name: &str) -> KeychainResult<Option<String>>;

    /// Write (or overwrite) a secret.
    fn set(&self, name: &str, value: &str) -> KeychainResult<()>;

    /// Whether the backend is believed to be reachable.
    fn is_available(&self) -> bool;
}

/// The platform keychain (macOS Keychain, Secret Service, Windows Credential Manager).
#[derive(Debug)]
pub struct OsKeychain {
    service: String,
    available: AtomicBool,
}

impl OsKeychain {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        let service = service.into();
        let available = keyring::Entry::new(&service, "availability-probe").is_ok();
        if !available {
            debug!(service = %service, "OS keychain not available");
        }
        Self {
            service,
            available: AtomicBool::new(available),
        }
    }

    fn entry(&self, name: &str) -> KeychainResult<keyring::Entry> {
        if !self.is_available() {
            return Err(KeychainError::NotAvailable);
        }
        keyring::Entry::new(&self.service, name).map_err(|e| self.observe(e.into()))
    }

    fn observe(&self, err: KeychainError) -> KeychainError {
        if matches!(err, KeychainError::NotAvailable) {
            warn!(service = %self.service, "marking OS keychain unavailable");
            self.available.store(false, Ordering::SeqCst);
        }
        err
    }
}

impl Default for OsKeychain {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretStore for OsKeychain {
    fn get(&self, name: &str) -> KeychainResult<Option<String>> {
        let entry = self.entry(name)?;
        match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(self.observe(e.into())),
        }
    }

    fn set(&self, name: &str, value: &str) -> KeychainResult<()> {
        let entry = self.entry(name)?;
        entry.set_password(value).map_err(|e| self.observe(e.into()))
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}

/// In-process secret store, used when no OS keychain should be touched.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    entries: Mutex<HashMap<String, String>>,
    unavailable: bool,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that behaves like a locked or missing keychain.
    pub fn unavailable() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            unavailable: true,
        }
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self, name: &str) -> KeychainResult<Option<String>> {
        if self.unavailable {
            return Err(KeychainError::NotAvailable);
        }
        let entries = self.entries.lock().map_err(|e| KeychainError::Backend(e.to_string()))?;
        Ok(entries.get(name).cloned())
    }

    fn set(&self, name: &str, value: &str) -> KeychainResult<()> {
        if self.unavailable {
            return Err(KeychainError::NotAvailable);
        }
        let mut entries =
            self.entries.lock().map_err(|e| KeychainError::Backend(e.to_string()))?;
        entries.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn is_available(&self) -> bool {
        !self.unavailable
    }
}
