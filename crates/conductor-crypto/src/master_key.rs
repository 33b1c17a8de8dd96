//! Master key resolution: keychain, then environment, then generate.

use std::sync::{Mutex, OnceLock};

use tracing::{debug, info, warn};

use crate::cipher::{generate_key, MasterKey};
use crate::error::Result;
use crate::keychain::{OsKeychain, SecretStore, MASTER_KEY_ENTRY};

/// Environment variable carrying a base64 master key.
pub const MASTER_KEY_ENV: &str = "CONDUCTOR_MASTER_KEY";

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Where a resolved key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeySource {
    Keychain,
    Environment,
    Generated,
}

/// Resolves the installation's master key and memoizes it for the life of the resolver.
///
/// The memo mutex is held for the whole cascade, so concurrent callers in one
/// process can never generate two different keys.
pub struct MasterKeyResolver<S> {
    store: S,
    env: EnvLookup,
    resolved: Mutex<Option<(MasterKey, KeySource)>>,
}

impl<S: SecretStore> MasterKeyResolver<S> {
    pub fn new(store: S) -> Self {
        Self::with_env_lookup(store, |name| std::env::var(name).ok())
    }

    pub fn with_env_lookup<F>(store: S, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            store,
            env: Box::new(lookup),
            resolved: Mutex::new(None),
        }
    }

    #[cfg(test)]
    fn store(&self) -> &S {
        &self.store
    }

    /// Return the master key, resolving it on first use.
    pub fn get_or_create(&self) -> Result<MasterKey> {
        let (key, source) = self.get_or_create_with_source()?;
        debug!(?source, "master key ready");
        Ok(key)
    }

    pub(crate) fn get_or_create_with_source(&self) -> Result<(MasterKey, KeySource)> {
        let mut resolved = self.resolved.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some((key, source)) = resolved.as_ref() {
            return Ok((key.clone(), *source));
        }

        let (key, source) = self.resolve()?;
        *resolved = Some((key.clone(), source));
        Ok((key, source))
    }

    fn resolve(&self) -> Result<(MasterKey, KeySource)> {
        match self.store.get(MASTER_KEY_ENTRY) {
            Ok(Some(encoded)) => {
                debug!("master key loaded from keychain");
                return Ok((MasterKey::from_base64(&encoded)?, KeySource::Keychain));
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "keychain unavailable, running in degraded mode"),
        }

        if let Some(encoded) = (self.env)(MASTER_KEY_ENV).filter(|v| !v.trim().is_empty()) {
            debug!("master key loaded from {}", MASTER_KEY_ENV);
            return Ok((MasterKey::from_base64(&encoded)?, KeySource::Environment));
        }

        let key = generate_key()?;
        match self.store.set(MASTER_KEY_ENTRY, &key.to_base64()) {
            Ok(()) => info!("generated new master key and stored it in the keychain"),
            Err(e) => {
                warn!(error = %e, "could not store generated master key in keychain");
                eprintln!("Warning: the OS keychain is unavailable ({}).", e);
                eprintln!("A new master key was generated for this installation. To keep access to");
                eprintln!("stored credentials, set it in your environment before the next run:");
                eprintln!();
                eprintln!("    export {}={}", MASTER_KEY_ENV, key.to_base64());
                eprintln!();
            }
        }
        Ok((key, KeySource::Generated))
    }
}

static PROCESS_RESOLVER: OnceLock<MasterKeyResolver<OsKeychain>> = OnceLock::new();

/// Process-wide master key backed by the OS keychain and `CONDUCTOR_MASTER_KEY`.
pub fn get_or_create_master_key() -> Result<MasterKey> {
    PROCESS_RESOLVER
        .get_or_init(|| MasterKeyResolver::new(OsKeychain::new()))
        .get_or_create()
}
