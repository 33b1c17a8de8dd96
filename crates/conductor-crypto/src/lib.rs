//! Credential encryption for the Conductor workspace store.
//!
//! This crate provides the AES-256-GCM cipher used for integration
//! credentials and the master key cascade (OS keychain, then
//! `CONDUCTOR_MASTER_KEY`, then a freshly generated key).

pub mod cipher;
pub mod error;
pub mod keychain;
pub mod master_key;

pub use cipher::{generate_key, Cipher, MasterKey, KEY_SIZE, NONCE_SIZE};
pub use error::{CryptoError, KeychainError, KeychainResult, Result};
pub use keychain::{MemorySecretStore, OsKeychain, SecretStore, MASTER_KEY_ENTRY, SERVICE_NAME};
pub use master_key::{get_or_create_master_key, MasterKeyResolver, MASTER_KEY_ENV};
