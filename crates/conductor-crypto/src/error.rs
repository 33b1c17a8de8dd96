//! Error types for credential encryption and key management.

use thiserror::Error;

/// Errors produced by the crypto core.
///
/// Decryption deliberately collapses every failure into [`CryptoError::InvalidCiphertext`]
/// so callers cannot tell a tampered blob from a corrupted one.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("cannot encrypt empty input")]
    EmptyInput,

    #[error("invalid ciphertext")]
    InvalidCiphertext,

    #[error("invalid key: {reason}")]
    InvalidKey { reason: String },

    #[error("random number generator failure: {0}")]
    Rng(String),

    #[error("encryption failed")]
    Encrypt,

    #[error(transparent)]
    Keychain(#[from] KeychainError),
}

impl CryptoError {
    pub(crate) fn invalid_key<S: Into<String>>(reason: S) -> Self {
        Self::InvalidKey {
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by a secret store backend.
#[derive(Debug, Clone, Error)]
pub enum KeychainError {
    #[error("keychain not available on this system; set CONDUCTOR_MASTER_KEY instead")]
    NotAvailable,

    #[error("keychain error: {0}")]
    Backend(String),
}

impl From<keyring::Error> for KeychainError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::NoStorageAccess(_) | keyring::Error::PlatformFailure(_) => {
                KeychainError::NotAvailable
            }
            other => KeychainError::Backend(other.to_string()),
        }
    }
}

/// Result type for crypto operations.
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Result type for keychain operations.
pub type KeychainResult<T> = std::result::Result<T, KeychainError>;
