//! Core error types for Conductor workspace operations.

use std::path::PathBuf;

use conductor_crypto::{CryptoError, KeychainError};

/// Why a requirement could not be bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingFailure {
    /// The explicitly named integration does not exist in the workspace.
    ExplicitTargetMissing { integration: String },
    /// The explicitly named integration has a different type.
    TypeMismatch {
        integration: String,
        expected: String,
        actual: String,
    },
    /// Aliased requirements never auto-bind.
    AliasNeedsExplicitBinding,
    /// Two requirements in one workflow share an identifier.
    DuplicateIdentifier,
    /// Requirement text is neither `type` nor `type as alias`.
    InvalidRequirement,
    /// An `identifier=name` pair could not be parsed.
    MalformedPair,
}

impl std::fmt::Display for BindingFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BindingFailure::ExplicitTargetMissing { integration } => {
                write!(f, "explicitly bound integration '{}' does not exist", integration)
            }
            BindingFailure::TypeMismatch {
                integration,
                expected,
                actual,
            } => write!(
                f,
                "integration '{}' has type '{}' but type '{}' is required",
                integration, actual, expected
            ),
            BindingFailure::AliasNeedsExplicitBinding => write!(
                f,
                "aliased requirements need an explicit binding (--bind-integration <alias>=<name>)"
            ),
            BindingFailure::DuplicateIdentifier => {
                write!(f, "declared more than once in the workflow")
            }
            BindingFailure::InvalidRequirement => {
                write!(f, "expected \"<type>\" or \"<type> as <alias>\"")
            }
            BindingFailure::MalformedPair => write!(f, "expected <identifier>=<integration>"),
        }
    }
}

/// Core error type for all Conductor workspace operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("workspace '{name}' not found")]
    WorkspaceNotFound { name: String },

    #[error("workspace '{name}' already exists")]
    WorkspaceExists { name: String },

    #[error("the default workspace cannot be deleted")]
    DefaultWorkspaceProtected,

    #[error("invalid workspace name '{name}': {reason}")]
    InvalidWorkspaceName { name: String, reason: String },

    #[error("integration '{name}' not found in workspace '{workspace}'")]
    IntegrationNotFound { workspace: String, name: String },

    #[error("integration '{name}' already exists in workspace '{workspace}'")]
    IntegrationExists { workspace: String, name: String },

    #[error(
        "no integration of type '{integration_type}' in workspace '{workspace}'\n  \
         hint: add one with `conductor integrations add <name> --type {integration_type}` \
         or set {env_hint}"
    )]
    NoIntegrationOfType {
        integration_type: String,
        workspace: String,
        env_hint: String,
    },

    #[error(
        "multiple integrations of type '{integration_type}' in workspace '{workspace}': {}\n  \
         hint: choose one with --bind-integration {identifier}=<name>",
        .candidates.join(", ")
    )]
    MultipleIntegrationsOfType {
        integration_type: String,
        workspace: String,
        identifier: String,
        candidates: Vec<String>,
    },

    #[error("binding error for '{identifier}': {reason}")]
    Binding {
        identifier: String,
        reason: BindingFailure,
    },

    #[error("invalid master key: {0}")]
    InvalidKey(String),

    #[error("invalid ciphertext: stored credentials could not be decrypted")]
    InvalidCiphertext,

    #[error("keychain unavailable; set CONDUCTOR_MASTER_KEY instead")]
    KeychainUnavailable,

    #[error("{operation} timed out")]
    Timeout { operation: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("refusing to read {}: mode {mode:04o} is more permissive than 0600", .path.display())]
    PermissionTooLoose { path: PathBuf, mode: u32 },

    #[error("integration test for '{name}' failed: {message}")]
    IntegrationTestFailed { name: String, message: String },

    #[error("invalid workflow {}: {message}", .path.display())]
    InvalidWorkflow { path: PathBuf, message: String },

    #[error("Crypto error: {0}")]
    Crypto(CryptoError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Database error: {0}")]
    Database(#[from] conductor_local_db::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

impl From<CryptoError> for Error {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::InvalidKey { reason } => Error::InvalidKey(reason),
            CryptoError::InvalidCiphertext => Error::InvalidCiphertext,
            CryptoError::Keychain(KeychainError::NotAvailable) => Error::KeychainUnavailable,
            other => Error::Crypto(other),
        }
    }
}

impl Error {
    /// Create a new binding error for a requirement identifier.
    pub fn binding<S: Into<String>>(identifier: S, reason: BindingFailure) -> Self {
        Self::Binding {
            identifier: identifier.into(),
            reason,
        }
    }

    pub fn timeout<S: Into<String>>(operation: S) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Create a new generic error.
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Stable snake_case name of the error kind, as recorded in audit events.
    pub fn category(&self) -> &'static str {
        match self {
            Error::WorkspaceNotFound { .. } => "workspace_not_found",
            Error::WorkspaceExists { .. } => "workspace_exists",
            Error::DefaultWorkspaceProtected => "default_workspace_protected",
            Error::InvalidWorkspaceName { .. } => "invalid_workspace_name",
            Error::IntegrationNotFound { .. } => "integration_not_found",
            Error::IntegrationExists { .. } => "integration_exists",
            Error::NoIntegrationOfType { .. } => "no_integration_of_type",
            Error::MultipleIntegrationsOfType { .. } => "multiple_integrations_of_type",
            Error::Binding { .. } => "binding_error",
            Error::InvalidKey(_) => "invalid_key",
            Error::InvalidCiphertext => "invalid_ciphertext",
            Error::KeychainUnavailable => "keychain_unavailable",
            Error::Timeout { .. } => "timeout",
            Error::Cancelled => "cancelled",
            Error::PermissionTooLoose { .. } => "permission_too_loose",
            Error::IntegrationTestFailed { .. } => "integration_test_failed",
            Error::InvalidWorkflow { .. } => "invalid_workflow",
            Error::Crypto(_) => "crypto",
            Error::Io(_) => "io",
            Error::Serde(_) | Error::Yaml(_) => "serialization",
            Error::Database(_) => "database",
            Error::Generic(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crypto_errors_map_onto_taxonomy() {
        assert!(matches!(
            Error::from(CryptoError::InvalidCiphertext),
            Error::InvalidCiphertext
        ));
        assert!(matches!(
            Error::from(CryptoError::Keychain(KeychainError::NotAvailable)),
            Error::KeychainUnavailable
        ));
        assert!(matches!(Error::from(CryptoError::EmptyInput), Error::Crypto(_)));
    }

    #[test]
    fn test_multiple_integrations_message_lists_candidates() {
        let err = Error::MultipleIntegrationsOfType {
            integration_type: "github".into(),
            workspace: "default".into(),
            identifier: "github".into(),
            candidates: vec!["github".into(), "work".into()],
        };
        let message = err.to_string();
        assert!(message.contains("github, work"));
        assert!(message.contains("--bind-integration github=<name>"));
        assert_eq!(err.category(), "multiple_integrations_of_type");
    }

    #[test]
    fn test_no_integration_message_names_env_hint() {
        let err = Error::NoIntegrationOfType {
            integration_type: "github".into(),
            workspace: "default".into(),
            env_hint: "GITHUB_TOKEN".into(),
        };
        assert!(err.to_string().contains("GITHUB_TOKEN"));
    }
}
