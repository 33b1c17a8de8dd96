//! Core workspace and binding logic for the Conductor frontend.
//!
//! This crate owns the encrypted [`WorkspaceStore`], the audited
//! [`IntegrationService`], the [`BindingResolver`] that maps workflow
//! requirements onto stored integrations, and the YAML configuration files
//! read by the CLI and the completion engine.

pub mod binding;
pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod requirement;
pub mod service;
pub mod store;
pub mod workflow;

/// Core result type used throughout Conductor.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type that encompasses all workspace operations.
pub use error::{BindingFailure, Error};

/// Domain model.
pub use model::{
    validate_workspace_name, AuthConfig, AuthKind, Integration, NewIntegration, Workspace,
    DEFAULT_TIMEOUT_SECS,
};

/// Encrypted persistence.
pub use store::{WorkspaceStore, STORE_OPEN_TIMEOUT};

/// Audited credential access.
pub use service::{changed_fields, AuditContext, IntegrationService};

/// Requirement parsing and binding resolution.
pub use binding::{
    merge_bindings, parse_bindings, token_env_var, BindingResolver, ExplicitBindings,
    ResolvedBinding, BIND_INTEGRATION_ENV,
};
pub use requirement::{parse_requirements, Requirement};

/// Workflow headers.
pub use workflow::{has_top_level_name, WorkflowDefinition};

/// Redacted export.
pub use export::{export_workspace, ExportFormat, WorkspaceExport};

/// Configuration files.
pub use config::{ConductorConfig, ConfigPaths, McpConfig};

pub use conductor_local_db::DEFAULT_WORKSPACE;
