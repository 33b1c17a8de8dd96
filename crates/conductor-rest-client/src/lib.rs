//! HTTP client for the Conductor controller daemon
//!
//! This crate provides the transport layer for the daemon's control-plane
//! API (runs and MCP servers) plus the header plumbing used to probe
//! integration endpoints. It carries no business logic and never retries.

pub mod auth;
pub mod client;
pub mod error;
pub mod probe;

pub use auth::*;
pub use client::*;
pub use error::*;
pub use probe::*;

use async_trait::async_trait;
use conductor_rest_api_contract::{McpServerInfo, RunSummary};

/// The slice of the daemon API that the completion engine and the CLI
/// consume through a seam, so tests can substitute a fake.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn list_runs(&self) -> ClientResult<Vec<RunSummary>>;

    async fn list_mcp_servers(&self) -> ClientResult<Vec<McpServerInfo>>;
}

#[async_trait]
impl ControlPlane for client::DaemonClient {
    async fn list_runs(&self) -> ClientResult<Vec<RunSummary>> {
        client::DaemonClient::list_runs(self).await
    }

    async fn list_mcp_servers(&self) -> ClientResult<Vec<McpServerInfo>> {
        client::DaemonClient::list_mcp_servers(self).await
    }
}
