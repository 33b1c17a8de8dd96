//! API contract types for the Conductor controller daemon

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ContractError, ContractResult};

/// Run lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub const ALL: [RunStatus; 5] = [
        RunStatus::Pending,
        RunStatus::Running,
        RunStatus::Completed,
        RunStatus::Failed,
        RunStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
        }
    }

    /// Pending or running.
    pub fn is_active(&self) -> bool {
        matches!(self, RunStatus::Pending | RunStatus::Running)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Projection of a run as listed by `GET /v1/runs`.
///
/// The daemon sends more fields; only these three are read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: String,
    pub workflow: String,
    pub status: RunStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunListResponse {
    #[serde(default)]
    pub runs: Vec<RunSummary>,
}

/// MCP server process states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum McpServerStatus {
    Running,
    Stopped,
    Starting,
    Error,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for McpServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            McpServerStatus::Running => "running",
            McpServerStatus::Stopped => "stopped",
            McpServerStatus::Starting => "starting",
            McpServerStatus::Error => "error",
            McpServerStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpServerInfo {
    pub name: String,
    pub status: McpServerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub restart_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McpServerListResponse {
    #[serde(default)]
    pub servers: Vec<McpServerInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpTool {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McpToolsResponse {
    #[serde(default)]
    pub tools: Vec<McpTool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpHealth {
    pub healthy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McpLogsResponse {
    #[serde(default)]
    pub lines: Vec<String>,
}

/// Body of `POST /v1/mcp/servers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterServerRequest {
    pub name: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl RegisterServerRequest {
    pub fn validate(&self) -> ContractResult<()> {
        if self.name.is_empty() {
            return Err(ContractError::EmptyField { field: "name" });
        }
        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(ContractError::InvalidServerName {
                name: self.name.clone(),
            });
        }
        if self.command.trim().is_empty() {
            return Err(ContractError::EmptyField { field: "command" });
        }
        Ok(())
    }
}

/// Error body returned with any status >= 400.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_list_ignores_extra_fields() {
        let body = r#"{"runs":[{"id":"run-001","workflow":"test","status":"running","started_at":"2026-01-01T00:00:00Z"}]}"#;
        let parsed: RunListResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.runs.len(), 1);
        assert_eq!(parsed.runs[0].status, RunStatus::Running);
        assert!(parsed.runs[0].status.is_active());
    }

    #[test]
    fn test_unknown_server_status_is_tolerated() {
        let info: McpServerInfo =
            serde_json::from_str(r#"{"name":"fs","status":"degraded"}"#).unwrap();
        assert_eq!(info.status, McpServerStatus::Unknown);
        assert_eq!(info.restart_count, 0);
    }

    #[test]
    fn test_register_request_validation() {
        let mut request = RegisterServerRequest {
            name: "fs".into(),
            command: "mcp-fs".into(),
            args: vec![],
            env: BTreeMap::new(),
        };
        assert!(request.validate().is_ok());

        request.name = "bad name".into();
        assert!(matches!(
            request.validate(),
            Err(ContractError::InvalidServerName { .. })
        ));

        request.name = "fs".into();
        request.command = " ".into();
        assert_eq!(
            request.validate(),
            Err(ContractError::EmptyField { field: "command" })
        );
    }
}
