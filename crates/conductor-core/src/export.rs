//! Redacted workspace export.

use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{AuthConfig, Integration};
use crate::store::WorkspaceStore;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Yaml,
    Json,
}

impl std::str::FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(ExportFormat::Yaml),
            "json" => Ok(ExportFormat::Json),
            other => Err(Error::generic(format!("unknown export format '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedIntegration {
    pub name: String,
    #[serde(rename = "type")]
    pub integration_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub auth: AuthConfig,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    pub timeout: u64,
}

impl From<&Integration> for ExportedIntegration {
    fn from(integration: &Integration) -> Self {
        Self {
            name: integration.name.clone(),
            integration_type: integration.integration_type.clone(),
            base_url: integration.base_url.clone(),
            auth: integration.auth.redacted(),
            headers: integration.headers.clone(),
            timeout: integration.timeout_seconds,
        }
    }
}

/// A workspace with every credential replaced by remediation text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceExport {
    pub workspace: String,
    pub exported_at: String,
    pub integrations: Vec<ExportedIntegration>,
}

impl WorkspaceExport {
    pub fn render(&self, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Yaml => Ok(serde_yaml::to_string(self)?),
            ExportFormat::Json => {
                let mut json = serde_json::to_string_pretty(self)?;
                json.push('\n');
                Ok(json)
            }
        }
    }
}

/// Build the redacted export of one workspace.
pub fn export_workspace(store: &WorkspaceStore, workspace: &str) -> Result<WorkspaceExport> {
    store.get_workspace(workspace)?;
    let integrations = store.list_integrations(workspace)?;
    Ok(WorkspaceExport {
        workspace: workspace.to_string(),
        exported_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        integrations: integrations.iter().map(ExportedIntegration::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewIntegration;
    use conductor_crypto::generate_key;
    use conductor_local_db::DEFAULT_WORKSPACE;

    #[test]
    fn test_export_never_contains_secrets() {
        let store = WorkspaceStore::open_in_memory(&generate_key().unwrap()).unwrap();
        store
            .create_integration(
                DEFAULT_WORKSPACE,
                NewIntegration::new("jira", "jira")
                    .with_base_url("https://example.atlassian.net")
                    .with_auth(AuthConfig::Basic {
                        username: "octo".into(),
                        password: "hunter2".into(),
                    }),
            )
            .unwrap();
        store
            .create_integration(
                DEFAULT_WORKSPACE,
                NewIntegration::new("search", "brave").with_auth(AuthConfig::ApiKey {
                    header: "X-Subscription-Token".into(),
                    value: "sk-live".into(),
                }),
            )
            .unwrap();

        let export = export_workspace(&store, DEFAULT_WORKSPACE).unwrap();
        for format in [ExportFormat::Yaml, ExportFormat::Json] {
            let rendered = export.render(format).unwrap();
            assert!(!rendered.contains("hunter2"));
            assert!(!rendered.contains("sk-live"));
            assert!(rendered.contains("REDACTED - configure with --password"));
            assert!(rendered.contains("REDACTED - configure with --api-key-value"));
            assert!(rendered.contains("octo"));
            assert!(rendered.contains("X-Subscription-Token"));
        }

        let parsed: WorkspaceExport =
            serde_yaml::from_str(&export.render(ExportFormat::Yaml).unwrap()).unwrap();
        assert_eq!(parsed.integrations.len(), 2);
        assert!(chrono::DateTime::parse_from_rfc3339(&parsed.exported_at).is_ok());
    }

    #[test]
    fn test_export_of_missing_workspace() {
        let store = WorkspaceStore::open_in_memory(&generate_key().unwrap()).unwrap();
        assert!(matches!(
            export_workspace(&store, "ghost"),
            Err(Error::WorkspaceNotFound { .. })
        ));
    }
}
