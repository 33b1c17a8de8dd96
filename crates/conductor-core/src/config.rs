//! User configuration files (`config.yaml`, `mcp.yaml`).
//!
//! Both files may name credentials, so they are only trusted when their mode
//! is no more permissive than `0600`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const CONFIG_FILE_NAME: &str = "config.yaml";
pub const MCP_FILE_NAME: &str = "mcp.yaml";

/// Where the frontend looks for its configuration files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub mcp_file: PathBuf,
}

impl ConfigPaths {
    /// Resolve paths from the process environment.
    pub fn resolve() -> Result<Self> {
        Self::resolve_with(|name| std::env::var(name).ok())
    }

    /// Resolve paths with an injected environment lookup.
    ///
    /// Priority for the directory: `CONDUCTOR_CONFIG_DIR`, then
    /// `$XDG_CONFIG_HOME/conductor`, then the platform config directory.
    /// `CONDUCTOR_CONFIG` overrides the primary file only.
    pub fn resolve_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let config_dir = if let Some(dir) = non_empty("CONDUCTOR_CONFIG_DIR") {
            PathBuf::from(dir)
        } else if let Some(xdg) = non_empty("XDG_CONFIG_HOME") {
            PathBuf::from(xdg).join("conductor")
        } else {
            dirs::config_dir()
                .map(|dir| dir.join("conductor"))
                .ok_or_else(|| Error::generic("could not determine config directory"))?
        };

        let config_file = non_empty("CONDUCTOR_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| config_dir.join(CONFIG_FILE_NAME));
        let mcp_file = config_dir.join(MCP_FILE_NAME);

        Ok(Self {
            config_dir,
            config_file,
            mcp_file,
        })
    }

    pub fn from_dir<P: Into<PathBuf>>(dir: P) -> Self {
        let config_dir = dir.into();
        Self {
            config_file: config_dir.join(CONFIG_FILE_NAME),
            mcp_file: config_dir.join(MCP_FILE_NAME),
            config_dir,
        }
    }
}

/// Refuse files readable or writable by anyone but the owner.
#[cfg(unix)]
pub fn check_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = std::fs::metadata(path)?.permissions().mode() & 0o777;
    if mode & !0o600 != 0 {
        return Err(Error::PermissionTooLoose {
            path: path.to_path_buf(),
            mode,
        });
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn check_permissions(path: &Path) -> Result<()> {
    std::fs::metadata(path)?;
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub provider_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(flatten)]
    pub settings: BTreeMap<String, serde_yaml::Value>,
}

/// Primary configuration (`config.yaml`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConductorConfig {
    #[serde(default)]
    pub default_provider: Option<String>,
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderConfig>,
    #[serde(flatten)]
    pub settings: BTreeMap<String, serde_yaml::Value>,
}

impl ConductorConfig {
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McpServerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(flatten)]
    pub settings: BTreeMap<String, serde_yaml::Value>,
}

/// Registered MCP servers (`mcp.yaml`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McpConfig {
    #[serde(default)]
    pub servers: BTreeMap<String, McpServerConfig>,
}

impl McpConfig {
    pub fn server_names(&self) -> Vec<String> {
        self.servers.keys().cloned().collect()
    }
}

/// Load a permission-checked YAML file. A missing file yields the default.
fn load_yaml<T>(path: &Path) -> Result<T>
where
    T: Default + for<'de> Deserialize<'de>,
{
    if !path.exists() {
        return Ok(T::default());
    }
    check_permissions(path)?;
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(T::default());
    }
    Ok(serde_yaml::from_str(&content)?)
}

pub fn load_config(path: &Path) -> Result<ConductorConfig> {
    load_yaml(path)
}

pub fn load_mcp_config(path: &Path) -> Result<McpConfig> {
    load_yaml(path)
}
