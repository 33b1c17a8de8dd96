//! Domain model for workspaces and integrations.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{Error, Result};

/// Default per-integration request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Longest accepted workspace name.
pub const MAX_WORKSPACE_NAME_LEN: usize = 64;

/// A named namespace owning a set of integrations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Workspace {
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Check a workspace name: lowercase letters, digits, `-` and `_`, starting
/// with a letter or digit.
pub fn validate_workspace_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| Error::InvalidWorkspaceName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let mut chars = name.chars();
    match chars.next() {
        None => return Err(invalid("name cannot be empty")),
        Some(c) if !(c.is_ascii_lowercase() || c.is_ascii_digit()) => {
            return Err(invalid("must start with a lowercase letter or digit"))
        }
        Some(_) => {}
    }
    if name.len() > MAX_WORKSPACE_NAME_LEN {
        return Err(invalid("must be at most 64 characters"));
    }
    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_') {
        return Err(invalid("only lowercase letters, digits, '-' and '_' are allowed"));
    }
    Ok(())
}

/// Kind tag of an [`AuthConfig`], stored in clear next to the encrypted payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthKind {
    None,
    Token,
    Basic,
    ApiKey,
}

impl AuthKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthKind::None => "none",
            AuthKind::Token => "token",
            AuthKind::Basic => "basic",
            AuthKind::ApiKey => "api-key",
        }
    }
}

impl std::fmt::Display for AuthKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuthKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(AuthKind::None),
            "token" => Ok(AuthKind::Token),
            "basic" => Ok(AuthKind::Basic),
            "api-key" => Ok(AuthKind::ApiKey),
            other => Err(Error::generic(format!("unknown auth type '{}'", other))),
        }
    }
}

/// Authentication for an integration.
///
/// Serialized with an internal `type` tag. Only the variant's fields are
/// encrypted at rest; the tag lives in its own column.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AuthConfig {
    #[default]
    None,
    Token { token: String },
    Basic { username: String, password: String },
    ApiKey { header: String, value: String },
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthConfig::None => f.write_str("AuthConfig::None"),
            AuthConfig::Token { .. } => f.write_str("AuthConfig::Token(<redacted>)"),
            AuthConfig::Basic { username, .. } => {
                write!(f, "AuthConfig::Basic({}, <redacted>)", username)
            }
            AuthConfig::ApiKey { header, .. } => {
                write!(f, "AuthConfig::ApiKey({}, <redacted>)", header)
            }
        }
    }
}

pub const REDACTED_TOKEN: &str = "REDACTED - configure with --token";
pub const REDACTED_PASSWORD: &str = "REDACTED - configure with --password";
pub const REDACTED_API_KEY: &str = "REDACTED - configure with --api-key-value";

impl AuthConfig {
    pub fn kind(&self) -> AuthKind {
        match self {
            AuthConfig::None => AuthKind::None,
            AuthConfig::Token { .. } => AuthKind::Token,
            AuthConfig::Basic { .. } => AuthKind::Basic,
            AuthConfig::ApiKey { .. } => AuthKind::ApiKey,
        }
    }

    /// The variant for `kind` with every credential field empty.
    pub fn empty(kind: AuthKind) -> Self {
        match kind {
            AuthKind::None => AuthConfig::None,
            AuthKind::Token => AuthConfig::Token {
                token: String::new(),
            },
            AuthKind::Basic => AuthConfig::Basic {
                username: String::new(),
                password: String::new(),
            },
            AuthKind::ApiKey => AuthConfig::ApiKey {
                header: String::new(),
                value: String::new(),
            },
        }
    }

    /// JSON of the variant's fields without the tag; `None` has no payload.
    pub fn payload(&self) -> Result<Option<Zeroizing<Vec<u8>>>> {
        if matches!(self, AuthConfig::None) {
            return Ok(None);
        }
        let mut value = serde_json::to_value(self)?;
        if let Some(map) = value.as_object_mut() {
            map.remove("type");
        }
        Ok(Some(Zeroizing::new(serde_json::to_vec(&value)?)))
    }

    /// Rebuild a config from its tag and decrypted payload.
    pub fn from_payload(kind: AuthKind, payload: &[u8]) -> Result<Self> {
        if kind == AuthKind::None || payload.is_empty() {
            return Ok(Self::empty(kind));
        }
        let mut map: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(payload)?;
        map.insert(
            "type".to_string(),
            serde_json::Value::String(kind.as_str().to_string()),
        );
        Ok(serde_json::from_value(serde_json::Value::Object(map))?)
    }

    /// Copy with secret fields replaced by remediation text. Usernames and
    /// header names are kept.
    pub fn redacted(&self) -> Self {
        match self {
            AuthConfig::None => AuthConfig::None,
            AuthConfig::Token { .. } => AuthConfig::Token {
                token: REDACTED_TOKEN.to_string(),
            },
            AuthConfig::Basic { username, .. } => AuthConfig::Basic {
                username: username.clone(),
                password: REDACTED_PASSWORD.to_string(),
            },
            AuthConfig::ApiKey { header, .. } => AuthConfig::ApiKey {
                header: header.clone(),
                value: REDACTED_API_KEY.to_string(),
            },
        }
    }
}

/// A configured connection to an external service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Integration {
    pub id: String,
    pub workspace_name: String,
    pub name: String,
    pub integration_type: String,
    pub base_url: Option<String>,
    pub auth: AuthConfig,
    pub headers: BTreeMap<String, String>,
    pub timeout_seconds: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values for a new integration; id and timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIntegration {
    pub name: String,
    pub integration_type: String,
    pub base_url: Option<String>,
    pub auth: AuthConfig,
    pub headers: BTreeMap<String, String>,
    pub timeout_seconds: u64,
}

impl NewIntegration {
    pub fn new(name: impl Into<String>, integration_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            integration_type: integration_type.into(),
            base_url: None,
            auth: AuthConfig::None,
            headers: BTreeMap::new(),
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::generic(format!("invalid stored timestamp '{}': {}", value, e)))
}
