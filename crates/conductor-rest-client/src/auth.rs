//! Authentication headers for outbound integration requests

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};

use crate::error::{ClientError, ClientResult};

/// Authentication methods an integration can carry
#[derive(Clone, Default)]
pub enum AuthMethod {
    /// No authentication
    #[default]
    None,
    /// Bearer token (`Authorization: Bearer <token>`)
    Bearer(String),
    /// HTTP basic (`Authorization: Basic base64(user:pass)`)
    Basic { username: String, password: String },
    /// Arbitrary header carrying an API key
    Header { name: String, value: String },
}

impl std::fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMethod::None => f.write_str("None"),
            AuthMethod::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            AuthMethod::Basic { username, .. } => write!(f, "Basic({}, <redacted>)", username),
            AuthMethod::Header { name, .. } => write!(f, "Header({}, <redacted>)", name),
        }
    }
}

impl AuthMethod {
    /// Apply authentication headers to a request
    pub fn apply_to_headers(&self, headers: &mut HeaderMap) -> ClientResult<()> {
        match self {
            AuthMethod::None => {}
            AuthMethod::Bearer(token) => {
                headers.insert(AUTHORIZATION, sensitive(&format!("Bearer {}", token))?);
            }
            AuthMethod::Basic { username, password } => {
                let encoded = STANDARD.encode(format!("{}:{}", username, password));
                headers.insert(AUTHORIZATION, sensitive(&format!("Basic {}", encoded))?);
            }
            AuthMethod::Header { name, value } => {
                let name = HeaderName::from_bytes(name.as_bytes())
                    .map_err(|e| ClientError::Auth(format!("invalid header name '{}': {}", name, e)))?;
                headers.insert(name, sensitive(value)?);
            }
        }
        Ok(())
    }

    /// Create bearer token authentication
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer(token.into())
    }
}

fn sensitive(value: &str) -> ClientResult<HeaderValue> {
    let mut value = HeaderValue::from_str(value)
        .map_err(|_| ClientError::Auth("credential contains invalid header characters".into()))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Build the header map for an integration: extra headers first, then auth,
/// so the credential always wins over a same-named extra header.
pub fn integration_headers(
    auth: &AuthMethod,
    extra: &BTreeMap<String, String>,
) -> ClientResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value) in extra {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ClientError::Auth(format!("invalid header name '{}': {}", name, e)))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| ClientError::Auth(format!("invalid value for header '{}': {}", name, e)))?;
        headers.insert(header_name, header_value);
    }
    auth.apply_to_headers(&mut headers)?;
    Ok(headers)
}
