//! Error types for the daemon client

use conductor_rest_api_contract::ContractError;
use thiserror::Error;

/// Errors that can occur when talking to the daemon
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid daemon host '{0}'")]
    InvalidHost(String),

    #[error("API contract error: {0}")]
    Contract(#[from] ContractError),

    #[error("Authentication error: {0}")]
    Auth(String),

    /// Status >= 400. `message` is the body's `error` field when present,
    /// otherwise `HTTP status N`.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("request timed out")]
    Timeout,
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else {
            ClientError::Http(err)
        }
    }
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for daemon client operations
pub type ClientResult<T> = Result<T, ClientError>;
