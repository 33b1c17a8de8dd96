//! Daemon control-plane client

use std::time::Duration;

use conductor_rest_api_contract::*;
use reqwest::{Client as HttpClient, Method, Response};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::{ClientError, ClientResult};

/// Daemon endpoint used when `CONDUCTOR_HOST` is unset.
pub const DEFAULT_DAEMON_URL: &str = "http://localhost:8374";

/// Environment variable overriding the daemon endpoint.
pub const DAEMON_HOST_ENV: &str = "CONDUCTOR_HOST";

/// Ceiling applied to every request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Deadline used by shell completion.
pub const COMPLETION_TIMEOUT: Duration = Duration::from_millis(500);

pub const USER_AGENT: &str = concat!("conductor-cli/", env!("CARGO_PKG_VERSION"));

/// Normalize a daemon host string into a base URL.
///
/// `tcp://` is treated as `http://`; a bare `host:port` gets `http://`.
pub fn parse_host(host: &str) -> ClientResult<Url> {
    let host = host.trim();
    if host.is_empty() {
        return Err(ClientError::InvalidHost(host.to_string()));
    }
    let normalized = if let Some(rest) = host.strip_prefix("tcp://") {
        format!("http://{}", rest)
    } else if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    };
    let url = Url::parse(&normalized)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::InvalidHost(host.to_string()));
    }
    Ok(url)
}

/// HTTP client for the controller daemon.
///
/// Transport only: deadlines and error-body parsing, no retries.
#[derive(Debug, Clone)]
pub struct DaemonClient {
    http_client: HttpClient,
    base_url: Url,
    timeout: Duration,
}

impl DaemonClient {
    /// Create a new client for `base_url`.
    pub fn new(base_url: Url) -> ClientResult<Self> {
        let http_client = HttpClient::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            http_client,
            base_url,
            timeout: REQUEST_TIMEOUT,
        })
    }

    /// Create a client from a host string (`tcp://`, `http://` or `host:port`).
    pub fn from_host(host: &str) -> ClientResult<Self> {
        Self::new(parse_host(host)?)
    }

    /// Create a client from `CONDUCTOR_HOST`, falling back to the local default.
    pub fn from_env() -> ClientResult<Self> {
        match std::env::var(DAEMON_HOST_ENV) {
            Ok(host) if !host.trim().is_empty() => Self::from_host(&host),
            _ => Self::from_host(DEFAULT_DAEMON_URL),
        }
    }

    /// Tighten the per-request deadline. The 30-second ceiling still applies.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.min(REQUEST_TIMEOUT);
        self
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `GET /v1/runs`
    pub async fn list_runs(&self) -> ClientResult<Vec<RunSummary>> {
        let response: RunListResponse = self.get(&["v1", "runs"]).await?;
        Ok(response.runs)
    }

    /// `GET /v1/mcp/servers`
    pub async fn list_mcp_servers(&self) -> ClientResult<Vec<McpServerInfo>> {
        let response: McpServerListResponse = self.get(&["v1", "mcp", "servers"]).await?;
        Ok(response.servers)
    }

    /// `GET /v1/mcp/servers/{name}`
    pub async fn get_mcp_server(&self, name: &str) -> ClientResult<McpServerInfo> {
        self.get(&["v1", "mcp", "servers", name]).await
    }

    /// `GET /v1/mcp/servers/{name}/tools`
    pub async fn mcp_server_tools(&self, name: &str) -> ClientResult<Vec<McpTool>> {
        let response: McpToolsResponse = self.get(&["v1", "mcp", "servers", name, "tools"]).await?;
        Ok(response.tools)
    }

    /// `GET /v1/mcp/servers/{name}/health`
    pub async fn mcp_server_health(&self, name: &str) -> ClientResult<McpHealth> {
        self.get(&["v1", "mcp", "servers", name, "health"]).await
    }

    /// `GET /v1/mcp/servers/{name}/logs`
    pub async fn mcp_server_logs(&self, name: &str) -> ClientResult<Vec<String>> {
        let response: McpLogsResponse = self.get(&["v1", "mcp", "servers", name, "logs"]).await?;
        Ok(response.lines)
    }

    /// `POST /v1/mcp/servers`
    pub async fn register_mcp_server(&self, request: &RegisterServerRequest) -> ClientResult<()> {
        request.validate()?;
        let url = self.endpoint(&["v1", "mcp", "servers"])?;
        self.send(Method::POST, url, Some(request)).await?;
        Ok(())
    }

    /// `DELETE /v1/mcp/servers/{name}`
    pub async fn unregister_mcp_server(&self, name: &str) -> ClientResult<()> {
        let url = self.endpoint(&["v1", "mcp", "servers", name])?;
        self.send(Method::DELETE, url, None::<&()>).await?;
        Ok(())
    }

    /// `POST /v1/mcp/servers/{name}/start`
    pub async fn start_mcp_server(&self, name: &str) -> ClientResult<()> {
        self.lifecycle(name, "start").await
    }

    /// `POST /v1/mcp/servers/{name}/stop`
    pub async fn stop_mcp_server(&self, name: &str) -> ClientResult<()> {
        self.lifecycle(name, "stop").await
    }

    /// `POST /v1/mcp/servers/{name}/restart`
    pub async fn restart_mcp_server(&self, name: &str) -> ClientResult<()> {
        self.lifecycle(name, "restart").await
    }

    // Private helper methods

    async fn lifecycle(&self, name: &str, action: &str) -> ClientResult<()> {
        let url = self.endpoint(&["v1", "mcp", "servers", name, action])?;
        self.send(Method::POST, url, None::<&()>).await?;
        Ok(())
    }

    /// Join percent-encoded path segments onto the base URL.
    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidHost(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> ClientResult<T> {
        let url = self.endpoint(segments)?;
        let text = self.send(Method::GET, url, None::<&()>).await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn send<B: serde::Serialize>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> ClientResult<String> {
        debug!(%method, %url, "daemon request");
        let mut request = self.http_client.request(method, url).timeout(self.timeout);

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        handle_response(response).await
    }
}

async fn handle_response(response: Response) -> ClientResult<String> {
    let status = response.status();
    let text = response.text().await?;

    if status.is_client_error() || status.is_server_error() {
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .map(|body| body.error)
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| format!("HTTP status {}", status.as_u16()));
        return Err(ClientError::Api {
            status: status.as_u16(),
            message,
        });
    }

    Ok(text)
}
