//! Connectivity checks against an integration's endpoint

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use reqwest::Client as HttpClient;
use tracing::debug;
use url::Url;

use crate::auth::{integration_headers, AuthMethod};
use crate::client::USER_AGENT;
use crate::error::{ClientError, ClientResult};

/// Result of a successful probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub status: u16,
    pub elapsed: Duration,
}

/// Issue one authenticated `GET` against `base_url` within `timeout`.
///
/// Any status >= 400 is reported as [`ClientError::Api`].
pub async fn probe_endpoint(
    base_url: &str,
    auth: &AuthMethod,
    extra_headers: &BTreeMap<String, String>,
    timeout: Duration,
) -> ClientResult<ProbeOutcome> {
    let url = Url::parse(base_url)?;
    let headers = integration_headers(auth, extra_headers)?;
    let http_client = HttpClient::builder().user_agent(USER_AGENT).build()?;

    let started = Instant::now();
    let response = http_client
        .get(url)
        .headers(headers)
        .timeout(timeout)
        .send()
        .await?;
    let status = response.status();
    let elapsed = started.elapsed();
    debug!(status = status.as_u16(), ?elapsed, "integration probe finished");

    if status.is_client_error() || status.is_server_error() {
        return Err(ClientError::Api {
            status: status.as_u16(),
            message: format!("HTTP status {}", status.as_u16()),
        });
    }

    Ok(ProbeOutcome {
        status: status.as_u16(),
        elapsed,
    })
}
