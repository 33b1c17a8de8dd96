use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use conductor_core::{AuthConfig, Integration, NewIntegration, DEFAULT_TIMEOUT_SECS};
use conductor_local_db::IntegrationRecordStore;
use conductor_rest_client::{probe_endpoint, AuthMethod, ProbeOutcome};
use serde::Serialize;

use crate::context::{with_deadline, AppContext};
use crate::output::{render_structured, render_table, OutputFormat};

/// Integration-related commands
#[derive(Subcommand)]
pub enum IntegrationsCommands {
    /// Add an integration to the workspace
    Add(IntegrationAddArgs),
    /// List integrations in the workspace
    List {
        /// Only list integrations of this type
        #[arg(long = "type", value_name = "TYPE")]
        integration_type: Option<String>,

        /// Output style
        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,
    },
    /// Show one integration (credentials are redacted)
    Show {
        #[arg(value_name = "NAME")]
        name: String,

        /// Output style
        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,
    },
    /// Change an integration's settings or credentials
    Update(IntegrationUpdateArgs),
    /// Remove an integration
    #[command(alias = "rm")]
    Remove {
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Check that an integration's endpoint accepts its credentials
    Test {
        #[arg(value_name = "NAME")]
        name: String,
    },
}

/// Credential flags shared by `add` and `update`
#[derive(Args, Default)]
pub struct AuthArgs {
    /// Bearer token
    #[arg(long, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Basic auth username
    #[arg(long, value_name = "USER", requires = "password")]
    pub username: Option<String>,

    /// Basic auth password
    #[arg(long, value_name = "PASSWORD", requires = "username")]
    pub password: Option<String>,

    /// Header carrying an API key
    #[arg(long = "api-key-header", value_name = "HEADER", requires = "api_key_value")]
    pub api_key_header: Option<String>,

    /// API key value
    #[arg(long = "api-key-value", value_name = "KEY", requires = "api_key_header")]
    pub api_key_value: Option<String>,
}

impl AuthArgs {
    /// The credential described by the flags, if any were given.
    pub fn to_auth(&self) -> Result<Option<AuthConfig>> {
        let mut chosen = Vec::new();
        if let Some(token) = &self.token {
            chosen.push(AuthConfig::Token {
                token: token.clone(),
            });
        }
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            chosen.push(AuthConfig::Basic {
                username: username.clone(),
                password: password.clone(),
            });
        }
        if let (Some(header), Some(value)) = (&self.api_key_header, &self.api_key_value) {
            chosen.push(AuthConfig::ApiKey {
                header: header.clone(),
                value: value.clone(),
            });
        }
        if chosen.len() > 1 {
            bail!("--token, --username/--password and --api-key-header/--api-key-value are mutually exclusive");
        }
        Ok(chosen.pop())
    }
}

#[derive(Args)]
pub struct IntegrationAddArgs {
    /// Integration name, unique within the workspace
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Integration type (e.g. github, slack, jira)
    #[arg(long = "type", value_name = "TYPE")]
    pub integration_type: String,

    /// Service base URL
    #[arg(long = "base-url", value_name = "URL")]
    pub base_url: Option<String>,

    #[command(flatten)]
    pub auth: AuthArgs,

    /// Extra request header (repeatable)
    #[arg(long = "header", value_name = "KEY=VALUE", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Validate and print the integration without saving it
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Output style for the result
    #[arg(short, long, value_enum, default_value_t)]
    pub output: OutputFormat,
}

#[derive(Args)]
pub struct IntegrationUpdateArgs {
    #[arg(value_name = "NAME")]
    pub name: String,

    /// New integration type
    #[arg(long = "type", value_name = "TYPE")]
    pub integration_type: Option<String>,

    /// New base URL
    #[arg(long = "base-url", value_name = "URL", conflicts_with = "clear_base_url")]
    pub base_url: Option<String>,

    /// Remove the base URL
    #[arg(long = "clear-base-url")]
    pub clear_base_url: bool,

    #[command(flatten)]
    pub auth: AuthArgs,

    /// Drop the stored credential
    #[arg(long = "no-auth")]
    pub no_auth: bool,

    /// Replace all extra headers (repeatable)
    #[arg(long = "header", value_name = "KEY=VALUE", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Remove all extra headers
    #[arg(long = "clear-headers", conflicts_with = "headers")]
    pub clear_headers: bool,

    /// New request timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

/// `KEY=VALUE`, split on the first `=`.
pub fn parse_header(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

/// What listing commands print for an integration. Credentials are redacted.
#[derive(Debug, Serialize)]
pub struct IntegrationView {
    pub name: String,
    #[serde(rename = "type")]
    pub integration_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub auth: AuthConfig,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    pub timeout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Integration> for IntegrationView {
    fn from(integration: &Integration) -> Self {
        Self {
            name: integration.name.clone(),
            integration_type: integration.integration_type.clone(),
            base_url: integration.base_url.clone(),
            auth: integration.auth.redacted(),
            headers: integration.headers.clone(),
            timeout: integration.timeout_seconds,
            created_at: Some(integration.created_at),
            updated_at: Some(integration.updated_at),
        }
    }
}

impl From<&NewIntegration> for IntegrationView {
    fn from(new: &NewIntegration) -> Self {
        Self {
            name: new.name.clone(),
            integration_type: new.integration_type.clone(),
            base_url: new.base_url.clone(),
            auth: new.auth.redacted(),
            headers: new.headers.clone(),
            timeout: new.timeout_seconds,
            created_at: None,
            updated_at: None,
        }
    }
}

impl IntegrationView {
    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.integration_type.clone(),
            self.auth.kind().to_string(),
            self.base_url.clone().unwrap_or_else(|| "-".into()),
        ]
    }

    fn describe(&self) -> String {
        let mut lines = vec![
            format!("Name:     {}", self.name),
            format!("Type:     {}", self.integration_type),
            format!("Base URL: {}", self.base_url.as_deref().unwrap_or("-")),
            format!("Auth:     {}", self.auth.kind()),
            format!("Timeout:  {}s", self.timeout),
        ];
        if !self.headers.is_empty() {
            lines.push("Headers:".into());
            for (key, value) in &self.headers {
                lines.push(format!("  {}: {}", key, value));
            }
        }
        lines.join("\n")
    }
}

fn print_view(view: &IntegrationView, output: OutputFormat) -> Result<()> {
    match render_structured(view, output)? {
        Some(text) => println!("{}", text),
        None => println!("{}", view.describe()),
    }
    Ok(())
}

impl IntegrationsCommands {
    /// Execute the integrations command
    pub async fn run(self, ctx: &AppContext) -> Result<()> {
        ctx.blocking("integration command", move |ctx| self.execute(ctx))
            .await
    }

    fn execute(self, ctx: &AppContext) -> Result<()> {
        let workspace = ctx.workspace()?;
        match self {
            IntegrationsCommands::Add(args) => args.run(ctx, &workspace),
            IntegrationsCommands::List {
                integration_type,
                output,
            } => {
                let integrations = match &integration_type {
                    Some(t) => ctx.store().list_integrations_by_type(&workspace, t)?,
                    None => ctx.store().list_integrations(&workspace)?,
                };
                let views: Vec<IntegrationView> =
                    integrations.iter().map(IntegrationView::from).collect();
                if let Some(text) = render_structured(&views, output)? {
                    println!("{}", text);
                } else if views.is_empty() {
                    println!("No integrations in workspace '{}'", workspace);
                } else {
                    let rows: Vec<Vec<String>> = views.iter().map(IntegrationView::row).collect();
                    println!("{}", render_table(&["NAME", "TYPE", "AUTH", "BASE URL"], &rows));
                }
                Ok(())
            }
            IntegrationsCommands::Show { name, output } => {
                let integration = ctx.store().get_integration(&workspace, &name)?;
                print_view(&IntegrationView::from(&integration), output)
            }
            IntegrationsCommands::Update(args) => args.run(ctx, &workspace),
            IntegrationsCommands::Remove { name } => {
                ctx.service().delete(&workspace, &name)?;
                println!("Removed integration '{}' from workspace '{}'", name, workspace);
                Ok(())
            }
            IntegrationsCommands::Test { name } => {
                // Runs on a blocking thread; the probe itself is async.
                let service = ctx.service();
                let outcome = tokio::runtime::Handle::current().block_on(with_deadline(
                    "integration test",
                    async { Ok(service.test(&workspace, &name, probe_integration).await?) },
                ))?;
                println!(
                    "Integration '{}' is reachable (HTTP {} in {}ms)",
                    name,
                    outcome.status,
                    outcome.elapsed.as_millis()
                );
                Ok(())
            }
        }
    }
}

impl IntegrationAddArgs {
    fn build(&self) -> Result<NewIntegration> {
        if self.integration_type.trim().is_empty() {
            bail!("--type must not be empty");
        }
        let mut new = NewIntegration::new(self.name.trim(), self.integration_type.trim());
        if let Some(base_url) = &self.base_url {
            new = new.with_base_url(base_url.clone());
        }
        if let Some(auth) = self.auth.to_auth()? {
            new = new.with_auth(auth);
        }
        new.headers = self.headers.iter().cloned().collect();
        new.timeout_seconds = self.timeout;
        Ok(new)
    }

    fn run(self, ctx: &AppContext, workspace: &str) -> Result<()> {
        let new = self.build()?;
        if new.name.is_empty() {
            bail!("integration name must not be empty");
        }

        if self.dry_run {
            ctx.store().get_workspace(workspace)?;
            let exists = ctx.store().database().with_connection(|conn| {
                Ok(IntegrationRecordStore::new(conn)
                    .get(workspace, &new.name)?
                    .is_some())
            })?;
            if exists {
                return Err(conductor_core::Error::IntegrationExists {
                    workspace: workspace.to_string(),
                    name: new.name,
                }
                .into());
            }
            println!("Dry run: integration would be added to workspace '{}'", workspace);
            return print_view(&IntegrationView::from(&new), self.output);
        }

        let integration = ctx.service().create(workspace, new)?;
        if self.output == OutputFormat::Table {
            println!(
                "Added integration '{}' ({}) to workspace '{}'",
                integration.name, integration.integration_type, workspace
            );
            Ok(())
        } else {
            print_view(&IntegrationView::from(&integration), self.output)
        }
    }
}

impl IntegrationUpdateArgs {
    /// Apply the flags to `integration`.
    pub fn apply(&self, integration: &mut Integration) -> Result<()> {
        if let Some(t) = &self.integration_type {
            integration.integration_type = t.trim().to_string();
        }
        if self.clear_base_url {
            integration.base_url = None;
        } else if let Some(base_url) = &self.base_url {
            integration.base_url = Some(base_url.clone());
        }
        match self.auth.to_auth()? {
            Some(_) if self.no_auth => bail!("--no-auth cannot be combined with credential flags"),
            Some(auth) => integration.auth = auth,
            None if self.no_auth => integration.auth = AuthConfig::None,
            None => {}
        }
        if self.clear_headers {
            integration.headers.clear();
        } else if !self.headers.is_empty() {
            integration.headers = self.headers.iter().cloned().collect();
        }
        if let Some(timeout) = self.timeout {
            integration.timeout_seconds = timeout;
        }
        Ok(())
    }

    fn run(self, ctx: &AppContext, workspace: &str) -> Result<()> {
        let mut integration = ctx.store().get_integration(workspace, &self.name)?;
        self.apply(&mut integration)?;
        ctx.service().update(&integration)?;
        println!("Updated integration '{}' in workspace '{}'", self.name, workspace);
        Ok(())
    }
}

/// Outbound credentials for an integration's endpoint.
pub fn auth_method(auth: &AuthConfig) -> AuthMethod {
    match auth {
        AuthConfig::None => AuthMethod::None,
        AuthConfig::Token { token } => AuthMethod::Bearer(token.clone()),
        AuthConfig::Basic { username, password } => AuthMethod::Basic {
            username: username.clone(),
            password: password.clone(),
        },
        AuthConfig::ApiKey { header, value } => AuthMethod::Header {
            name: header.clone(),
            value: value.clone(),
        },
    }
}

/// Probe an integration's base URL with its own credentials and timeout.
pub async fn probe_integration(integration: Integration) -> conductor_core::Result<ProbeOutcome> {
    let failed = |message: String| conductor_core::Error::IntegrationTestFailed {
        name: integration.name.clone(),
        message,
    };
    let base_url = integration
        .base_url
        .as_deref()
        .ok_or_else(|| failed("no base URL configured".into()))?;

    probe_endpoint(
        base_url,
        &auth_method(&integration.auth),
        &integration.headers,
        Duration::from_secs(integration.timeout_seconds),
    )
    .await
    .map_err(|e| failed(e.to_string()))
}
