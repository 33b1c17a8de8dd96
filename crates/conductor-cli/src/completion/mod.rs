//! Dynamic shell completion.
//!
//! Every source returns a [`Completion`] through one of the envelopes in
//! [`envelope`], so a failing or panicking source yields an empty list and
//! never takes longer than [`COMPLETION_DEADLINE`].

pub mod catalog;
pub mod envelope;
pub mod names;
pub mod runs;
pub mod settings;
pub mod workflows;

use std::ops::BitOr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, ValueEnum};
use conductor_core::ConfigPaths;
use conductor_local_db::Database;
use conductor_rest_client::{ControlPlane, DaemonClient, COMPLETION_TIMEOUT};

pub use envelope::{safe_complete, safe_complete_async, safe_complete_blocking};
pub use runs::RunCache;

/// Wall-clock budget for a single completion request.
pub const COMPLETION_DEADLINE: Duration = COMPLETION_TIMEOUT;

/// Shell directive bits, numerically compatible with cobra's protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Directive(u8);

impl Directive {
    pub const DEFAULT: Directive = Directive(0);
    /// Do not append a space after the candidate.
    pub const NO_SPACE: Directive = Directive(2);
    /// Do not fall back to filename completion.
    pub const NO_FILE_COMP: Directive = Directive(4);

    pub fn code(&self) -> u8 {
        self.0
    }

    pub fn contains(&self, other: Directive) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Directive {
    type Output = Directive;

    fn bitor(self, rhs: Directive) -> Directive {
        Directive(self.0 | rhs.0)
    }
}

/// Candidates (`value` or `value\tdescription`) plus a shell directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub candidates: Vec<String>,
    pub directive: Directive,
}

impl Completion {
    pub fn new(candidates: Vec<String>, directive: Directive) -> Self {
        Self {
            candidates,
            directive,
        }
    }

    /// No candidates, and no filename fallback.
    pub fn empty() -> Self {
        Self::new(Vec::new(), Directive::NO_FILE_COMP)
    }

    /// Non-file candidates.
    pub fn values(candidates: Vec<String>) -> Self {
        Self::new(candidates, Directive::NO_FILE_COMP)
    }

    /// Non-file candidates with descriptions.
    pub fn described<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self::values(
            pairs
                .into_iter()
                .map(|(value, description)| candidate(value, description))
                .collect(),
        )
    }

    /// Keep candidates whose value starts with `prefix`.
    pub fn filter_prefix(mut self, prefix: &str) -> Self {
        if !prefix.is_empty() {
            self.candidates
                .retain(|c| candidate_value(c).starts_with(prefix));
        }
        self
    }

    /// Wire format: one candidate per line, then `:<directive code>`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for candidate in &self.candidates {
            out.push_str(candidate);
            out.push('\n');
        }
        out.push_str(&format!(":{}\n", self.directive.code()));
        out
    }
}

/// `value\tdescription`, or just `value` when the description is empty.
pub fn candidate(value: &str, description: &str) -> String {
    if description.is_empty() {
        value.to_string()
    } else {
        format!("{}\t{}", value, description)
    }
}

fn candidate_value(candidate: &str) -> &str {
    candidate.split('\t').next().unwrap_or(candidate)
}

/// What to complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CompletionSource {
    /// Local workflow files
    Workflows,
    /// Run IDs from the daemon
    Runs,
    /// Pending or running run IDs
    ActiveRuns,
    /// Providers configured in config.yaml
    Providers,
    /// Supported provider types
    ProviderTypes,
    /// MCP servers configured in mcp.yaml
    McpServers,
    /// `--security` profiles
    Security,
    /// `--status` values
    Status,
    /// `--backend` secret backends
    Backend,
    /// MCP server templates
    McpTemplates,
    /// Connector names
    Connectors,
    /// `connector.operation` pairs
    Operations,
    /// Embedded example workflows
    Examples,
    /// Workspace names
    Workspaces,
    /// Integration names in the effective workspace
    Integrations,
}

/// Everything a completion source may read.
#[derive(Clone)]
pub struct CompletionEnv {
    pub cwd: PathBuf,
    pub config: Option<ConfigPaths>,
    pub db_path: Option<PathBuf>,
    pub daemon: Option<Arc<dyn ControlPlane>>,
    pub workspace: Option<String>,
}

impl CompletionEnv {
    /// Environment of the running process. Nothing here fails: unresolved
    /// pieces simply disable their sources.
    pub fn from_process(workspace: Option<String>) -> Self {
        let daemon = DaemonClient::from_env()
            .ok()
            .map(|client| Arc::new(client.with_timeout(COMPLETION_TIMEOUT)) as Arc<dyn ControlPlane>);
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config: ConfigPaths::resolve().ok(),
            db_path: Database::default_path().ok(),
            daemon,
            workspace,
        }
    }
}

/// Complete `prefix` from `source`.
pub async fn complete(source: CompletionSource, prefix: &str, env: &CompletionEnv) -> Completion {
    let completion = match source {
        // Workflow completion applies its own prefix rules.
        CompletionSource::Workflows => {
            let cwd = env.cwd.clone();
            let prefix = prefix.to_string();
            return safe_complete_blocking(move || {
                Ok(workflows::complete_workflows(&cwd, &prefix))
            })
            .await;
        }
        CompletionSource::Runs | CompletionSource::ActiveRuns => {
            let active = source == CompletionSource::ActiveRuns;
            match &env.daemon {
                Some(daemon) => {
                    safe_complete_async(runs::complete_runs(
                        RunCache::global(),
                        daemon.as_ref(),
                        active,
                    ))
                    .await
                }
                None => Completion::empty(),
            }
        }
        CompletionSource::Providers => match env.config.clone() {
            Some(paths) => {
                safe_complete_blocking(move || settings::complete_providers(&paths)).await
            }
            None => Completion::empty(),
        },
        CompletionSource::McpServers => match env.config.clone() {
            Some(paths) => {
                safe_complete_blocking(move || settings::complete_mcp_servers(&paths)).await
            }
            None => Completion::empty(),
        },
        CompletionSource::ProviderTypes => {
            safe_complete(|| Ok(Completion::described(settings::PROVIDER_TYPES)))
        }
        CompletionSource::Security => {
            safe_complete(|| Ok(Completion::described(catalog::SECURITY_PROFILES)))
        }
        CompletionSource::Status => safe_complete(|| Ok(catalog::complete_statuses())),
        CompletionSource::Backend => {
            safe_complete(|| Ok(Completion::described(catalog::SECRET_BACKENDS)))
        }
        CompletionSource::McpTemplates => {
            safe_complete(|| Ok(Completion::described(catalog::MCP_TEMPLATES)))
        }
        CompletionSource::Connectors => safe_complete(|| Ok(catalog::complete_connectors())),
        CompletionSource::Operations => safe_complete(|| Ok(catalog::complete_operations())),
        CompletionSource::Examples => safe_complete(catalog::complete_examples),
        CompletionSource::Workspaces => match env.db_path.clone() {
            Some(path) => safe_complete_blocking(move || names::complete_workspaces(&path)).await,
            None => Completion::empty(),
        },
        CompletionSource::Integrations => match env.db_path.clone() {
            Some(path) => {
                let workspace = env.workspace.clone();
                safe_complete_blocking(move || {
                    names::complete_integrations(&path, workspace.as_deref())
                })
                .await
            }
            None => Completion::empty(),
        },
    };
    completion.filter_prefix(prefix)
}

/// Arguments of the hidden `__complete` command
#[derive(Args)]
pub struct CompleteArgs {
    /// Candidate source
    #[arg(value_enum, value_name = "SOURCE")]
    pub source: CompletionSource,

    /// Text typed so far
    #[arg(value_name = "PREFIX", default_value = "", allow_hyphen_values = true)]
    pub prefix: String,
}

impl CompleteArgs {
    /// Print the candidates in wire format. Never fails.
    pub async fn run(self, workspace: Option<String>) {
        let env = CompletionEnv::from_process(workspace);
        let completion = complete(self.source, &self.prefix, &env).await;
        print!("{}", completion.render());
    }
}
