//! Fixed candidate lists: flag values, connectors and bundled examples.

use anyhow::Result;
use conductor_core::WorkflowDefinition;
use conductor_rest_api_contract::RunStatus;

use super::{candidate, Completion};

pub const SECURITY_PROFILES: [(&str, &str); 4] = [
    ("unrestricted", "No sandboxing; full filesystem and network access"),
    ("standard", "Workspace-scoped filesystem, outbound network allowed"),
    ("strict", "Read-only filesystem outside the workspace, allowlisted network"),
    ("air-gapped", "No network access at all"),
];

pub const SECRET_BACKENDS: [(&str, &str); 3] = [
    ("env", "Environment variables"),
    ("keychain", "Operating system keychain"),
    ("file", "Encrypted file on disk"),
];

pub const MCP_TEMPLATES: [(&str, &str); 7] = [
    ("filesystem", "Read and write local files"),
    ("github", "GitHub repositories, issues and pull requests"),
    ("postgres", "Query a PostgreSQL database"),
    ("sqlite", "Query a SQLite database"),
    ("puppeteer", "Drive a headless browser"),
    ("fetch", "Fetch web pages over HTTP"),
    ("custom", "Blank server skeleton"),
];

pub struct Connector {
    pub name: &'static str,
    pub description: &'static str,
    pub operations: &'static [(&'static str, &'static str)],
}

pub static CONNECTORS: [Connector; 4] = [
    Connector {
        name: "file",
        description: "Local file operations",
        operations: &[
            ("read", "Read a file"),
            ("write", "Write a file"),
            ("append", "Append to a file"),
            ("list", "List a directory"),
            ("exists", "Check whether a path exists"),
            ("delete", "Delete a file"),
            ("copy", "Copy a file"),
            ("move", "Move or rename a file"),
        ],
    },
    Connector {
        name: "shell",
        description: "Run commands",
        operations: &[("run", "Run a shell command")],
    },
    Connector {
        name: "transform",
        description: "Reshape data between steps",
        operations: &[
            ("parse_json", "Parse JSON text"),
            ("parse_yaml", "Parse YAML text"),
            ("extract", "Select a value by path"),
            ("filter", "Keep matching items"),
            ("map", "Project each item"),
            ("template", "Render a text template"),
        ],
    },
    Connector {
        name: "utility",
        description: "Small helpers",
        operations: &[
            ("timestamp", "Current time"),
            ("uuid", "Random UUID"),
            ("random_string", "Random alphanumeric string"),
            ("sleep", "Pause the workflow"),
        ],
    },
];

/// Example workflows compiled into the binary, keyed by file stem.
pub const EXAMPLES: [(&str, &str); 4] = [
    ("code-review", include_str!("../../demos/code-review.yaml")),
    ("file-summary", include_str!("../../demos/file-summary.yaml")),
    ("hello-world", include_str!("../../demos/hello-world.yaml")),
    ("issue-triage", include_str!("../../demos/issue-triage.yaml")),
];

pub fn complete_statuses() -> Completion {
    Completion::values(
        RunStatus::ALL
            .iter()
            .map(|status| {
                let description = match status {
                    RunStatus::Pending => "Queued, not started",
                    RunStatus::Running => "In progress",
                    RunStatus::Completed => "Finished successfully",
                    RunStatus::Failed => "Finished with an error",
                    RunStatus::Cancelled => "Stopped by a user",
                };
                candidate(status.as_str(), description)
            })
            .collect(),
    )
}

pub fn complete_connectors() -> Completion {
    Completion::described(CONNECTORS.iter().map(|c| (c.name, c.description)))
}

pub fn complete_operations() -> Completion {
    Completion::values(
        CONNECTORS
            .iter()
            .flat_map(|connector| {
                connector.operations.iter().map(move |(operation, description)| {
                    candidate(&format!("{}.{}", connector.name, operation), description)
                })
            })
            .collect(),
    )
}

/// `name\tdescription` for each bundled example.
pub fn complete_examples() -> Result<Completion> {
    let mut candidates = Vec::with_capacity(EXAMPLES.len());
    for (name, content) in EXAMPLES {
        let workflow = WorkflowDefinition::from_yaml(content)?;
        candidates.push(candidate(name, workflow.description.as_deref().unwrap_or("")));
    }
    Ok(Completion::values(candidates))
}
