pub mod bindings;
pub mod completion;
pub mod context;
pub mod integrations;
pub mod mcp;
pub mod output;
pub mod runs;
pub mod workspace;

pub use clap::{Parser, Subcommand};

pub use bindings::BindingsCommands;
pub use completion::CompleteArgs;
pub use context::{AppContext, WORKSPACE_ENV};
pub use integrations::IntegrationsCommands;
pub use mcp::McpCommands;
pub use runs::RunsCommands;
pub use workspace::WorkspaceCommands;

#[derive(Parser)]
#[command(name = "conductor")]
#[command(about = "Conductor - workflow runner for LLM-driven tool pipelines")]
#[command(version, author, long_about = None)]
pub struct Cli {
    /// Workspace to operate on (defaults to the current workspace)
    #[arg(long, global = true, env = WORKSPACE_ENV, value_name = "NAME")]
    pub workspace: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage workspaces
    Workspace {
        #[command(subcommand)]
        subcommand: WorkspaceCommands,
    },
    /// Manage integrations in a workspace
    #[command(alias = "integration")]
    Integrations {
        #[command(subcommand)]
        subcommand: IntegrationsCommands,
    },
    /// Inspect how a workflow's integration requirements bind
    Bindings {
        #[command(subcommand)]
        subcommand: BindingsCommands,
    },
    /// Manage MCP servers on the controller daemon
    Mcp {
        #[command(subcommand)]
        subcommand: McpCommands,
    },
    /// Inspect workflow runs on the controller daemon
    Runs {
        #[command(subcommand)]
        subcommand: RunsCommands,
    },
    /// Produce shell completion candidates
    #[command(name = "__complete", hide = true)]
    Complete(CompleteArgs),
}
