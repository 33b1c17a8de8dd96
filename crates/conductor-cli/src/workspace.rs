use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use conductor_core::{export_workspace, ExportFormat};

use crate::context::AppContext;
use crate::output::{render_structured, render_table, OutputFormat};

/// Workspace-related commands
#[derive(Subcommand)]
pub enum WorkspaceCommands {
    /// Create a new workspace
    Create(WorkspaceCreateArgs),
    /// List all workspaces
    List {
        /// Output style
        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,
    },
    /// Show a workspace and its integrations
    Show {
        /// Workspace name (defaults to the effective workspace)
        #[arg(value_name = "NAME")]
        name: Option<String>,

        /// Output style
        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,
    },
    /// Change a workspace's description
    Update {
        #[arg(value_name = "NAME")]
        name: String,

        /// New description (omit to clear it)
        #[arg(long, value_name = "TEXT")]
        description: Option<String>,
    },
    /// Delete a workspace and all of its integrations
    Delete {
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Make a workspace the current one
    Use {
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Print the effective workspace
    Current,
    /// Export a workspace with every secret redacted
    Export(WorkspaceExportArgs),
}

#[derive(Args)]
pub struct WorkspaceCreateArgs {
    /// Workspace name (lowercase letters, digits, '-' and '_')
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Free-form description
    #[arg(long, value_name = "TEXT")]
    pub description: Option<String>,

    /// Switch to the new workspace after creating it
    #[arg(long = "use")]
    pub switch: bool,
}

#[derive(Args)]
pub struct WorkspaceExportArgs {
    /// Workspace name (defaults to the effective workspace)
    #[arg(value_name = "NAME")]
    pub name: Option<String>,

    /// Document format: yaml or json
    #[arg(long, value_name = "FORMAT", default_value = "yaml")]
    pub format: ExportFormat,

    /// Write to FILE instead of stdout
    #[arg(long = "file", value_name = "FILE")]
    pub file: Option<PathBuf>,
}

impl WorkspaceCommands {
    /// Execute the workspace command
    pub async fn run(self, ctx: &AppContext) -> Result<()> {
        ctx.blocking("workspace command", move |ctx| self.execute(ctx))
            .await
    }

    fn execute(self, ctx: &AppContext) -> Result<()> {
        let store = ctx.store();
        match self {
            WorkspaceCommands::Create(args) => {
                let workspace = store.create_workspace(&args.name, args.description.as_deref())?;
                println!("Created workspace '{}'", workspace.name);
                if args.switch {
                    store.set_current_workspace(&workspace.name)?;
                    println!("Switched to workspace '{}'", workspace.name);
                }
            }
            WorkspaceCommands::List { output } => {
                let workspaces = store.list_workspaces()?;
                if let Some(text) = render_structured(&workspaces, output)? {
                    println!("{}", text);
                    return Ok(());
                }
                let current = ctx.workspace()?;
                let rows: Vec<Vec<String>> = workspaces
                    .iter()
                    .map(|ws| {
                        vec![
                            if ws.name == current { "*".into() } else { String::new() },
                            ws.name.clone(),
                            ws.description.clone().unwrap_or_default(),
                        ]
                    })
                    .collect();
                println!("{}", render_table(&["", "NAME", "DESCRIPTION"], &rows));
            }
            WorkspaceCommands::Show { name, output } => {
                let name = match name {
                    Some(name) => name,
                    None => ctx.workspace()?,
                };
                let workspace = store.get_workspace(&name)?;
                if let Some(text) = render_structured(&workspace, output)? {
                    println!("{}", text);
                    return Ok(());
                }
                let integrations = store.list_integrations(&name)?;
                println!("Name:         {}", workspace.name);
                println!("Description:  {}", workspace.description.as_deref().unwrap_or("-"));
                println!("Created:      {}", workspace.created_at.to_rfc3339());
                println!("Updated:      {}", workspace.updated_at.to_rfc3339());
                println!("Integrations: {}", integrations.len());
                for integration in integrations {
                    println!("  - {} ({})", integration.name, integration.integration_type);
                }
            }
            WorkspaceCommands::Update { name, description } => {
                store.update_workspace(&name, description.as_deref())?;
                println!("Updated workspace '{}'", name);
            }
            WorkspaceCommands::Delete { name } => {
                store.delete_workspace(&name)?;
                println!("Deleted workspace '{}'", name);
            }
            WorkspaceCommands::Use { name } => {
                store.set_current_workspace(&name)?;
                println!("Switched to workspace '{}'", name);
            }
            WorkspaceCommands::Current => {
                println!("{}", ctx.workspace()?);
            }
            WorkspaceCommands::Export(args) => {
                let name = match args.name {
                    Some(name) => name,
                    None => ctx.workspace()?,
                };
                let rendered = export_workspace(store, &name)?.render(args.format)?;
                match args.file {
                    Some(path) => {
                        std::fs::write(&path, rendered)
                            .with_context(|| format!("failed to write {}", path.display()))?;
                        println!("Exported workspace '{}' to {}", name, path.display());
                    }
                    None => print!("{}", rendered),
                }
            }
        }
        Ok(())
    }
}
