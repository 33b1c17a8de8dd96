use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use conductor_core::{
    merge_bindings, AuditContext, BindingResolver, ResolvedBinding, WorkflowDefinition,
    BIND_INTEGRATION_ENV,
};
use serde::Serialize;

use crate::context::AppContext;
use crate::output::{render_structured, render_table, OutputFormat};

/// Binding-related commands
#[derive(Subcommand)]
pub enum BindingsCommands {
    /// Resolve a workflow's integration requirements against the workspace
    Resolve(BindingsResolveArgs),
}

#[derive(Args)]
pub struct BindingsResolveArgs {
    /// Workflow file
    #[arg(value_name = "WORKFLOW")]
    pub workflow: PathBuf,

    /// Bind a requirement to a named integration (IDENTIFIER=NAME, repeatable)
    #[arg(long = "bind-integration", value_name = "IDENTIFIER=NAME")]
    pub bind_integration: Vec<String>,

    /// Run ID recorded in the audit log
    #[arg(long = "run-id", value_name = "ID")]
    pub run_id: Option<String>,

    /// Output style
    #[arg(short, long, value_enum, default_value_t)]
    pub output: OutputFormat,
}

#[derive(Debug, Serialize)]
pub struct BindingView {
    pub identifier: String,
    pub requirement: String,
    pub integration: String,
    #[serde(rename = "type")]
    pub integration_type: String,
    pub method: String,
}

impl From<&ResolvedBinding> for BindingView {
    fn from(binding: &ResolvedBinding) -> Self {
        Self {
            identifier: binding.requirement.identifier().to_string(),
            requirement: binding.requirement.to_string(),
            integration: binding.integration.name.clone(),
            integration_type: binding.integration.integration_type.clone(),
            method: binding.method.to_string(),
        }
    }
}

impl BindingsCommands {
    /// Execute the bindings command
    pub async fn run(self, ctx: &AppContext) -> Result<()> {
        match self {
            BindingsCommands::Resolve(args) => {
                ctx.blocking("binding resolution", move |ctx| args.run(ctx))
                    .await
            }
        }
    }
}

impl BindingsResolveArgs {
    /// Resolve the workflow's requirements and return one view per binding,
    /// in identifier order.
    pub fn resolve(&self, ctx: &AppContext) -> Result<Vec<BindingView>> {
        let workflow = WorkflowDefinition::load(&self.workflow)?;
        let requirements = workflow
            .requirements()
            .with_context(|| format!("invalid requirements in {}", self.workflow.display()))?;

        let env = std::env::var(BIND_INTEGRATION_ENV).ok();
        let explicit = merge_bindings(env.as_deref(), &self.bind_integration)?;

        let audit_context = match &self.run_id {
            Some(run_id) => AuditContext::for_run(run_id.clone()),
            None => AuditContext::default(),
        };

        let workspace = ctx.workspace()?;
        let resolved = BindingResolver::new(ctx.store(), ctx.audit()).resolve(
            &workspace,
            &requirements,
            &explicit,
            &audit_context,
        )?;
        Ok(resolved.values().map(BindingView::from).collect())
    }

    fn run(self, ctx: &AppContext) -> Result<()> {
        let views = self.resolve(ctx)?;
        if let Some(text) = render_structured(&views, self.output)? {
            println!("{}", text);
        } else if views.is_empty() {
            println!("Workflow requires no integrations");
        } else {
            let rows: Vec<Vec<String>> = views
                .iter()
                .map(|v| {
                    vec![
                        v.identifier.clone(),
                        v.integration.clone(),
                        v.integration_type.clone(),
                        v.method.clone(),
                    ]
                })
                .collect();
            println!(
                "{}",
                render_table(&["REQUIREMENT", "INTEGRATION", "TYPE", "METHOD"], &rows)
            );
        }
        Ok(())
    }
}
