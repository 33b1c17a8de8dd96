use anyhow::Result;
use clap::Subcommand;
use conductor_rest_api_contract::{RunStatus, RunSummary};
use conductor_rest_client::DaemonClient;

use crate::context::with_deadline;
use crate::output::{render_structured, render_table, OutputFormat};

/// Run-related commands
#[derive(Subcommand)]
pub enum RunsCommands {
    /// List workflow runs known to the daemon
    List {
        /// Only runs with this status
        #[arg(long, value_name = "STATUS", value_parser = parse_status, conflicts_with = "active")]
        status: Option<RunStatus>,

        /// Only pending or running runs
        #[arg(long)]
        active: bool,

        /// Output style
        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,
    },
}

fn parse_status(raw: &str) -> std::result::Result<RunStatus, String> {
    RunStatus::ALL
        .into_iter()
        .find(|status| status.as_str() == raw)
        .ok_or_else(|| {
            let known: Vec<&str> = RunStatus::ALL.iter().map(RunStatus::as_str).collect();
            format!("unknown status '{}' (expected one of: {})", raw, known.join(", "))
        })
}

/// Keep runs matching the filters, preserving daemon order.
pub fn filter_runs(runs: Vec<RunSummary>, status: Option<RunStatus>, active: bool) -> Vec<RunSummary> {
    runs.into_iter()
        .filter(|run| status.map_or(true, |s| run.status == s))
        .filter(|run| !active || run.status.is_active())
        .collect()
}

impl RunsCommands {
    /// Execute the runs command against `client`
    pub async fn run(self, client: &DaemonClient) -> Result<()> {
        match self {
            RunsCommands::List {
                status,
                active,
                output,
            } => {
                let runs =
                    with_deadline("list runs", async { Ok(client.list_runs().await?) }).await?;
                let runs = filter_runs(runs, status, active);
                if let Some(text) = render_structured(&runs, output)? {
                    println!("{}", text);
                } else if runs.is_empty() {
                    println!("No runs");
                } else {
                    let rows: Vec<Vec<String>> = runs
                        .iter()
                        .map(|r| vec![r.id.clone(), r.workflow.clone(), r.status.to_string()])
                        .collect();
                    println!("{}", render_table(&["ID", "WORKFLOW", "STATUS"], &rows));
                }
            }
        }
        Ok(())
    }
}
