use anyhow::Result;
use clap::Subcommand;
use conductor_rest_client::DaemonClient;

use crate::context::with_deadline;
use crate::output::{render_structured, render_table, OutputFormat};

/// MCP server commands, served by the controller daemon
#[derive(Subcommand)]
pub enum McpCommands {
    /// List registered MCP servers
    List {
        /// Output style
        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,
    },
    /// Show a server's state and health
    Status {
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// List the tools a server exposes
    Tools {
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Print a server's recent log lines
    Logs {
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Start a server
    Start {
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Stop a server
    Stop {
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Restart a server
    Restart {
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Unregister a server
    #[command(alias = "rm")]
    Remove {
        #[arg(value_name = "NAME")]
        name: String,
    },
}

impl McpCommands {
    /// Execute the MCP command against `client`
    pub async fn run(self, client: &DaemonClient) -> Result<()> {
        match self {
            McpCommands::List { output } => {
                let servers = with_deadline("list MCP servers", async {
                    Ok(client.list_mcp_servers().await?)
                })
                .await?;
                if let Some(text) = render_structured(&servers, output)? {
                    println!("{}", text);
                } else if servers.is_empty() {
                    println!("No MCP servers registered");
                } else {
                    let rows: Vec<Vec<String>> = servers
                        .iter()
                        .map(|s| {
                            vec![
                                s.name.clone(),
                                s.status.to_string(),
                                s.pid.map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
                                s.restart_count.to_string(),
                            ]
                        })
                        .collect();
                    println!("{}", render_table(&["NAME", "STATUS", "PID", "RESTARTS"], &rows));
                }
            }
            McpCommands::Status { name } => {
                let (server, health) = with_deadline("MCP server status", async {
                    let server = client.get_mcp_server(&name).await?;
                    let health = client.mcp_server_health(&name).await?;
                    Ok((server, health))
                })
                .await?;
                println!("Name:     {}", server.name);
                println!("Status:   {}", server.status);
                if let Some(command) = &server.command {
                    println!("Command:  {} {}", command, server.args.join(" "));
                }
                if let Some(pid) = server.pid {
                    println!("PID:      {}", pid);
                }
                if let Some(started_at) = server.started_at {
                    println!("Started:  {}", started_at.to_rfc3339());
                }
                println!("Restarts: {}", server.restart_count);
                if let Some(error) = &server.last_error {
                    println!("Error:    {}", error);
                }
                let verdict = if health.healthy { "healthy" } else { "unhealthy" };
                match &health.message {
                    Some(message) => println!("Health:   {} ({})", verdict, message),
                    None => println!("Health:   {}", verdict),
                }
            }
            McpCommands::Tools { name } => {
                let tools = with_deadline("list MCP tools", async {
                    Ok(client.mcp_server_tools(&name).await?)
                })
                .await?;
                for tool in tools {
                    match tool.description {
                        Some(description) => println!("{}\t{}", tool.name, description),
                        None => println!("{}", tool.name),
                    }
                }
            }
            McpCommands::Logs { name } => {
                let lines = with_deadline("fetch MCP logs", async {
                    Ok(client.mcp_server_logs(&name).await?)
                })
                .await?;
                for line in lines {
                    println!("{}", line);
                }
            }
            McpCommands::Start { name } => {
                with_deadline("start MCP server", async {
                    Ok(client.start_mcp_server(&name).await?)
                })
                .await?;
                println!("Started MCP server '{}'", name);
            }
            McpCommands::Stop { name } => {
                with_deadline("stop MCP server", async {
                    Ok(client.stop_mcp_server(&name).await?)
                })
                .await?;
                println!("Stopped MCP server '{}'", name);
            }
            McpCommands::Restart { name } => {
                with_deadline("restart MCP server", async {
                    Ok(client.restart_mcp_server(&name).await?)
                })
                .await?;
                println!("Restarted MCP server '{}'", name);
            }
            McpCommands::Remove { name } => {
                with_deadline("remove MCP server", async {
                    Ok(client.unregister_mcp_server(&name).await?)
                })
                .await?;
                println!("Removed MCP server '{}'", name);
            }
        }
        Ok(())
    }
}
