use std::io::Write;

use anyhow::Result;
use conductor_cli::context::{daemon_client, interruptible};
use conductor_cli::{AppContext, Cli, Commands, Parser};
use tracing_subscriber::EnvFilter;

/// Log filter variable; defaults to `warn`.
const LOG_ENV: &str = "CONDUCTOR_LOG";

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli { workspace, command } = Cli::parse();

    let command = match command {
        Commands::Complete(args) => {
            // Completion output must stay clean: no logs, no panic messages.
            std::panic::set_hook(Box::new(|_| {}));
            args.run(workspace).await;
            let _ = std::io::stdout().flush();
            // Do not wait for blocking sources that overran the deadline.
            std::process::exit(0);
        }
        command => command,
    };

    init_tracing();

    let result = interruptible(async move {
        match command {
            Commands::Workspace { subcommand } => {
                subcommand.run(&AppContext::open(workspace).await?).await
            }
            Commands::Integrations { subcommand } => {
                subcommand.run(&AppContext::open(workspace).await?).await
            }
            Commands::Bindings { subcommand } => {
                subcommand.run(&AppContext::open(workspace).await?).await
            }
            Commands::Mcp { subcommand } => subcommand.run(&daemon_client()?).await,
            Commands::Runs { subcommand } => subcommand.run(&daemon_client()?).await,
            Commands::Complete(_) => Ok(()),
        }
    })
    .await;

    if let Err(e) = result {
        eprintln!("Error: {:?}", e);
        // A timed-out store call may still hold a blocking thread.
        std::process::exit(1);
    }
    Ok(())
}
