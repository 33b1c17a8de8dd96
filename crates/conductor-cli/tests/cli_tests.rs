use conductor_cli::completion::CompletionSource;
use conductor_cli::output::OutputFormat;
use conductor_cli::{
    BindingsCommands, Cli, Commands, IntegrationsCommands, McpCommands, Parser, RunsCommands,
    WorkspaceCommands,
};
use conductor_core::ExportFormat;

#[test]
fn test_cli_parsing_workspace_create() {
    let args = vec![
        "conductor",
        "workspace",
        "create",
        "staging",
        "--description",
        "Staging credentials",
        "--use",
    ];

    let cli = Cli::try_parse_from(args).unwrap();
    match cli.command {
        Commands::Workspace {
            subcommand: WorkspaceCommands::Create(create),
        } => {
            assert_eq!(create.name, "staging");
            assert_eq!(create.description.as_deref(), Some("Staging credentials"));
            assert!(create.switch);
        }
        _ => panic!("expected workspace create"),
    }
}

#[test]
fn test_cli_parsing_global_workspace_flag() {
    let args = vec!["conductor", "integrations", "list", "--workspace", "prod", "-o", "json"];

    let cli = Cli::try_parse_from(args).unwrap();
    assert_eq!(cli.workspace.as_deref(), Some("prod"));
    assert!(matches!(
        cli.command,
        Commands::Integrations {
            subcommand: IntegrationsCommands::List {
                output: OutputFormat::Json,
                integration_type: None,
            }
        }
    ));
}

#[test]
fn test_cli_parsing_integration_add() {
    let args = vec![
        "conductor",
        "integrations",
        "add",
        "github-prod",
        "--type",
        "github",
        "--base-url",
        "https://api.github.com",
        "--token",
        "ghp_xxx",
        "--header",
        "Accept=application/vnd.github+json",
        "--timeout",
        "10",
        "--dry-run",
    ];

    let cli = Cli::try_parse_from(args).unwrap();
    match cli.command {
        Commands::Integrations {
            subcommand: IntegrationsCommands::Add(add),
        } => {
            assert_eq!(add.name, "github-prod");
            assert_eq!(add.integration_type, "github");
            assert_eq!(add.auth.token.as_deref(), Some("ghp_xxx"));
            assert_eq!(
                add.headers,
                vec![(
                    "Accept".to_string(),
                    "application/vnd.github+json".to_string()
                )]
            );
            assert_eq!(add.timeout, 10);
            assert!(add.dry_run);
        }
        _ => panic!("expected integrations add"),
    }
}

#[test]
fn test_cli_integration_add_defaults() {
    let args = vec!["conductor", "integration", "add", "jira", "--type", "jira"];

    let cli = Cli::try_parse_from(args).unwrap();
    match cli.command {
        Commands::Integrations {
            subcommand: IntegrationsCommands::Add(add),
        } => {
            assert_eq!(add.timeout, 30);
            assert!(!add.dry_run);
            assert_eq!(add.output, OutputFormat::Table);
        }
        _ => panic!("expected integrations add"),
    }
}

#[test]
fn test_cli_basic_auth_flags_travel_together() {
    let args = vec![
        "conductor",
        "integrations",
        "add",
        "jira",
        "--type",
        "jira",
        "--username",
        "bot",
    ];
    assert!(Cli::try_parse_from(args).is_err());
}

#[test]
fn test_cli_add_requires_type() {
    let args = vec!["conductor", "integrations", "add", "jira"];
    assert!(Cli::try_parse_from(args).is_err());
}

#[test]
fn test_cli_parsing_bindings_resolve() {
    let args = vec![
        "conductor",
        "bindings",
        "resolve",
        "flows/review.yaml",
        "--bind-integration",
        "github=github-prod",
        "--bind-integration",
        "alerts=slack-ops",
        "--run-id",
        "run-42",
    ];

    let cli = Cli::try_parse_from(args).unwrap();
    match cli.command {
        Commands::Bindings {
            subcommand: BindingsCommands::Resolve(resolve),
        } => {
            assert_eq!(resolve.workflow.to_str(), Some("flows/review.yaml"));
            assert_eq!(
                resolve.bind_integration,
                vec!["github=github-prod", "alerts=slack-ops"]
            );
            assert_eq!(resolve.run_id.as_deref(), Some("run-42"));
        }
        _ => panic!("expected bindings resolve"),
    }
}

#[test]
fn test_cli_parsing_workspace_export() {
    let args = vec!["conductor", "workspace", "export", "prod", "--format", "json"];

    let cli = Cli::try_parse_from(args).unwrap();
    match cli.command {
        Commands::Workspace {
            subcommand: WorkspaceCommands::Export(export),
        } => {
            assert_eq!(export.name.as_deref(), Some("prod"));
            assert_eq!(export.format, ExportFormat::Json);
            assert!(export.file.is_none());
        }
        _ => panic!("expected workspace export"),
    }

    let args = vec!["conductor", "workspace", "export", "--format", "toml"];
    assert!(Cli::try_parse_from(args).is_err());
}

#[test]
fn test_cli_parsing_mcp_and_runs() {
    let cli = Cli::try_parse_from(vec!["conductor", "mcp", "restart", "github"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Mcp {
            subcommand: McpCommands::Restart { .. }
        }
    ));

    let cli = Cli::try_parse_from(vec!["conductor", "mcp", "rm", "github"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Mcp {
            subcommand: McpCommands::Remove { .. }
        }
    ));

    let cli = Cli::try_parse_from(vec!["conductor", "runs", "list", "--active"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Runs {
            subcommand: RunsCommands::List { active: true, .. }
        }
    ));

    let args = vec!["conductor", "runs", "list", "--active", "--status", "failed"];
    assert!(Cli::try_parse_from(args).is_err());
}

#[test]
fn test_cli_parsing_hidden_complete() {
    let cli = Cli::try_parse_from(vec!["conductor", "__complete", "active-runs", "run-"]).unwrap();
    match cli.command {
        Commands::Complete(args) => {
            assert_eq!(args.source, CompletionSource::ActiveRuns);
            assert_eq!(args.prefix, "run-");
        }
        _ => panic!("expected __complete"),
    }

    let cli = Cli::try_parse_from(vec!["conductor", "__complete", "workflows"]).unwrap();
    match cli.command {
        Commands::Complete(args) => assert_eq!(args.prefix, ""),
        _ => panic!("expected __complete"),
    }
}
