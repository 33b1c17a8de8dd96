//! End-to-end tests for the completion engine.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use axum::routing::get;
use axum::{Json, Router};
use conductor_cli::completion::runs::complete_runs;
use conductor_cli::completion::workflows::{discover_workflows, MAX_WORKFLOW_CANDIDATES};
use conductor_cli::completion::{
    complete, safe_complete_async, Completion, CompletionEnv, CompletionSource, Directive,
    RunCache,
};
use conductor_core::{ConfigPaths, NewIntegration, WorkspaceStore};
use conductor_crypto::generate_key;
use conductor_rest_api_contract::{McpServerInfo, RunStatus, RunSummary};
use conductor_rest_client::{ClientError, ClientResult, ControlPlane, DaemonClient};
use serde_json::json;
use tempfile::TempDir;

const WORKFLOW: &str = "name: sample\nsteps: []\n";

fn write(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

fn set_age(path: &Path, seconds_ago: u64) {
    let file = fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - Duration::from_secs(seconds_ago))
        .unwrap();
}

fn env_for(dir: &Path) -> CompletionEnv {
    CompletionEnv {
        cwd: dir.to_path_buf(),
        config: Some(ConfigPaths::from_dir(dir.join("config"))),
        db_path: Some(dir.join("home").join("conductor.db")),
        daemon: None,
        workspace: None,
    }
}

fn values(completion: &Completion) -> Vec<&str> {
    completion
        .candidates
        .iter()
        .map(|c| c.split('\t').next().unwrap())
        .collect()
}

struct FakeDaemon {
    calls: AtomicUsize,
    failing: AtomicBool,
    panicking: bool,
}

impl FakeDaemon {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            panicking: false,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ControlPlane for FakeDaemon {
    async fn list_runs(&self) -> ClientResult<Vec<RunSummary>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panicking {
            panic!("daemon fake exploded");
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClientError::Timeout);
        }
        Ok(vec![
            RunSummary {
                id: "run-001".into(),
                workflow: "test".into(),
                status: RunStatus::Running,
            },
            RunSummary {
                id: "run-002".into(),
                workflow: "nightly".into(),
                status: RunStatus::Completed,
            },
            RunSummary {
                id: "run-003".into(),
                workflow: "deploy".into(),
                status: RunStatus::Pending,
            },
        ])
    }

    async fn list_mcp_servers(&self) -> ClientResult<Vec<McpServerInfo>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_run_cache_serves_within_ttl_and_refetches_after() {
    let daemon = FakeDaemon::new();
    let cache = RunCache::new(Duration::from_millis(200));

    let first = complete_runs(&cache, &daemon, false).await.unwrap();
    assert_eq!(
        first.candidates,
        vec![
            "run-001\ttest (running)",
            "run-002\tnightly (completed)",
            "run-003\tdeploy (pending)"
        ]
    );
    complete_runs(&cache, &daemon, false).await.unwrap();
    assert_eq!(daemon.calls(), 1);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!cache.is_fresh().await);
    complete_runs(&cache, &daemon, false).await.unwrap();
    assert_eq!(daemon.calls(), 2);
    assert!(cache.is_fresh().await);
}

#[tokio::test]
async fn test_active_runs_share_the_cache() {
    let daemon = FakeDaemon::new();
    let cache = RunCache::new(Duration::from_secs(2));

    complete_runs(&cache, &daemon, false).await.unwrap();
    let active = complete_runs(&cache, &daemon, true).await.unwrap();
    assert_eq!(values(&active), vec!["run-001", "run-003"]);
    assert_eq!(daemon.calls(), 1);
}

#[tokio::test]
async fn test_failed_fetch_empties_the_cache() {
    let daemon = FakeDaemon::new();
    let cache = RunCache::new(Duration::from_millis(100));

    complete_runs(&cache, &daemon, false).await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    daemon.failing.store(true, Ordering::SeqCst);
    let completion = safe_complete_async(complete_runs(&cache, &daemon, false)).await;
    assert_eq!(completion, Completion::empty());
    assert!(!cache.is_fresh().await);

    daemon.failing.store(false, Ordering::SeqCst);
    assert_eq!(
        complete_runs(&cache, &daemon, false).await.unwrap().candidates.len(),
        3
    );
    assert_eq!(daemon.calls(), 3);
}

#[tokio::test]
async fn test_panicking_daemon_yields_empty_list() {
    let daemon = FakeDaemon {
        panicking: true,
        ..FakeDaemon::new()
    };
    let cache = RunCache::new(Duration::from_secs(2));

    let completion = safe_complete_async(complete_runs(&cache, &daemon, true)).await;
    assert_eq!(completion, Completion::empty());
    assert!(!cache.is_fresh().await);
}

#[tokio::test]
async fn test_runs_from_daemon_are_cached_process_wide() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let router = Router::new().route(
        "/v1/runs",
        get(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Json(json!({"runs": [{"id": "run-001", "workflow": "test", "status": "running"}]}))
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let dir = TempDir::new().unwrap();
    let mut env = env_for(dir.path());
    env.daemon = Some(Arc::new(
        DaemonClient::from_host(&format!("tcp://{}", addr)).unwrap(),
    ));

    let first = complete(CompletionSource::Runs, "", &env).await;
    let second = complete(CompletionSource::Runs, "run", &env).await;
    assert_eq!(first.candidates, vec!["run-001\ttest (running)"]);
    assert_eq!(second, first);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let none = complete(CompletionSource::Runs, "zzz", &env).await;
    assert!(none.candidates.is_empty());
}

#[test]
fn test_workflow_depth_limit() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "top.yaml", WORKFLOW);
    write(dir.path(), "a/one.yml", WORKFLOW);
    write(dir.path(), "a/b/two.yaml", WORKFLOW);
    write(dir.path(), "a/b/c/three.yaml", WORKFLOW);

    let mut found = discover_workflows(dir.path(), "");
    found.sort();
    assert_eq!(
        found,
        vec![
            "a/b/two.yaml",
            "a/one.yml",
            "top.yaml",
        ]
    );
}

#[test]
fn test_workflow_filters() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "flow.yaml", WORKFLOW);
    write(dir.path(), "config.yaml", "providers: {}\n");
    write(dir.path(), "list.yaml", "- name: not-a-mapping\n");
    write(dir.path(), "notes.txt", WORKFLOW);
    write(dir.path(), ".github/workflows/ci.yaml", WORKFLOW);
    write(dir.path(), "sub/.hidden/deep.yaml", WORKFLOW);

    assert_eq!(discover_workflows(dir.path(), ""), vec!["flow.yaml"]);
}

#[cfg(unix)]
#[test]
fn test_workflow_symlinks_are_rejected() {
    let dir = TempDir::new().unwrap();
    let target = write(dir.path(), "real/flow.yaml", WORKFLOW);
    std::os::unix::fs::symlink(&target, dir.path().join("link.yaml")).unwrap();
    std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("linked-dir")).unwrap();

    assert_eq!(
        discover_workflows(dir.path(), ""),
        vec!["real/flow.yaml"]
    );
}

#[test]
fn test_workflows_newest_first_and_capped() {
    let dir = TempDir::new().unwrap();
    for i in 0..(MAX_WORKFLOW_CANDIDATES + 20) {
        let path = write(dir.path(), &format!("flow-{:03}.yaml", i), WORKFLOW);
        set_age(&path, 1000 - i as u64);
    }

    let found = discover_workflows(dir.path(), "");
    assert_eq!(found.len(), MAX_WORKFLOW_CANDIDATES);
    assert_eq!(found[0], "flow-119.yaml");
    assert_eq!(found[MAX_WORKFLOW_CANDIDATES - 1], "flow-020.yaml");
}

#[tokio::test]
async fn test_old_matching_workflow_survives_the_cap() {
    let dir = TempDir::new().unwrap();
    let legacy = write(dir.path(), "legacy/release.yaml", WORKFLOW);
    set_age(&legacy, 5000);
    for i in 0..(MAX_WORKFLOW_CANDIDATES + 5) {
        let path = write(dir.path(), &format!("flow-{:03}.yaml", i), WORKFLOW);
        set_age(&path, 1000 - i as u64);
    }

    let completion = complete(CompletionSource::Workflows, "legacy/", &env_for(dir.path())).await;
    assert_eq!(completion.candidates, vec!["legacy/release.yaml"]);
    assert_eq!(completion.directive, Directive::NO_FILE_COMP);
}

#[tokio::test]
async fn test_github_prefix_short_circuits() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "gizmo.yaml", WORKFLOW);
    let env = env_for(dir.path());

    for prefix in ["g", "gi", "github:", "github:acme/"] {
        let completion = complete(CompletionSource::Workflows, prefix, &env).await;
        assert_eq!(completion.candidates, vec!["github:"], "prefix {}", prefix);
        assert_eq!(completion.directive, Directive::NO_SPACE);
    }
}

#[tokio::test]
async fn test_no_local_workflow_offers_github() {
    let dir = TempDir::new().unwrap();
    let env = env_for(dir.path());

    let completion = complete(CompletionSource::Workflows, "", &env).await;
    assert_eq!(completion.candidates, vec!["github:"]);

    write(dir.path(), "flows/deploy.yaml", WORKFLOW);
    let completion = complete(CompletionSource::Workflows, "flows/", &env).await;
    assert_eq!(completion.candidates, vec!["flows/deploy.yaml"]);
    assert_eq!(completion.directive, Directive::NO_FILE_COMP);

    let completion = complete(CompletionSource::Workflows, "other", &env).await;
    assert_eq!(completion.candidates, vec!["github:"]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_config_permission_gate() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let env = env_for(dir.path());
    let config = write(
        dir.path(),
        "config/config.yaml",
        "default_provider: work\nproviders:\n  work:\n    type: anthropic\n  local:\n    type: ollama\n",
    );
    let mcp = write(
        dir.path(),
        "config/mcp.yaml",
        "servers:\n  github:\n    command: mcp-github\n  fs:\n    command: mcp-fs\n",
    );

    fs::set_permissions(&config, fs::Permissions::from_mode(0o644)).unwrap();
    fs::set_permissions(&mcp, fs::Permissions::from_mode(0o640)).unwrap();
    assert!(complete(CompletionSource::Providers, "", &env).await.candidates.is_empty());
    assert!(complete(CompletionSource::McpServers, "", &env).await.candidates.is_empty());

    fs::set_permissions(&config, fs::Permissions::from_mode(0o600)).unwrap();
    fs::set_permissions(&mcp, fs::Permissions::from_mode(0o600)).unwrap();
    assert_eq!(
        complete(CompletionSource::Providers, "", &env).await.candidates,
        vec!["local", "work"]
    );
    assert_eq!(
        complete(CompletionSource::McpServers, "g", &env).await.candidates,
        vec!["github"]
    );
}

#[tokio::test]
async fn test_missing_config_files_complete_to_nothing() {
    let dir = TempDir::new().unwrap();
    let env = env_for(dir.path());
    assert!(complete(CompletionSource::Providers, "", &env).await.candidates.is_empty());
    assert!(complete(CompletionSource::McpServers, "", &env).await.candidates.is_empty());
}

#[tokio::test]
async fn test_static_sources() {
    let dir = TempDir::new().unwrap();
    let env = env_for(dir.path());

    let types = complete(CompletionSource::ProviderTypes, "", &env).await;
    assert_eq!(values(&types), vec!["claude-code", "anthropic", "openai", "ollama"]);

    let security = complete(CompletionSource::Security, "", &env).await;
    assert_eq!(
        values(&security),
        vec!["unrestricted", "standard", "strict", "air-gapped"]
    );

    let status = complete(CompletionSource::Status, "c", &env).await;
    assert_eq!(values(&status), vec!["completed", "cancelled"]);

    let backend = complete(CompletionSource::Backend, "", &env).await;
    assert_eq!(values(&backend), vec!["env", "keychain", "file"]);

    let templates = complete(CompletionSource::McpTemplates, "", &env).await;
    assert_eq!(templates.candidates.len(), 7);

    let operations = complete(CompletionSource::Operations, "transform.", &env).await;
    assert!(values(&operations).contains(&"transform.parse_json"));
    assert!(values(&operations).iter().all(|v| v.starts_with("transform.")));

    let examples = complete(CompletionSource::Examples, "hello", &env).await;
    assert_eq!(values(&examples), vec!["hello-world"]);
    assert!(examples.candidates[0].contains('\t'));
}

#[tokio::test]
async fn test_workspace_and_integration_names_without_master_key() {
    let dir = TempDir::new().unwrap();
    let env = env_for(dir.path());
    let db_path = env.db_path.clone().unwrap();

    assert!(complete(CompletionSource::Workspaces, "", &env).await.candidates.is_empty());
    assert!(!db_path.exists(), "completion must not create the database");

    let store = WorkspaceStore::open(&db_path, &generate_key().unwrap()).unwrap();
    store.create_workspace("staging", None).unwrap();
    store
        .create_integration("staging", NewIntegration::new("github-prod", "github"))
        .unwrap();
    store
        .create_integration("default", NewIntegration::new("slack-ops", "slack"))
        .unwrap();
    store.close().unwrap();

    let workspaces = complete(CompletionSource::Workspaces, "", &env).await;
    assert_eq!(workspaces.candidates, vec!["default", "staging"]);

    let integrations = complete(CompletionSource::Integrations, "", &env).await;
    assert_eq!(integrations.candidates, vec!["slack-ops\tslack"]);

    let mut scoped = env.clone();
    scoped.workspace = Some("staging".into());
    let integrations = complete(CompletionSource::Integrations, "git", &scoped).await;
    assert_eq!(integrations.candidates, vec!["github-prod\tgithub"]);
}
