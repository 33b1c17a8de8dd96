//! Tests for the daemon client against an in-process mock daemon.

use std::collections::BTreeMap;
use std::time::Duration;

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use conductor_rest_api_contract::{RegisterServerRequest, RunStatus};
use conductor_rest_client::{probe_endpoint, AuthMethod, ClientError, DaemonClient};
use serde_json::{json, Value};

/// Serve `router` on an ephemeral port and return its base URL.
async fn spawn_daemon(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn mock_router() -> Router {
    Router::new()
        .route(
            "/v1/runs",
            get(|| async {
                Json(json!({
                    "runs": [
                        {"id": "run-001", "workflow": "test", "status": "running"},
                        {"id": "run-002", "workflow": "nightly", "status": "completed"}
                    ]
                }))
            }),
        )
        .route(
            "/v1/mcp/servers",
            get(|| async {
                Json(json!({"servers": [{"name": "fs", "status": "running", "pid": 42}]}))
            })
            .post(|Json(body): Json<Value>| async move {
                if body["name"] == "taken" {
                    (StatusCode::CONFLICT, Json(json!({"error": "server 'taken' already registered"})))
                } else {
                    (StatusCode::CREATED, Json(json!({})))
                }
            }),
        )
        .route(
            "/v1/mcp/servers/{name}",
            get(|Path(name): Path<String>| async move {
                if name == "fs" {
                    (StatusCode::OK, Json(json!({"name": "fs", "status": "running"})))
                } else {
                    (StatusCode::NOT_FOUND, Json(json!({"error": format!("server '{}' not found", name)})))
                }
            })
            .delete(|| async { StatusCode::NO_CONTENT }),
        )
        .route(
            "/v1/mcp/servers/{name}/tools",
            get(|| async { Json(json!({"tools": [{"name": "read_file", "description": "Read a file"}]})) }),
        )
        .route(
            "/v1/mcp/servers/{name}/health",
            get(|| async { Json(json!({"healthy": true})) }),
        )
        .route(
            "/v1/mcp/servers/{name}/logs",
            get(|| async { Json(json!({"lines": ["started", "ready"]})) }),
        )
        .route(
            "/v1/mcp/servers/{name}/start",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .route("/v1/mcp/servers/{name}/stop", post(|| async { StatusCode::OK }))
        .route(
            "/v1/mcp/servers/{name}/restart",
            post(|| async { StatusCode::ACCEPTED }),
        )
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                "late"
            }),
        )
        .route(
            "/whoami",
            get(|headers: HeaderMap| async move {
                match headers.get("authorization").and_then(|v| v.to_str().ok()) {
                    Some("Bearer good") => StatusCode::OK,
                    _ => StatusCode::UNAUTHORIZED,
                }
            }),
        )
}

#[tokio::test]
async fn test_list_runs() {
    let base = spawn_daemon(mock_router()).await;
    let client = DaemonClient::from_host(&base).unwrap();

    let runs = client.list_runs().await.unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].id, "run-001");
    assert_eq!(runs[0].status, RunStatus::Running);
}

#[tokio::test]
async fn test_tcp_scheme_reaches_daemon() {
    let base = spawn_daemon(mock_router()).await;
    let client = DaemonClient::from_host(&base.replace("http://", "tcp://")).unwrap();
    assert_eq!(client.list_mcp_servers().await.unwrap()[0].pid, Some(42));
}

#[tokio::test]
async fn test_mcp_server_queries() {
    let base = spawn_daemon(mock_router()).await;
    let client = DaemonClient::from_host(&base).unwrap();

    assert_eq!(client.get_mcp_server("fs").await.unwrap().name, "fs");
    assert_eq!(client.mcp_server_tools("fs").await.unwrap()[0].name, "read_file");
    assert!(client.mcp_server_health("fs").await.unwrap().healthy);
    assert_eq!(client.mcp_server_logs("fs").await.unwrap(), vec!["started", "ready"]);
}

#[tokio::test]
async fn test_error_body_becomes_message() {
    let base = spawn_daemon(mock_router()).await;
    let client = DaemonClient::from_host(&base).unwrap();

    let err = client.get_mcp_server("ghost").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.to_string(), "server 'ghost' not found");

    let err = client.start_mcp_server("fs").await.unwrap_err();
    assert_eq!(err.to_string(), "HTTP status 500");
}

#[tokio::test]
async fn test_lifecycle_and_registration() {
    let base = spawn_daemon(mock_router()).await;
    let client = DaemonClient::from_host(&base).unwrap();

    client.stop_mcp_server("fs").await.unwrap();
    client.restart_mcp_server("fs").await.unwrap();
    client.unregister_mcp_server("fs").await.unwrap();

    let mut request = RegisterServerRequest {
        name: "github".into(),
        command: "mcp-github".into(),
        args: vec!["--stdio".into()],
        env: BTreeMap::new(),
    };
    client.register_mcp_server(&request).await.unwrap();

    request.name = "taken".into();
    let err = client.register_mcp_server(&request).await.unwrap_err();
    assert_eq!(err.status(), Some(409));

    request.command = String::new();
    assert!(matches!(
        client.register_mcp_server(&request).await,
        Err(ClientError::Contract(_))
    ));
}

#[tokio::test]
async fn test_probe_timeout_and_auth() {
    let base = spawn_daemon(mock_router()).await;
    let none = BTreeMap::new();

    let err = probe_endpoint(
        &format!("{}/slow", base),
        &AuthMethod::None,
        &none,
        Duration::from_millis(200),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ClientError::Timeout));

    let ok = probe_endpoint(
        &format!("{}/whoami", base),
        &AuthMethod::bearer("good"),
        &none,
        Duration::from_secs(5),
    )
    .await
    .unwrap();
    assert_eq!(ok.status, 200);

    let err = probe_endpoint(
        &format!("{}/whoami", base),
        &AuthMethod::bearer("bad"),
        &none,
        Duration::from_secs(5),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), Some(401));
}

#[tokio::test]
async fn test_unreachable_daemon_is_an_error() {
    let client = DaemonClient::from_host("http://127.0.0.1:9")
        .unwrap()
        .with_timeout(Duration::from_millis(500));
    assert!(client.list_runs().await.is_err());
}
