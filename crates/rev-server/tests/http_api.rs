//! HTTP surface tests: a real listener, a real client, and the engine
//! behind them with an in-memory history store.

use std::net::SocketAddr;
use std::sync::Arc;

use rev_server::database::{Engine, EngineConfig};
use rev_server::http;
use rev_sql::storage::MemoryHistory;
use tempfile::TempDir;

async fn start_server() -> (SocketAddr, TempDir, tokio::task::JoinHandle<()>) {
    let dir = TempDir::new().unwrap();
    let engine = Engine::open(
        EngineConfig::with_root(dir.path().join("data")),
        Arc::new(MemoryHistory::new()),
    )
    .unwrap();
    let app = http::router(Arc::new(engine));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (addr, dir, handle)
}

async fn post_sql(
    addr: SocketAddr,
    session: &str,
    sql: &str,
) -> (reqwest::StatusCode, serde_json::Value) {
    let response = reqwest::Client::new()
        .post(format!("http://{}/sql", addr))
        .header("Session-ID", session)
        .json(&serde_json::json!({ "sql": sql }))
        .send()
        .await
        .unwrap();
    let status = response.status();
    let body = response.json().await.unwrap();
    (status, body)
}

#[tokio::test]
async fn test_health_endpoint() {
    let (addr, _dir, handle) = start_server().await;

    let response = reqwest::get(format!("http://{}/health", addr))
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({"status": "ok"}));

    handle.abort();
}

#[tokio::test]
async fn test_sql_round_trip_over_http() {
    let (addr, _dir, handle) = start_server().await;

    let (status, body) = post_sql(
        addr,
        "http-session",
        "CREATE DATABASE d; USE DATABASE d; CREATE TABLE t (x INT); \
         INSERT INTO t (x) VALUES ('7'); SELECT * FROM t",
    )
    .await;

    assert_eq!(status, reqwest::StatusCode::OK);
    let outputs = body.as_array().unwrap();
    assert_eq!(outputs.len(), 5);
    assert_eq!(outputs[0], serde_json::json!({"status": "ok"}));
    let rows = outputs[4].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["x"], serde_json::json!(7));

    handle.abort();
}

#[tokio::test]
async fn test_session_persists_across_requests() {
    let (addr, _dir, handle) = start_server().await;

    let (status, _) = post_sql(addr, "alpha", "CREATE DATABASE d; USE DATABASE d").await;
    assert_eq!(status, reqwest::StatusCode::OK);

    // Same session id: the selected database carries over.
    let (status, _) = post_sql(addr, "alpha", "CREATE TABLE t (x INT)").await;
    assert_eq!(status, reqwest::StatusCode::OK);

    // A fresh session id has no database selected.
    let (status, body) = post_sql(addr, "beta", "CREATE TABLE t (x INT)").await;
    assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("no database selected"));

    handle.abort();
}

#[tokio::test]
async fn test_error_response_shape() {
    let (addr, _dir, handle) = start_server().await;

    let (status, body) = post_sql(addr, "s", "COMPLETELY WRONG").await;
    assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("unsupported SQL"));

    handle.abort();
}

#[tokio::test]
async fn test_empty_result_set_is_http_200() {
    let (addr, _dir, handle) = start_server().await;

    post_sql(
        addr,
        "s",
        "CREATE DATABASE d; USE DATABASE d; CREATE TABLE t (x INT)",
    )
    .await;
    let (status, body) = post_sql(addr, "s", "SELECT * FROM t").await;

    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(body, serde_json::json!([[]]));

    handle.abort();
}
