//! Integration tests for the srpc CLI commands.
//!
//! These run the same code paths as the binary against a reference server
//! started on an ephemeral port.

use serde_json::json;
use srpc_cli::commands::call::{call, CallOptions};
use srpc_server::{start_server, ServerConfig};

async fn test_origin() -> String {
    let config = ServerConfig {
        port: 0,
        ..ServerConfig::default()
    };
    let addr = start_server(config)
        .await
        .expect("Failed to start test server");
    format!("http://{}", addr)
}

fn options(origin: &str, method: &str, path: &str, body: &str) -> CallOptions {
    CallOptions {
        origin: origin.to_string(),
        method: method.to_string(),
        path: path.to_string(),
        body: body.to_string(),
        cookies: Vec::new(),
        timeout_secs: Some(5),
    }
}

#[tokio::test]
async fn test_call_greet() {
    let origin = test_origin().await;
    let value = call(&options(&origin, "POST", "/greet", r#"{"name":"Ada"}"#))
        .await
        .unwrap();
    assert_eq!(value, json!({ "greeting": "Hello, Ada!" }));
}

#[tokio::test]
async fn test_call_get_endpoint() {
    let origin = test_origin().await;
    let value = call(&options(&origin, "get", "/echo", r#"{"text":"a+b c"}"#))
        .await
        .unwrap();
    assert_eq!(value["text"], "a+b c");

    let health = call(&options(&origin, "GET", "/health", "null"))
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
}

#[tokio::test]
async fn test_call_write_only_endpoint() {
    let origin = test_origin().await;
    let value = call(&CallOptions {
        cookies: vec!["session=abc".to_string()],
        ..options(&origin, "POST", "/notes", r#"{"text":"hi"}"#)
    })
    .await
    .unwrap();
    assert!(value.is_null());
}

#[tokio::test]
async fn test_call_reports_remote_error() {
    let origin = test_origin().await;
    let err = call(&options(&origin, "POST", "/greet", r#"{"name":""}"#))
        .await
        .unwrap_err();
    assert!(err.contains("400"), "got {err}");
    assert!(err.contains("Invalid request."), "got {err}");
}

#[tokio::test]
async fn test_call_rejects_bad_origin() {
    let err = call(&options("ftp://example.com", "POST", "/greet", "{}"))
        .await
        .unwrap_err();
    assert!(err.contains("scheme"), "got {err}");
}
