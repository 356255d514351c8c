//! Shared helpers for the srpc-core integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;

/// Serve `app` on an ephemeral local port and return its origin.
pub async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to get local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server failed");
    });
    format!("http://{}", addr)
}

/// Wait until `counter` reaches `expected`, for effects that happen after the
/// response has been handed to the client.
pub async fn wait_for(counter: &Arc<AtomicUsize>, expected: usize) -> bool {
    for _ in 0..100 {
        if counter.load(Ordering::SeqCst) == expected {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    counter.load(Ordering::SeqCst) == expected
}
