//! srpc Server - reference host for srpc endpoints
//!
//! Serves the endpoints declared in [`service`] on an axum router:
//! - `GET /health` - liveness and version
//! - `POST /greet` - validated request, typed response
//! - `GET /echo` - request carried in the query string
//! - `POST /notes` - write-only, rejects oversized notes with 413
//!
//! The same declarations are used by clients (see `srpc-cli`), so both
//! sides always agree on paths, methods and codecs.

pub mod service;

use std::net::SocketAddr;

use axum::Router;
use tower_http::trace::TraceLayer;

/// Configuration for the srpc reference server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3210,
        }
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the default filter. Calling this more than once is
/// harmless; only the first subscriber is kept.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "srpc_core=info,srpc_server=info,tower_http=info".into()),
        )
        .try_init();
}

/// The full application router: every service endpoint plus request tracing.
pub fn app() -> Router {
    service::router().layer(TraceLayer::new_for_http())
}

/// Start the reference server in a background task.
///
/// Returns the actual address the server is listening on, so a port of `0`
/// picks a free one.
pub async fn start_server(config: ServerConfig) -> Result<SocketAddr, String> {
    tracing::info!(
        "Starting srpc server on {}:{}",
        config.host,
        config.port
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| format!("Invalid address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    let local_addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get local address: {}", e))?;

    tracing::info!("srpc server listening on {}", local_addr);

    let app = app();
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok(local_addr)
}
