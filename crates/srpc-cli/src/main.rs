//! srpc CLI: run the reference server or call any JSON srpc endpoint.

use clap::{Parser, Subcommand};
use srpc_cli::commands;

/// srpc CLI: typed remote procedures over HTTP
#[derive(Parser)]
#[command(name = "srpc", version, about = "srpc CLI: typed remote procedures over HTTP")]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the srpc reference server
    Serve {
        /// Host to bind to
        #[arg(long, env = "SRPC_HOST", default_value = "127.0.0.1")]
        host: String,
        /// Port to listen on
        #[arg(long, env = "SRPC_PORT", default_value_t = 3210)]
        port: u16,
    },

    /// Call a JSON endpoint and print its response
    Call {
        /// Server origin, e.g. http://127.0.0.1:3210
        #[arg(long, env = "SRPC_ORIGIN", default_value = "http://127.0.0.1:3210")]
        origin: String,
        /// HTTP method of the endpoint
        #[arg(long, default_value = "POST")]
        method: String,
        /// Path of the endpoint (e.g. "/greet")
        #[arg(long)]
        path: String,
        /// Request as a JSON string
        #[arg(long, default_value = "{}")]
        body: String,
        /// Cookie to send, as name=value (repeatable)
        #[arg(long = "cookie")]
        cookies: Vec<String>,
        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    srpc_server::init_tracing();

    let result = if let Some(command) = cli.command {
        match command {
            Commands::Serve { host, port } => commands::serve::run(host, port).await,

            Commands::Call {
                origin,
                method,
                path,
                body,
                cookies,
                timeout,
            } => {
                commands::call::run(commands::call::CallOptions {
                    origin,
                    method,
                    path,
                    body,
                    cookies,
                    timeout_secs: timeout,
                })
                .await
            }
        }
    } else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help().ok();
        println!();
        Ok(())
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
