//! `srpc serve`: Start the srpc reference server.

pub async fn run(host: String, port: u16) -> Result<(), String> {
    let config = srpc_server::ServerConfig {
        host: host.clone(),
        port,
    };

    println!("Starting srpc server on {}:{}...", host, port);

    let addr = srpc_server::start_server(config).await?;
    println!("srpc server listening on http://{}", addr);

    // Keep the process running until interrupted
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("Failed to listen for Ctrl+C: {}", e))?;

    println!("\nShutting down...");
    Ok(())
}
