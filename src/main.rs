//! graceful-server
//!
//! Binds `:8080` (or `--bind`), answers every request with an empty
//! `200 OK`, and shuts down gracefully on SIGINT/SIGTERM.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use graceful_server::config::{load_config, ServerConfig};
use graceful_server::observability::logging;
use graceful_server::{HttpServer, HttpServerOptions, Server};

#[derive(Parser)]
#[command(name = "graceful-server")]
#[command(about = "HTTP server with signal-driven graceful shutdown", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address, overriding the configuration (e.g. ":8080").
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability);
    tracing::info!("graceful-server v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        drain_timeout_ms = config.shutdown.drain_timeout_ms,
        "Configuration loaded"
    );

    let address = config.listener.bind_address.clone();
    let server = Arc::new(HttpServer::new(HttpServerOptions::new(config)));

    let mut serving = tokio::spawn({
        let server = Arc::clone(&server);
        async move { server.start(&address).await }
    });

    // Race the two: a start failure must not leave us parked on the signal wait.
    let stop = server.stop();
    tokio::pin!(stop);
    tokio::select! {
        joined = &mut serving => {
            return match joined? {
                Err(e) if !e.is_closed() => {
                    tracing::error!(error = %e, "Server failed");
                    Err(e.into())
                }
                _ => Ok(()),
            };
        }
        stopped = &mut stop => stopped?,
    }

    match serving.await? {
        Err(e) if !e.is_closed() => return Err(e.into()),
        _ => {}
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
