//! # Engine Host
//!
//! Runs the engine in its own process and serves every endpoint over a Unix socket.
//!
//! The socket path is the first command-line argument, else `ENGINEHOST_SOCKET`, else
//! `enginehost.sock` in the system temp directory. Log verbosity follows `RUST_LOG`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use tokio::net::UnixListener;
use tracing_subscriber::EnvFilter;

use wirerun::Server;
use wirerun::ServerConfig;
use wirerun::TransportConfig;

const SOCKET_ENV: &str = "ENGINEHOST_SOCKET";

fn socket_path() -> PathBuf {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os(SOCKET_ENV).map(PathBuf::from))
        .unwrap_or_else(|| std::env::temp_dir().join("enginehost.sock"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path = socket_path();
    // A socket file left by a previous run would make bind fail.
    if path.exists() {
        std::fs::remove_file(&path).with_context(|| format!("removing stale socket {}", path.display()))?;
    }

    let listener = UnixListener::bind(&path).with_context(|| format!("binding {}", path.display()))?;
    let server = Arc::new(Server::new(ServerConfig::default()).context("registering endpoints")?);
    tracing::info!(
        socket = %path.display(),
        endpoints = server.dispatcher().registry().len(),
        pid = std::process::id(),
        "engine host listening"
    );

    let outcome = tokio::select! {
        result = server.clone().listen(listener, TransportConfig::default()) => {
            result.context("accept loop failed")
        }
        signal = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            signal.context("waiting for ctrl-c")
        }
    };

    let _ = std::fs::remove_file(&path);
    outcome
}
