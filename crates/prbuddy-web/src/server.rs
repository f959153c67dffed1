//! Binds the HTTP surface, writes the port discovery file, runs a
//! periodic Conversation Store sweep, and shuts down gracefully on
//! SIGINT/SIGTERM: in-flight handlers get up to `shutdown_grace` to
//! finish before the listener is torn down regardless.

use std::path::PathBuf;
use std::time::Duration;

use prbuddy_daemon::port_file;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::routes::router;
use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read local address: {0}")]
    LocalAddr(#[source] std::io::Error),
    #[error(transparent)]
    Daemon(#[from] prbuddy_daemon::DaemonError),
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

pub struct ServerOptions {
    pub bind_addr: String,
    pub port_file_path: Option<PathBuf>,
    pub shutdown_grace: Duration,
    pub cleanup_interval: Duration,
    pub cleanup_max_age: chrono::Duration,
}

/// Runs the server until a shutdown signal arrives, then waits up to
/// `shutdown_grace` for in-flight handlers before returning. The port
/// file (if configured) is written once bound and removed on the way
/// out, matching the "written atomically on startup, removed on clean
/// shutdown" contract.
pub async fn run_web_server(state: AppState, options: ServerOptions) -> Result<(), ServerError> {
    let listener = TcpListener::bind(&options.bind_addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: options.bind_addr.clone(),
            source,
        })?;
    let local_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;

    if let Some(path) = &options.port_file_path {
        port_file::write_port_file(path, local_addr.port())?;
    }

    let conversations = state.orchestrator.conversations().clone();
    let cleanup_interval = options.cleanup_interval;
    let cleanup_max_age = options.cleanup_max_age;
    let cleanup_handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cleanup_interval);
        loop {
            ticker.tick().await;
            conversations.cleanup(cleanup_max_age).await;
        }
    });

    tracing::info!(addr = %local_addr, "prbuddy listening");

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let serve_task = tokio::spawn(async move {
        axum::serve(listener, router(state))
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    wait_for_signal().await;
    tracing::info!("shutdown signal received, draining in-flight requests");
    let _ = shutdown_tx.send(());

    let grace = options.shutdown_grace;
    let outcome = match tokio::time::timeout(grace, serve_task).await {
        Ok(join_result) => join_result.map_err(|err| {
            ServerError::Serve(std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))
        })?,
        Err(_) => {
            tracing::warn!(grace_secs = grace.as_secs(), "grace period elapsed with requests still in flight");
            Ok(())
        }
    };

    cleanup_handle.abort();
    if let Some(path) = &options.port_file_path {
        if let Err(err) = port_file::remove_port_file(path) {
            tracing::warn!(error = %err, "failed to remove port file on shutdown");
        }
    }

    outcome.map_err(ServerError::Serve)
}

async fn wait_for_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
