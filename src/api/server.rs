//! Server lifecycle: bind, serve the router, shut down gracefully.
//!
//! `start_server` returns a handle with a shutdown channel so tests can drive
//! the real listener. `serve` is the process entry and stops on Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::api::router::build_router;
use crate::api::types::ApiContext;
use crate::config::ServiceConfig;
use crate::pipeline::model::AssertionModel;

/// Handle to a running server.
pub struct ServerHandle {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Signal shutdown and wait for in-flight requests to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = self.task.await {
            tracing::error!("Server task failed: {e}");
        }
    }
}

/// Bind `addr` and spawn the server in a background task.
pub async fn start_server(
    addr: &str,
    config: ServiceConfig,
    model: Arc<dyn AssertionModel>,
) -> Result<ServerHandle, String> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind {addr}: {e}"))?;

    let addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get server address: {e}"))?;

    let app = build_router(ApiContext::new(config, model));
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("Server received shutdown signal");
        };

        tracing::info!(%addr, "Server started");

        if let Err(e) = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal)
        .await
        {
            tracing::error!("Server error: {e}");
        }

        tracing::info!("Server stopped");
    });

    Ok(ServerHandle {
        addr,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}

/// Serve until Ctrl-C.
pub async fn serve(config: ServiceConfig, model: Arc<dyn AssertionModel>) -> Result<(), String> {
    let bind = config.bind_address();
    tracing::info!(
        environment = %config.environment,
        auth = config.auth_enabled(),
        rate_limiting = config.rate_limiting,
        mask_identifiers = config.mask_identifiers,
        "Starting assertion service"
    );

    let handle = start_server(&bind, config, model).await?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    handle.shutdown().await;
    Ok(())
}
