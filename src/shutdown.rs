use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinError;

/// Resolves on SIGINT (Ctrl+C) or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to register SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("SIGINT received"),
        _ = terminate => tracing::info!("SIGTERM received"),
    }
}

/// Runs `server` until it stops on its own or `signal` resolves.
///
/// An early exit is returned as is. After the signal, `stop` is notified and
/// the server gets `grace` to drain before it is abandoned.
pub async fn supervise<S, F>(
    server: S,
    signal: F,
    stop: Arc<Notify>,
    grace: Duration,
) -> io::Result<()>
where
    S: Future<Output = io::Result<()>> + Send + 'static,
    F: Future<Output = ()>,
{
    let mut handle = tokio::spawn(server);

    tokio::select! {
        joined = &mut handle => {
            let result = flatten(joined);
            if let Err(e) = &result {
                tracing::error!("server stopped: {}", e);
            }
            return result;
        }
        _ = signal => {}
    }

    tracing::info!("Shutting down server");
    stop.notify_one();

    match tokio::time::timeout(grace, handle).await {
        Ok(joined) => flatten(joined),
        Err(_) => {
            tracing::warn!("in-flight requests still running after {:?}, forcing exit", grace);
            Ok(())
        }
    }
}

fn flatten(joined: Result<io::Result<()>, JoinError>) -> io::Result<()> {
    joined.map_err(io::Error::other)?
}
