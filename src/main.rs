use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use svg_render::{
    config::Config,
    api::routes::create_router,
    logging::init_logging,
    shutdown::{shutdown_signal, supervise},
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let config = Config::load()?;
    let server_addr = config.server_addr;
    let grace = config.shutdown_grace;

    let app = create_router(AppState::new(config)?);
    let listener = TcpListener::bind(server_addr).await?;
    tracing::info!("Starting HTTP server on {}", server_addr);

    let stop = Arc::new(Notify::new());
    let stop_rx = stop.clone();
    let server = async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { stop_rx.notified().await })
            .await
    };

    supervise(server, shutdown_signal(), stop, grace).await?;

    tracing::info!("Server exiting");
    Ok(())
}
