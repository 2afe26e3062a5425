use tracing_subscriber::EnvFilter;

/// Initialize structured logging to stderr, honouring `RUST_LOG`.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,svg_render=debug,tower_http=info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}
