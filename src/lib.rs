pub mod api;
pub mod config;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod render;
pub mod shutdown;

use std::sync::Arc;
use config::Config;
use error::Result;

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub client: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let client = fetch::build_client(config.fetch_timeout)?;
        Ok(AppState {
            config: Arc::new(config),
            client,
        })
    }
}
