use reqwest::{header::CONTENT_TYPE, Client, ClientBuilder};
use std::time::Duration;

use crate::error::{AppError, FetchError, Result};
use crate::render::strip_apostrophes;

pub const ACCEPTED_CONTENT_TYPE: &str = "image/svg+xml";

/// Builds the client shared by every request. Without `timeout` the fetch is
/// bounded only by the inbound request deadline.
pub fn build_client(timeout: Option<Duration>) -> Result<Client> {
    let mut builder = ClientBuilder::new();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {}", e)))
}

/// Fetches an SVG document, rejecting anything not served as exactly
/// `image/svg+xml`. The body is returned byte for byte, except that
/// apostrophes are stripped when `remove_hyphens` is set.
pub async fn fetch_svg(
    client: &Client,
    url: &str,
    remove_hyphens: bool,
) -> std::result::Result<Vec<u8>, FetchError> {
    let response = client.get(url).send().await.map_err(FetchError::Request)?;

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());
    if content_type.as_deref() != Some(ACCEPTED_CONTENT_TYPE) {
        return Err(FetchError::InvalidContentType(content_type));
    }

    let body = response.bytes().await.map_err(FetchError::ReadFailure)?;

    if remove_hyphens {
        Ok(strip_apostrophes(&body))
    } else {
        Ok(body.to_vec())
    }
}
