use std::time::Duration;

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
};

use crate::api::response::{self, Markup};

/// Failures while retrieving the remote SVG source.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to source failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("invalid content type: {0:?}")]
    InvalidContentType(Option<String>),

    #[error("failed to read source body: {0}")]
    ReadFailure(#[source] reqwest::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Source fetch error: {0}")]
    SourceFetch(#[from] FetchError),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

// Clients only ever see the fixed messages; details stay in the logs.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::MalformedPayload(_) => {
                Markup::with_status(StatusCode::NOT_FOUND, response::INVALID_BODY).into_response()
            }
            AppError::SourceFetch(_) => {
                Markup::with_status(StatusCode::NOT_FOUND, response::ERROR_RETRIEVING_SOURCE)
                    .into_response()
            }
            AppError::Timeout(_) => {
                Markup::with_status(StatusCode::REQUEST_TIMEOUT, response::REQUEST_TIMED_OUT)
                    .into_response()
            }
            AppError::ConfigError(_) => {
                Markup::with_status(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
                    .into_response()
            }
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedPayload(err.to_string())
    }
}

impl From<std::env::VarError> for AppError {
    fn from(err: std::env::VarError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
