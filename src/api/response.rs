use axum::body::Bytes;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

/// Content type of every response, including successful SVG renders.
pub const RESPONSE_CONTENT_TYPE: &str = "text/html; charset=utf-8";

pub const INVALID_BODY: &str = "Invalid request body";
pub const ERROR_RETRIEVING_SOURCE: &str = "Error retrieving source";
pub const REQUEST_TIMED_OUT: &str = "Request timed out";

/// A markup body sent with the fixed `text/html` content type.
pub struct Markup {
    status: StatusCode,
    body: Bytes,
}

impl Markup {
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Markup {
            status: StatusCode::OK,
            body: body.into(),
        }
    }

    pub fn with_status(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Markup {
            status,
            body: body.into(),
        }
    }
}

impl IntoResponse for Markup {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, RESPONSE_CONTENT_TYPE)],
            self.body,
        )
            .into_response()
    }
}
