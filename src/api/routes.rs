use axum::{
    body::to_bytes,
    extract::{Request, State},
    routing::post,
    Router,
};
use tower_http::trace::TraceLayer;

use crate::api::models::RenderRequest;
use crate::api::response::Markup;
use crate::error::{AppError, Result};
use crate::fetch::fetch_svg;
use crate::render::apply_replacements;
use crate::AppState;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/render", post(render_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn render_handler(State(state): State<AppState>, request: Request) -> Result<Markup> {
    // Bounds everything, reading the body included.
    let deadline = state.config.request_timeout;
    tokio::time::timeout(deadline, process_render_request(&state, request))
        .await
        .map_err(|_| {
            tracing::warn!("request timed out after {:?}", deadline);
            AppError::Timeout(deadline)
        })?
}

async fn process_render_request(state: &AppState, request: Request) -> Result<Markup> {
    let body = to_bytes(request.into_body(), state.config.max_body_bytes)
        .await
        .map_err(|e| {
            tracing::warn!("failed to read request body: {}", e);
            AppError::MalformedPayload(e.to_string())
        })?;

    let req = RenderRequest::from_slice(&body)
        .inspect_err(|e| tracing::warn!("rejecting request: {}", e))?;

    tracing::debug!(source = %req.source, remove_hyphens = req.remove_hyphens, "rendering");
    let svg = fetch_svg(&state.client, &req.source, req.remove_hyphens)
        .await
        .inspect_err(|e| tracing::warn!(source = %req.source, "error retrieving source: {}", e))?;

    Ok(Markup::ok(apply_replacements(&svg, &req.replace)))
}
