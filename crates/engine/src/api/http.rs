//! HTTP routes.

use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::websocket::ws_handler;
use crate::app::App;

/// Build the router: health check plus the WebSocket endpoint.
pub fn router(app: Arc<App>) -> Router {
    let cors = cors_layer(&app.config.allowed_hosts);
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .with_state(app)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn health() -> &'static str {
    "ok"
}

fn cors_layer(allowed_hosts: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods([Method::GET, Method::OPTIONS]);

    let origins: Vec<HeaderValue> = allowed_hosts
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| match HeaderValue::from_str(s) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %s, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}
