//! livemon_agent: streams live CPU, memory and disk metrics to WebSocket
//! observers. Each observer picks its own metrics and may arm threshold
//! alerts; one sample per tick serves everybody.

pub mod aggregator;
pub mod alerts;
pub mod config;
pub mod proto;
pub mod registry;
pub mod sampler;
pub mod session;
pub mod state;
pub mod tls;
pub mod types;
pub mod ws;

use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::state::AppState;

/// HTTP surface: health probe, banner, and the WebSocket endpoint (on `/ws`
/// and on `/` for clients that upgrade the root path).
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "ok": true }))
}

async fn index(ws: Option<WebSocketUpgrade>, State(state): State<AppState>) -> Response {
    match ws {
        Some(ws) => ws::upgrade(ws, state),
        None => "livemon_agent is running. WebSocket sessions are served on /ws.".into_response(),
    }
}
