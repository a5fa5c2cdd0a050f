use crate::subscription::ConnectionManager;
use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::ApiState;

/// Query parameters for WebSocket upgrade
#[derive(Deserialize)]
pub struct WsQuery {
    /// Comma-separated subject prefixes; absent means every event
    subjects: Option<String>,
}

/// Subject filters from `?subjects=a,b`
pub fn parse_subjects(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// GET /api/ws - WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ApiState>>,
    Query(params): Query<WsQuery>,
) -> Response {
    let subjects = parse_subjects(params.subjects.as_deref());
    info!(subjects = ?subjects, "WebSocket upgrade request received");
    ws.on_upgrade(move |socket| handle_socket(socket, state, subjects))
}

/// Create WebSocket router
pub fn create_ws_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/ws", get(ws_handler))
        .with_state(state)
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<ApiState>, subjects: Vec<String>) {
    let events = state.handle.subscribe();
    ConnectionManager::new(subjects).handle(socket, events).await;
}
