// HTTP and WebSocket API

mod error;
pub mod tools;
pub mod websocket;
pub mod world;

pub use error::{status_for_code, ApiError};
pub use tools::create_tools_router;
pub use websocket::{create_ws_router, ws_handler};
pub use world::create_world_router;

use axum::Router;
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::commands::ToolDispatcher;
use crate::engine::WorldHandle;

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_enabled() -> bool {
    true
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            enabled: default_enabled(),
        }
    }
}

/// Shared state for every HTTP route
pub struct ApiState {
    pub handle: WorldHandle,
    pub dispatcher: ToolDispatcher,
}

impl ApiState {
    pub fn new(handle: WorldHandle) -> Self {
        Self {
            dispatcher: ToolDispatcher::new(handle.clone()),
            handle,
        }
    }
}

/// Full HTTP surface with permissive CORS for dashboards
pub fn create_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .merge(create_world_router(Arc::clone(&state)))
        .merge(create_tools_router(Arc::clone(&state)))
        .merge(create_ws_router(state))
        .layer(CorsLayer::permissive())
}
