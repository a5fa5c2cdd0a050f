use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::{status_for_code, ApiState};
use crate::commands::{parse_args, ToolResponse, TOOL_NAMES};

/// Create tool invocation router
pub fn create_tools_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/tools", get(list_tools))
        .route("/api/tools/:name", post(call_tool))
        .with_state(state)
}

/// GET /api/tools - Names accepted by POST /api/tools/:name
async fn list_tools() -> Json<&'static [&'static str]> {
    Json(TOOL_NAMES)
}

/// POST /api/tools/:name - Invoke a tool with a JSON body.
///
/// The body is always a `ToolResponse`; the status mirrors its error code.
async fn call_tool(
    State(state): State<Arc<ApiState>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Response {
    let response = match parse_args(&body) {
        Ok(args) => state.dispatcher.call(&name, args).await,
        Err(e) => ToolResponse::failure(e.code(), e.to_string()),
    };

    let status = match (response.success, response.code.as_deref()) {
        (true, _) => StatusCode::OK,
        (false, Some(code)) => status_for_code(code),
        (false, None) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, Json(response)).into_response()
}
