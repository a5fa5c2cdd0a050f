use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

use crate::world::WorldError;

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

/// HTTP status for a stable error code
pub fn status_for_code(code: &str) -> StatusCode {
    match code {
        "agent_not_found" | "hazard_not_found" | "unknown_tool" => StatusCode::NOT_FOUND,
        "already_exists" => StatusCode::CONFLICT,
        "out_of_range" => StatusCode::UNPROCESSABLE_ENTITY,
        "validation_error" => StatusCode::BAD_REQUEST,
        "upstream_unavailable" => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// World errors surfaced by the read-only routes
pub struct ApiError(pub WorldError);

impl From<WorldError> for ApiError {
    fn from(e: WorldError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.code();
        let body = Json(ErrorResponse {
            error: self.0.to_string(),
            code,
        });
        (status_for_code(code), body).into_response()
    }
}
