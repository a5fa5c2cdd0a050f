use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{
    AgentIdRequest, MoveMeRequest, SpawnAgentRequest, SpawnHazardRequest, SuppressFireRequest,
    UpdateStatusRequest, WhatDoISeeRequest,
};
use crate::engine::WorldHandle;
use crate::world::WorldError;

/// Operation names accepted by `ToolDispatcher::call`
pub const TOOL_NAMES: &[&str] = &[
    "whatDoISee",
    "moveMe",
    "spawnAgent",
    "despawnAgent",
    "suppressFire",
    "spawnHazard",
    "getAgentPosition",
    "updateAgentStatus",
];

/// Structured result returned to every remote caller
#[derive(Debug, Clone, Serialize)]
pub struct ToolResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ToolResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    pub fn failure(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            code: Some(code.into()),
        }
    }

    fn from_result<T: Serialize>(result: Result<T, WorldError>) -> Self {
        match result {
            Ok(value) => match serde_json::to_value(value) {
                Ok(data) => Self::ok(data),
                Err(e) => Self::failure("internal_inconsistency", e.to_string()),
            },
            Err(e) => Self::failure(e.code(), e.to_string()),
        }
    }
}

/// Maps named operations onto the world handle.
///
/// Shared by the message-bus tool server and the HTTP tool route.
#[derive(Clone)]
pub struct ToolDispatcher {
    handle: WorldHandle,
}

/// Parse a raw request body; an empty body means no arguments
pub fn parse_args(payload: &[u8]) -> Result<Value, WorldError> {
    if payload.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(payload)
        .map_err(|e| WorldError::Validation(format!("invalid JSON payload: {}", e)))
}

fn parse<T: DeserializeOwned>(args: Value) -> Result<T, WorldError> {
    // Missing body means "no arguments"
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| WorldError::Validation(e.to_string()))
}

impl ToolDispatcher {
    pub fn new(handle: WorldHandle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &WorldHandle {
        &self.handle
    }

    pub async fn call(&self, tool: &str, args: Value) -> ToolResponse {
        debug!(tool, "Tool call");

        let response = match tool {
            "whatDoISee" => ToolResponse::from_result(
                parse::<WhatDoISeeRequest>(args).and_then(|req| self.handle.what_do_i_see(&req)),
            ),
            "getAgentPosition" => ToolResponse::from_result(
                parse::<AgentIdRequest>(args)
                    .and_then(|req| self.handle.get_agent_position(&req.agent_id)),
            ),
            "moveMe" => match parse::<MoveMeRequest>(args) {
                Ok(req) => ToolResponse::from_result(self.handle.move_me(req).await),
                Err(e) => ToolResponse::from_result::<()>(Err(e)),
            },
            "spawnAgent" => match parse::<SpawnAgentRequest>(args) {
                Ok(req) => ToolResponse::from_result(self.handle.spawn_agent(req).await),
                Err(e) => ToolResponse::from_result::<()>(Err(e)),
            },
            "despawnAgent" => match parse::<AgentIdRequest>(args) {
                Ok(req) => ToolResponse::from_result(self.handle.despawn_agent(req.agent_id).await),
                Err(e) => ToolResponse::from_result::<()>(Err(e)),
            },
            "suppressFire" => match parse::<SuppressFireRequest>(args) {
                Ok(req) => ToolResponse::from_result(self.handle.suppress_fire(req).await),
                Err(e) => ToolResponse::from_result::<()>(Err(e)),
            },
            "spawnHazard" => match parse::<SpawnHazardRequest>(args) {
                Ok(req) => ToolResponse::from_result(self.handle.spawn_hazard(req).await),
                Err(e) => ToolResponse::from_result::<()>(Err(e)),
            },
            "updateAgentStatus" => match parse::<UpdateStatusRequest>(args) {
                Ok(req) => ToolResponse::from_result(self.handle.update_agent_status(req).await),
                Err(e) => ToolResponse::from_result::<()>(Err(e)),
            },
            other => ToolResponse::failure("unknown_tool", format!("Unknown tool '{}'", other)),
        };

        if let (false, Some(error)) = (response.success, &response.error) {
            warn!(tool, code = ?response.code, error = %error, "Tool call failed");
        }

        response
    }
}
