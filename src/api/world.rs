use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiState};
use crate::commands::{AgentPosition, VisionReport, WhatDoISeeRequest};
use crate::world::{AgentState, AgentType, HazardState, Location, WorldError};

/// Query parameters for agent listing
#[derive(Deserialize)]
pub struct AgentQueryParams {
    /// Filter by agent type (e.g. ?type=firefighter)
    #[serde(rename = "type")]
    pub agent_type: Option<AgentType>,
    /// Only agents with an active movement
    pub moving: Option<bool>,
}

/// Query parameters for a vision query
#[derive(Deserialize)]
pub struct VisionQueryParams {
    pub range: Option<f64>,
}

/// Create read-only world router
pub fn create_world_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/world/agents", get(list_agents))
        .route("/api/world/agents/:id", get(get_agent))
        .route("/api/world/agents/:id/position", get(get_agent_position))
        .route("/api/world/agents/:id/vision", get(get_vision))
        .route("/api/world/hazards", get(list_hazards))
        .route("/api/world/hazards/:id", get(get_hazard))
        .route("/api/world/locations", get(list_locations))
        .with_state(state)
}

/// GET /api/world/agents - List agents, sorted by id
async fn list_agents(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<AgentQueryParams>,
) -> Json<Vec<AgentState>> {
    let mut agents: Vec<AgentState> = state
        .handle
        .agents()
        .into_iter()
        .filter(|a| params.agent_type.map_or(true, |t| a.agent_type == t))
        .filter(|a| params.moving.map_or(true, |m| a.moving == m))
        .collect();
    agents.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
    Json(agents)
}

async fn get_agent(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<AgentState>, ApiError> {
    state
        .handle
        .store()
        .get_agent(&id)
        .map(Json)
        .ok_or_else(|| WorldError::AgentNotFound(id).into())
}

async fn get_agent_position(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<AgentPosition>, ApiError> {
    Ok(Json(state.handle.get_agent_position(&id)?))
}

/// GET /api/world/agents/:id/vision?range=75
async fn get_vision(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    Query(params): Query<VisionQueryParams>,
) -> Result<Json<VisionReport>, ApiError> {
    let request = WhatDoISeeRequest {
        agent_id: id,
        vision_range: params.range,
    };
    Ok(Json(state.handle.what_do_i_see(&request)?))
}

async fn list_hazards(State(state): State<Arc<ApiState>>) -> Json<Vec<HazardState>> {
    let mut hazards = state.handle.hazards();
    hazards.sort_by(|a, b| a.hazard_id.cmp(&b.hazard_id));
    Json(hazards)
}

async fn get_hazard(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<HazardState>, ApiError> {
    state
        .handle
        .store()
        .get_hazard(&id)
        .map(Json)
        .ok_or_else(|| WorldError::HazardNotFound(id).into())
}

async fn list_locations(State(state): State<Arc<ApiState>>) -> Json<Vec<Location>> {
    Json(state.handle.locations().to_vec())
}
