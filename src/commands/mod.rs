// Command surface: validated, synchronous operations over the world store

mod tools;
mod vision;

pub use tools::{parse_args, ToolDispatcher, ToolResponse, TOOL_NAMES};
pub use vision::{what_do_i_see, VisibleAgent, VisibleHazard, VisibleLocation, VisionReport};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::HazardConfig;
use crate::event::{
    AgentRemoved, AgentSpawned, AgentStatusUpdated, EventBus, HazardSpawned, PositionUpdate,
    WorldEvent,
};
use crate::geo::Position;
use crate::hazard::{self, SuppressOutcome};
use crate::movement::{PlannedMove, Urgency};
use crate::routing::TravelProfile;
use crate::world::{
    AgentState, AgentStatus, AgentType, FireIntensity, HazardState, HazardType, WorldError,
    WorldStore,
};


#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatDoISeeRequest {
    pub agent_id: String,
    #[serde(default)]
    pub vision_range: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveMeRequest {
    pub agent_id: String,
    pub destination: Position,
    #[serde(default)]
    pub profile: TravelProfile,
    #[serde(default)]
    pub urgency: Urgency,
    /// Explicit speed in m/s; overrides urgency
    #[serde(default)]
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnAgentRequest {
    pub agent_id: String,
    #[serde(rename = "type")]
    pub agent_type: AgentType,
    pub position: Position,
    #[serde(default)]
    pub status: AgentStatus,
    /// Milliseconds until forced removal
    #[serde(default)]
    pub lifetime: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentIdRequest {
    pub agent_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub agent_id: String,
    pub status: AgentStatus,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuppressFireRequest {
    pub agent_id: String,
    pub hazard_id: String,
    #[serde(default = "default_suppression_rate")]
    pub rate: f64,
}

fn default_suppression_rate() -> f64 {
    0.1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnHazardRequest {
    pub hazard_id: String,
    #[serde(rename = "type", default = "default_hazard_type")]
    pub hazard_type: HazardType,
    pub position: Position,
    #[serde(default = "default_intensity")]
    pub intensity: f64,
    #[serde(default = "default_radius")]
    pub radius: f64,
    #[serde(default = "default_spread_rate")]
    pub spread_rate: f64,
    #[serde(default)]
    pub fire_intensity: Option<FireIntensity>,
}

fn default_hazard_type() -> HazardType {
    HazardType::Fire
}

fn default_intensity() -> f64 {
    0.5
}

fn default_radius() -> f64 {
    10.0
}

fn default_spread_rate() -> f64 {
    0.1
}

/// Result of a successful move request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveResult {
    pub agent_id: String,
    pub estimated_arrival: DateTime<Utc>,
    /// Seconds
    pub estimated_duration: f64,
    /// Meters along the path
    pub distance: f64,
    pub waypoints: usize,
    /// "provider" or "fallback"
    pub route_source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_error: Option<String>,
}

impl MoveResult {
    pub fn from_plan(plan: &PlannedMove) -> Self {
        let arrival_ms = plan.estimated_arrival();
        Self {
            agent_id: plan.movement.agent_id.clone(),
            estimated_arrival: Utc
                .timestamp_millis_opt(arrival_ms)
                .single()
                .unwrap_or_else(Utc::now),
            estimated_duration: plan.duration_secs(),
            distance: plan.movement.total_distance,
            waypoints: plan.movement.waypoints.len(),
            route_source: if plan.route_success { "provider" } else { "fallback" },
            route_error: plan.route_error.clone(),
        }
    }
}

/// Current position report for one agent
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPosition {
    pub agent_id: String,
    pub position: Position,
    pub moving: bool,
    pub status: AgentStatus,
    pub speed: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<Position>,
}

pub(crate) fn validate_id(kind: &str, id: &str) -> Result<(), WorldError> {
    if id.trim().is_empty() {
        return Err(WorldError::Validation(format!("{} id is required", kind)));
    }
    Ok(())
}

pub(crate) fn validate_position(field: &str, position: &Position) -> Result<(), WorldError> {
    if !position.is_valid() {
        return Err(WorldError::Validation(format!(
            "{} ({}, {}) is not a valid coordinate",
            field, position.lat, position.lon
        )));
    }
    Ok(())
}

/// Create an agent; emits a spawn event and an immediate position update
pub fn spawn_agent(
    store: &WorldStore,
    bus: &EventBus,
    req: SpawnAgentRequest,
    now: i64,
) -> Result<AgentState, WorldError> {
    validate_id("agent", &req.agent_id)?;
    validate_position("position", &req.position)?;
    if let Some(lifetime) = req.lifetime {
        if lifetime <= 0 {
            return Err(WorldError::Validation(format!(
                "lifetime must be positive, got {}",
                lifetime
            )));
        }
    }

    let agent = AgentState::new(
        req.agent_id,
        req.agent_type,
        req.position,
        req.status,
        req.lifetime,
        now,
    );
    store.insert_agent(agent.clone())?;

    info!(agent_id = %agent.agent_id, agent_type = ?agent.agent_type, "Agent spawned");

    bus.emit(WorldEvent::AgentSpawned(AgentSpawned {
        agent_id: agent.agent_id.clone(),
        agent_type: agent.agent_type,
        position: agent.position,
        status: agent.status,
        lifetime: agent.lifetime_ms,
        timestamp: now,
    }));
    bus.emit(WorldEvent::PositionUpdated(PositionUpdate {
        agent_id: agent.agent_id.clone(),
        position: agent.position,
        moving: false,
        bearing: None,
        velocity: None,
        timestamp: now,
    }));

    Ok(agent)
}

/// Remove an agent and any in-flight movement
pub fn despawn_agent(
    store: &WorldStore,
    bus: &EventBus,
    agent_id: &str,
    now: i64,
) -> Result<AgentState, WorldError> {
    let removed = store
        .remove_agent(agent_id)
        .ok_or_else(|| WorldError::AgentNotFound(agent_id.to_string()))?;

    info!(agent_id = %agent_id, "Agent despawned");
    bus.emit(WorldEvent::AgentDespawned(AgentRemoved {
        agent_id: agent_id.to_string(),
        timestamp: now,
    }));

    Ok(removed)
}

pub fn get_agent_position(store: &WorldStore, agent_id: &str) -> Result<AgentPosition, WorldError> {
    let agent = store
        .get_agent(agent_id)
        .ok_or_else(|| WorldError::AgentNotFound(agent_id.to_string()))?;

    Ok(AgentPosition {
        agent_id: agent.agent_id,
        position: agent.position,
        moving: agent.moving,
        status: agent.status,
        speed: agent.speed,
        destination: agent.destination,
    })
}

pub fn update_agent_status(
    store: &WorldStore,
    bus: &EventBus,
    req: UpdateStatusRequest,
    now: i64,
) -> Result<AgentState, WorldError> {
    let mut previous = None;
    let mut updated = None;
    store.update_agent(&req.agent_id, |agent| {
        previous = Some(agent.status);
        agent.status = req.status;
        agent.last_updated = now;
        updated = Some(agent.clone());
    });

    let (Some(previous_status), Some(agent)) = (previous, updated) else {
        return Err(WorldError::AgentNotFound(req.agent_id));
    };

    bus.emit(WorldEvent::AgentStatusUpdated(AgentStatusUpdated {
        agent_id: agent.agent_id.clone(),
        previous_status,
        status: agent.status,
        timestamp: now,
    }));

    Ok(agent)
}

/// Create a hazard; fires emit the fire-specific spawn event
pub fn spawn_hazard(
    store: &WorldStore,
    bus: &EventBus,
    cfg: &HazardConfig,
    req: SpawnHazardRequest,
    now: i64,
) -> Result<HazardState, WorldError> {
    validate_id("hazard", &req.hazard_id)?;
    validate_position("position", &req.position)?;
    if !(req.intensity > 0.0 && req.intensity <= 1.0) {
        return Err(WorldError::Validation(format!(
            "intensity must be in (0, 1], got {}",
            req.intensity
        )));
    }
    if !(req.radius.is_finite() && req.radius > 0.0) {
        return Err(WorldError::Validation(format!(
            "radius must be positive, got {}",
            req.radius
        )));
    }
    if !(req.spread_rate.is_finite() && req.spread_rate >= 0.0) {
        return Err(WorldError::Validation(format!(
            "spread rate must be non-negative, got {}",
            req.spread_rate
        )));
    }

    let fire_intensity = match req.hazard_type {
        HazardType::Fire => req
            .fire_intensity
            .or_else(|| Some(FireIntensity::from_intensity(req.intensity))),
        _ => req.fire_intensity,
    };

    let hazard = HazardState {
        hazard_id: req.hazard_id,
        hazard_type: req.hazard_type,
        position: req.position,
        intensity: req.intensity,
        radius: req.radius.min(cfg.radius_cap_m),
        fire_intensity,
        spread_rate: req.spread_rate,
        suppression_effort: 0.0,
        created_at: now,
        last_updated: now,
    };
    store.insert_hazard(hazard.clone())?;

    info!(
        hazard_id = %hazard.hazard_id,
        hazard_type = hazard.hazard_type.as_str(),
        intensity = hazard.intensity,
        "Hazard spawned"
    );

    let spawned = HazardSpawned::from_state(&hazard);
    bus.emit(if hazard.is_fire() {
        WorldEvent::FireSpawned(spawned)
    } else {
        WorldEvent::HazardSpawned(spawned)
    });

    Ok(hazard)
}

pub fn suppress_fire(
    store: &WorldStore,
    bus: &EventBus,
    cfg: &HazardConfig,
    req: SuppressFireRequest,
    now: i64,
) -> Result<SuppressOutcome, WorldError> {
    hazard::suppress(store, bus, cfg, &req.agent_id, &req.hazard_id, req.rate, now)
}
