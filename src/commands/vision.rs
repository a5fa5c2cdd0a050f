use serde::Serialize;

use super::WhatDoISeeRequest;
use crate::config::VisionConfig;
use crate::geo::{self, Position};
use crate::world::{
    AgentStatus, AgentType, FireIntensity, HazardType, LocationKind, WorldError, WorldStore,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleAgent {
    pub agent_id: String,
    #[serde(rename = "type")]
    pub agent_type: AgentType,
    pub position: Position,
    pub status: AgentStatus,
    pub moving: bool,
    pub distance: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleHazard {
    pub hazard_id: String,
    #[serde(rename = "type")]
    pub hazard_type: HazardType,
    pub position: Position,
    pub intensity: f64,
    pub radius: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fire_intensity: Option<FireIntensity>,
    pub distance: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleLocation {
    pub id: String,
    pub name: String,
    pub kind: LocationKind,
    pub position: Position,
    pub distance: f64,
}

/// Everything one agent can observe, nearest first
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionReport {
    pub agent_id: String,
    pub position: Position,
    pub vision_range: f64,
    pub agents: Vec<VisibleAgent>,
    pub hazards: Vec<VisibleHazard>,
    pub locations: Vec<VisibleLocation>,
}

/// Read-only visibility query against per-record snapshots
pub fn what_do_i_see(
    store: &WorldStore,
    cfg: &VisionConfig,
    req: &WhatDoISeeRequest,
) -> Result<VisionReport, WorldError> {
    let range = req.vision_range.unwrap_or(cfg.default_range_m);
    if !(range.is_finite() && range > 0.0) {
        return Err(WorldError::Validation(format!(
            "vision range must be positive, got {}",
            range
        )));
    }

    let viewer = store
        .get_agent(&req.agent_id)
        .ok_or_else(|| WorldError::AgentNotFound(req.agent_id.clone()))?;
    let origin = viewer.position;

    let mut agents: Vec<VisibleAgent> = store
        .agents()
        .into_iter()
        .filter(|a| a.agent_id != viewer.agent_id)
        .filter_map(|a| {
            let distance = geo::distance(origin, a.position);
            (distance <= range).then(|| VisibleAgent {
                agent_id: a.agent_id,
                agent_type: a.agent_type,
                position: a.position,
                status: a.status,
                moving: a.moving,
                distance,
            })
        })
        .collect();

    // A viewer inside a hazard footprint sees it regardless of range
    let mut hazards: Vec<VisibleHazard> = store
        .hazards()
        .into_iter()
        .filter_map(|h| {
            let distance = geo::distance(origin, h.position);
            (distance <= range.max(h.radius)).then(|| VisibleHazard {
                hazard_id: h.hazard_id,
                hazard_type: h.hazard_type,
                position: h.position,
                intensity: h.intensity,
                radius: h.radius,
                fire_intensity: h.fire_intensity,
                distance,
            })
        })
        .collect();

    let location_range = range * cfg.location_range_factor;
    let mut locations: Vec<VisibleLocation> = store
        .locations()
        .iter()
        .filter(|l| matches!(l.kind, LocationKind::Exit | LocationKind::StagingArea))
        .filter_map(|l| {
            let distance = geo::distance(origin, l.position);
            (distance <= location_range).then(|| VisibleLocation {
                id: l.id.clone(),
                name: l.name.clone(),
                kind: l.kind,
                position: l.position,
                distance,
            })
        })
        .collect();

    agents.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hazards.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    locations.sort_by(|a, b| a.distance.total_cmp(&b.distance));

    Ok(VisionReport {
        agent_id: viewer.agent_id,
        position: origin,
        vision_range: range,
        agents,
        hazards,
        locations,
    })
}
