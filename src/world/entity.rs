use crate::geo::Position;
use serde::{Deserialize, Serialize};

/// Kind of simulated actor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    Civilian,
    Firefighter,
    Ems,
    Police,
    Commander,
    HumanCivilian,
}

/// Operational status, set by callers (never by the movement engine)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    #[default]
    Available,
    EnRoute,
    OnScene,
    Transporting,
    Staging,
    OutOfService,
}

/// Agent record owned by the world store
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentState {
    pub agent_id: String,

    #[serde(rename = "type")]
    pub agent_type: AgentType,

    pub position: Position,

    pub status: AgentStatus,

    /// True while an active movement exists for this agent
    pub moving: bool,

    /// Meters per second, last computed from a route
    pub speed: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<Position>,

    /// Unix epoch milliseconds
    pub spawned_at: i64,

    /// Milliseconds after `spawned_at` at which the agent is force-removed
    #[serde(rename = "lifetime", skip_serializing_if = "Option::is_none")]
    pub lifetime_ms: Option<i64>,

    pub last_updated: i64,
}

impl AgentState {
    pub fn new(
        agent_id: String,
        agent_type: AgentType,
        position: Position,
        status: AgentStatus,
        lifetime_ms: Option<i64>,
        now: i64,
    ) -> Self {
        Self {
            agent_id,
            agent_type,
            position,
            status,
            moving: false,
            speed: 0.0,
            destination: None,
            spawned_at: now,
            lifetime_ms,
            last_updated: now,
        }
    }

    /// True once `now - spawned_at >= lifetime`
    pub fn is_expired(&self, now: i64) -> bool {
        match self.lifetime_ms {
            Some(lifetime) => now - self.spawned_at >= lifetime,
            None => false,
        }
    }
}

/// Environmental hazard kinds (only fire evolves over time)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardType {
    Fire,
    Smoke,
    Flood,
    Chemical,
}

impl HazardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HazardType::Fire => "fire",
            HazardType::Smoke => "smoke",
            HazardType::Flood => "flood",
            HazardType::Chemical => "chemical",
        }
    }
}

/// Qualitative fire stage (informational only)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FireIntensity {
    Low,
    Moderate,
    High,
    Extreme,
}

impl FireIntensity {
    pub fn from_intensity(intensity: f64) -> Self {
        if intensity < 0.25 {
            FireIntensity::Low
        } else if intensity < 0.5 {
            FireIntensity::Moderate
        } else if intensity < 0.75 {
            FireIntensity::High
        } else {
            FireIntensity::Extreme
        }
    }
}

/// Hazard record owned by the world store
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardState {
    pub hazard_id: String,

    #[serde(rename = "type")]
    pub hazard_type: HazardType,

    pub position: Position,

    /// 0.0 ..= 1.0
    pub intensity: f64,

    /// Footprint radius in meters
    pub radius: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fire_intensity: Option<FireIntensity>,

    /// Radius growth in m/s while unsuppressed
    pub spread_rate: f64,

    /// Accumulated suppression, never decreases
    pub suppression_effort: f64,

    pub created_at: i64,

    pub last_updated: i64,
}

impl HazardState {
    pub fn is_fire(&self) -> bool {
        self.hazard_type == HazardType::Fire
    }
}

/// Static point of interest
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    Exit,
    Hospital,
    FireStation,
    PoliceStation,
    StagingArea,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub kind: LocationKind,
    pub position: Position,
}

/// In-flight movement of one agent along a route
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveMovement {
    pub agent_id: String,

    /// Unix epoch milliseconds
    pub start_time: i64,

    /// Total travel time in milliseconds
    pub duration: f64,

    /// Ordered path, at least two positions
    pub waypoints: Vec<Position>,

    /// Index of the segment last interpolated (advisory)
    pub current_segment: usize,

    /// Path length in meters
    pub total_distance: f64,

    /// Per-segment travel time in milliseconds, one entry per segment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment_durations: Option<Vec<f64>>,
}

impl ActiveMovement {
    pub fn destination(&self) -> Position {
        self.waypoints[self.waypoints.len() - 1]
    }

    /// Per-segment timing usable for interpolation, if present and well formed
    pub fn consistent_segment_durations(&self) -> Option<&[f64]> {
        self.segment_durations
            .as_deref()
            .filter(|d| d.len() + 1 == self.waypoints.len())
    }
}
