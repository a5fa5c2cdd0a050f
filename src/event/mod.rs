use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::geo::Position;
use crate::world::{AgentStatus, AgentType, FireIntensity, HazardState, HazardType};

#[cfg(test)]
mod tests;

/// Event subject names published on the bus
pub mod subjects {
    pub const POSITION_UPDATED: &str = "agent.position.updated";
    pub const MOVEMENT_COMPLETED: &str = "agent.movement.completed";
    pub const POSITIONS_BATCH: &str = "world.positions.batch";
    pub const AGENT_SPAWNED: &str = "world.agent.spawned";
    pub const AGENT_DESPAWNED: &str = "world.agent.despawned";
    pub const AGENT_EXPIRED: &str = "world.agent.expired";
    pub const AGENT_STATUS_UPDATED: &str = "world.agent.status.updated";
    pub const HAZARD_SPAWNED: &str = "world.hazard.spawned";
    pub const FIRE_SPAWNED: &str = "world.hazard.fire.spawned";
    pub const FIRE_UPDATED: &str = "world.hazard.fire.updated";
    pub const FIRE_REMOVED: &str = "world.hazard.fire.removed";
    pub const TICK: &str = "world.tick";
}

/// Rate of change of a moving agent, degrees per second
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionUpdate {
    pub agent_id: String,
    pub position: Position,
    pub moving: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearing: Option<f64>,
    /// Dead-reckoning hint for clients
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity: Option<Velocity>,
    pub timestamp: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementCompleted {
    pub agent_id: String,
    pub position: Position,
    pub timestamp: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntry {
    pub agent_id: String,
    #[serde(rename = "type")]
    pub agent_type: AgentType,
    pub position: Position,
    pub moving: bool,
    pub status: AgentStatus,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionsBatch {
    pub tick: u64,
    pub agents: Vec<BatchEntry>,
    pub timestamp: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSpawned {
    pub agent_id: String,
    #[serde(rename = "type")]
    pub agent_type: AgentType,
    pub position: Position,
    pub status: AgentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifetime: Option<i64>,
    pub timestamp: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRemoved {
    pub agent_id: String,
    pub timestamp: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentExpired {
    pub agent_id: String,
    pub spawned_at: i64,
    pub lifetime: i64,
    pub timestamp: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatusUpdated {
    pub agent_id: String,
    pub previous_status: AgentStatus,
    pub status: AgentStatus,
    pub timestamp: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardSpawned {
    pub hazard_id: String,
    #[serde(rename = "type")]
    pub hazard_type: HazardType,
    pub position: Position,
    pub intensity: f64,
    pub radius: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fire_intensity: Option<FireIntensity>,
    pub timestamp: i64,
}

impl HazardSpawned {
    pub fn from_state(hazard: &HazardState) -> Self {
        Self {
            hazard_id: hazard.hazard_id.clone(),
            hazard_type: hazard.hazard_type,
            position: hazard.position,
            intensity: hazard.intensity,
            radius: hazard.radius,
            fire_intensity: hazard.fire_intensity,
            timestamp: hazard.created_at,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FireUpdated {
    pub hazard_id: String,
    pub position: Position,
    pub intensity: f64,
    pub radius: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fire_intensity: Option<FireIntensity>,
    pub suppression_effort: f64,
    pub extinguished: bool,
    pub timestamp: i64,
}

impl FireUpdated {
    pub fn from_state(hazard: &HazardState, timestamp: i64) -> Self {
        Self {
            hazard_id: hazard.hazard_id.clone(),
            position: hazard.position,
            intensity: hazard.intensity,
            radius: hazard.radius,
            fire_intensity: hazard.fire_intensity,
            suppression_effort: hazard.suppression_effort,
            extinguished: false,
            timestamp,
        }
    }

    /// Final update for a fire about to be removed: intensity and radius forced to zero
    pub fn extinguished(hazard: &HazardState, timestamp: i64) -> Self {
        Self {
            intensity: 0.0,
            radius: 0.0,
            extinguished: true,
            ..Self::from_state(hazard, timestamp)
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardRemoved {
    pub hazard_id: String,
    pub timestamp: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickHeartbeat {
    pub tick: u64,
    pub agents: usize,
    pub hazards: usize,
    pub movements: usize,
    pub timestamp: i64,
}

/// State-change notification emitted by the world.
///
/// Serializes as its payload; the subject travels alongside (see `subject`).
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum WorldEvent {
    PositionUpdated(PositionUpdate),
    MovementCompleted(MovementCompleted),
    PositionsBatch(PositionsBatch),
    AgentSpawned(AgentSpawned),
    AgentDespawned(AgentRemoved),
    AgentExpired(AgentExpired),
    AgentStatusUpdated(AgentStatusUpdated),
    HazardSpawned(HazardSpawned),
    FireSpawned(HazardSpawned),
    FireUpdated(FireUpdated),
    FireRemoved(HazardRemoved),
    Tick(TickHeartbeat),
}

impl WorldEvent {
    pub fn subject(&self) -> &'static str {
        match self {
            WorldEvent::PositionUpdated(_) => subjects::POSITION_UPDATED,
            WorldEvent::MovementCompleted(_) => subjects::MOVEMENT_COMPLETED,
            WorldEvent::PositionsBatch(_) => subjects::POSITIONS_BATCH,
            WorldEvent::AgentSpawned(_) => subjects::AGENT_SPAWNED,
            WorldEvent::AgentDespawned(_) => subjects::AGENT_DESPAWNED,
            WorldEvent::AgentExpired(_) => subjects::AGENT_EXPIRED,
            WorldEvent::AgentStatusUpdated(_) => subjects::AGENT_STATUS_UPDATED,
            WorldEvent::HazardSpawned(_) => subjects::HAZARD_SPAWNED,
            WorldEvent::FireSpawned(_) => subjects::FIRE_SPAWNED,
            WorldEvent::FireUpdated(_) => subjects::FIRE_UPDATED,
            WorldEvent::FireRemoved(_) => subjects::FIRE_REMOVED,
            WorldEvent::Tick(_) => subjects::TICK,
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            WorldEvent::PositionUpdated(e) => e.timestamp,
            WorldEvent::MovementCompleted(e) => e.timestamp,
            WorldEvent::PositionsBatch(e) => e.timestamp,
            WorldEvent::AgentSpawned(e) => e.timestamp,
            WorldEvent::AgentDespawned(e) => e.timestamp,
            WorldEvent::AgentExpired(e) => e.timestamp,
            WorldEvent::AgentStatusUpdated(e) => e.timestamp,
            WorldEvent::HazardSpawned(e) | WorldEvent::FireSpawned(e) => e.timestamp,
            WorldEvent::FireUpdated(e) => e.timestamp,
            WorldEvent::FireRemoved(e) => e.timestamp,
            WorldEvent::Tick(e) => e.timestamp,
        }
    }
}

/// Wire form of a published event
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// UUIDv7 identifier (time-ordered, globally unique)
    #[serde(rename = "eventId")]
    pub event_id: String,

    pub subject: String,

    /// Unix epoch milliseconds
    pub timestamp: i64,

    pub payload: Value,
}

impl EventEnvelope {
    pub fn from_event(event: &WorldEvent) -> Result<Self> {
        let payload = serde_json::to_value(event)
            .with_context(|| format!("Failed to serialize '{}' event", event.subject()))?;

        Ok(Self {
            event_id: Uuid::now_v7().to_string(),
            subject: event.subject().to_string(),
            timestamp: event.timestamp(),
            payload,
        })
    }
}

/// In-process fan-out of world events.
///
/// Emission never blocks and never fails: with no subscribers, or with
/// lagging ones, events are simply dropped for that receiver.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<WorldEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn emit(&self, event: WorldEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorldEvent> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
