// World state store: the authoritative agent, hazard, location and movement records

mod entity;
mod error;
mod store;

pub use entity::{
    ActiveMovement, AgentState, AgentStatus, AgentType, FireIntensity, HazardState, HazardType,
    Location, LocationKind,
};
pub use error::WorldError;
pub use store::WorldStore;

/// Current wall-clock time as Unix epoch milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
