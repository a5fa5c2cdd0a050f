use crate::world::entity::{ActiveMovement, AgentState, HazardState, Location};
use crate::world::error::WorldError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info};

/// Authoritative world state.
///
/// Records live in concurrent maps so queries can read while the engine
/// writes; every read clones one record under its shard lock, so a reader
/// never observes a half-applied update. Mutation is crate-private and is
/// only driven from the engine task.
pub struct WorldStore {
    agents: DashMap<String, AgentState>,
    hazards: DashMap<String, HazardState>,
    movements: DashMap<String, ActiveMovement>,

    /// Hazard ids that were removed and may never be reused (id -> removed at)
    retired_hazards: DashMap<String, i64>,

    /// Immutable after construction
    locations: Vec<Location>,
}

impl WorldStore {
    pub fn new(locations: Vec<Location>) -> Self {
        Self {
            agents: DashMap::new(),
            hazards: DashMap::new(),
            movements: DashMap::new(),
            retired_hazards: DashMap::new(),
            locations,
        }
    }

    // ---- reads ----

    pub fn get_agent(&self, agent_id: &str) -> Option<AgentState> {
        self.agents.get(agent_id).map(|a| a.clone())
    }

    pub fn contains_agent(&self, agent_id: &str) -> bool {
        self.agents.contains_key(agent_id)
    }

    pub fn agents(&self) -> Vec<AgentState> {
        self.agents.iter().map(|a| a.value().clone()).collect()
    }

    pub fn agent_ids(&self) -> Vec<String> {
        self.agents.iter().map(|a| a.key().clone()).collect()
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn get_hazard(&self, hazard_id: &str) -> Option<HazardState> {
        self.hazards.get(hazard_id).map(|h| h.clone())
    }

    pub fn hazards(&self) -> Vec<HazardState> {
        self.hazards.iter().map(|h| h.value().clone()).collect()
    }

    pub fn hazard_ids(&self) -> Vec<String> {
        self.hazards.iter().map(|h| h.key().clone()).collect()
    }

    pub fn hazard_count(&self) -> usize {
        self.hazards.len()
    }

    pub fn is_retired_hazard(&self, hazard_id: &str) -> bool {
        self.retired_hazards.contains_key(hazard_id)
    }

    pub fn get_movement(&self, agent_id: &str) -> Option<ActiveMovement> {
        self.movements.get(agent_id).map(|m| m.clone())
    }

    pub fn movement_ids(&self) -> Vec<String> {
        self.movements.iter().map(|m| m.key().clone()).collect()
    }

    pub fn movement_count(&self) -> usize {
        self.movements.len()
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    // ---- writes (engine only) ----

    pub(crate) fn insert_agent(&self, agent: AgentState) -> Result<(), WorldError> {
        match self.agents.entry(agent.agent_id.clone()) {
            Entry::Occupied(_) => Err(WorldError::AlreadyExists {
                kind: "agent",
                id: agent.agent_id,
            }),
            Entry::Vacant(slot) => {
                slot.insert(agent);
                Ok(())
            }
        }
    }

    /// Apply `f` to one agent atomically. Returns false if the agent is absent.
    pub(crate) fn update_agent(&self, agent_id: &str, f: impl FnOnce(&mut AgentState)) -> bool {
        match self.agents.get_mut(agent_id) {
            Some(mut agent) => {
                f(&mut agent);
                true
            }
            None => false,
        }
    }

    /// Remove an agent together with any in-flight movement
    pub(crate) fn remove_agent(&self, agent_id: &str) -> Option<AgentState> {
        self.movements.remove(agent_id);
        let removed = self.agents.remove(agent_id).map(|(_, agent)| agent);
        if removed.is_some() {
            debug!(agent_id = %agent_id, "Agent removed from store");
        }
        removed
    }

    pub(crate) fn insert_hazard(&self, hazard: HazardState) -> Result<(), WorldError> {
        if self.is_retired_hazard(&hazard.hazard_id) {
            return Err(WorldError::AlreadyExists {
                kind: "hazard",
                id: hazard.hazard_id,
            });
        }

        match self.hazards.entry(hazard.hazard_id.clone()) {
            Entry::Occupied(_) => Err(WorldError::AlreadyExists {
                kind: "hazard",
                id: hazard.hazard_id,
            }),
            Entry::Vacant(slot) => {
                slot.insert(hazard);
                Ok(())
            }
        }
    }

    /// Apply `f` to one live hazard. Updates addressed to retired or unknown
    /// ids are dropped and return false.
    pub(crate) fn update_hazard(
        &self,
        hazard_id: &str,
        f: impl FnOnce(&mut HazardState),
    ) -> bool {
        if self.is_retired_hazard(hazard_id) {
            debug!(hazard_id = %hazard_id, "Dropping update for retired hazard");
            return false;
        }
        match self.hazards.get_mut(hazard_id) {
            Some(mut hazard) => {
                f(&mut hazard);
                true
            }
            None => false,
        }
    }

    /// Remove a hazard permanently; its id can never be reused
    pub(crate) fn retire_hazard(&self, hazard_id: &str, now: i64) -> Option<HazardState> {
        let removed = self.hazards.remove(hazard_id).map(|(_, hazard)| hazard);
        if removed.is_some() {
            self.retired_hazards.insert(hazard_id.to_string(), now);
            info!(hazard_id = %hazard_id, "Hazard retired");
        }
        removed
    }

    /// Store a movement, replacing any in-flight movement for the same agent
    pub(crate) fn set_movement(&self, movement: ActiveMovement) -> Result<(), WorldError> {
        if !self.contains_agent(&movement.agent_id) {
            return Err(WorldError::AgentNotFound(movement.agent_id));
        }
        if movement.waypoints.len() < 2 {
            return Err(WorldError::Validation(
                "movement requires at least two waypoints".to_string(),
            ));
        }
        self.movements.insert(movement.agent_id.clone(), movement);
        Ok(())
    }

    pub(crate) fn update_movement(
        &self,
        agent_id: &str,
        f: impl FnOnce(&mut ActiveMovement),
    ) -> bool {
        match self.movements.get_mut(agent_id) {
            Some(mut movement) => {
                f(&mut movement);
                true
            }
            None => false,
        }
    }

    pub(crate) fn remove_movement(&self, agent_id: &str) -> Option<ActiveMovement> {
        self.movements.remove(agent_id).map(|(_, m)| m)
    }
}

impl Default for WorldStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
