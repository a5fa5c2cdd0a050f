use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{HazardConfig, SimulationConfig};
use crate::event::{
    AgentExpired, BatchEntry, EventBus, PositionUpdate, PositionsBatch, TickHeartbeat, WorldEvent,
};
use crate::hazard::{self, HazardPass};
use crate::movement;
use crate::world::WorldStore;

/// Convert a target broadcast rate into "every N ticks".
///
/// Returns `None` when the target rate is disabled (zero, negative or
/// not a number).
pub fn every_n_ticks(tick_hz: f64, target_hz: f64) -> Option<u64> {
    if !(target_hz.is_finite() && target_hz > 0.0) {
        return None;
    }
    let n = (tick_hz / target_hz).round();
    Some(if n.is_finite() && n >= 1.0 { n as u64 } else { 1 })
}

/// Summary of a single tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub arrivals: usize,
    pub hazards: HazardPass,
    pub expired: usize,
    pub stationary_refreshed: usize,
    pub batch_emitted: bool,
}

/// Fixed-rate driver for the simulation.
///
/// Owns the tick counter and the rate gates computed once at startup;
/// the caller supplies the clock so ticks are reproducible in tests.
#[derive(Debug, Clone)]
pub struct TickScheduler {
    tick_hz: f64,
    batch_every: Option<u64>,
    stationary_every: Option<u64>,
    tick: u64,
}

impl TickScheduler {
    pub fn new(config: &SimulationConfig) -> Self {
        let tick_hz = if config.tick_hz.is_finite() && config.tick_hz > 0.0 {
            config.tick_hz
        } else {
            warn!(tick_hz = config.tick_hz, "Invalid tick rate, using 10 Hz");
            10.0
        };

        let batch_every = every_n_ticks(tick_hz, config.batch_hz);
        let stationary_every = every_n_ticks(tick_hz, config.stationary_hz);

        info!(
            tick_hz,
            batch_every = ?batch_every,
            stationary_every = ?stationary_every,
            "Tick scheduler configured"
        );

        Self {
            tick_hz,
            batch_every,
            stationary_every,
            tick: 0,
        }
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_hz)
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn batch_every(&self) -> Option<u64> {
        self.batch_every
    }

    pub fn stationary_every(&self) -> Option<u64> {
        self.stationary_every
    }

    /// Run one tick against the store at time `now`
    pub fn run_tick(
        &mut self,
        store: &WorldStore,
        bus: &EventBus,
        hazard_cfg: &HazardConfig,
        now: i64,
    ) -> TickReport {
        self.tick += 1;
        let tick = self.tick;

        let arrivals = movement::advance_all(store, bus, now);
        let hazards = hazard::step_all(store, bus, hazard_cfg, now);
        let expired = expire_agents(store, bus, now);

        let stationary_refreshed = match self.stationary_every {
            Some(n) if tick % n == 0 => refresh_stationary(store, bus, now),
            _ => 0,
        };

        let batch_emitted = match self.batch_every {
            Some(n) if tick % n == 0 => {
                emit_batch(store, bus, tick, now);
                true
            }
            _ => false,
        };

        bus.emit(WorldEvent::Tick(TickHeartbeat {
            tick,
            agents: store.agent_count(),
            hazards: store.hazard_count(),
            movements: store.movement_count(),
            timestamp: now,
        }));

        debug!(
            tick,
            arrivals,
            hazards_updated = hazards.updated,
            hazards_removed = hazards.removed,
            expired,
            "Tick complete"
        );

        TickReport {
            tick,
            arrivals,
            hazards,
            expired,
            stationary_refreshed,
            batch_emitted,
        }
    }
}

/// Remove agents whose lifetime has elapsed; one expiry event each
pub fn expire_agents(store: &WorldStore, bus: &EventBus, now: i64) -> usize {
    let mut expired = 0;

    for agent in store.agents() {
        if !agent.is_expired(now) {
            continue;
        }
        // Already gone means someone else removed it; no event
        if store.remove_agent(&agent.agent_id).is_none() {
            continue;
        }

        info!(agent_id = %agent.agent_id, "Agent lifetime expired");
        bus.emit(WorldEvent::AgentExpired(AgentExpired {
            agent_id: agent.agent_id.clone(),
            spawned_at: agent.spawned_at,
            lifetime: agent.lifetime_ms.unwrap_or_default(),
            timestamp: now,
        }));
        expired += 1;
    }

    expired
}

fn refresh_stationary(store: &WorldStore, bus: &EventBus, now: i64) -> usize {
    let mut refreshed = 0;
    for agent in store.agents().into_iter().filter(|a| !a.moving) {
        bus.emit(WorldEvent::PositionUpdated(PositionUpdate {
            agent_id: agent.agent_id,
            position: agent.position,
            moving: false,
            bearing: None,
            velocity: None,
            timestamp: now,
        }));
        refreshed += 1;
    }
    refreshed
}

fn emit_batch(store: &WorldStore, bus: &EventBus, tick: u64, now: i64) {
    let agents = store
        .agents()
        .into_iter()
        .map(|a| BatchEntry {
            agent_id: a.agent_id,
            agent_type: a.agent_type,
            position: a.position,
            moving: a.moving,
            status: a.status,
        })
        .collect();

    bus.emit(WorldEvent::PositionsBatch(PositionsBatch {
        tick,
        agents,
        timestamp: now,
    }));
}
