// Hazard engine: fire growth, suppression decay and removal

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::HazardConfig;
use crate::event::{EventBus, FireUpdated, HazardRemoved, WorldEvent};
use crate::geo::distance;
use crate::world::{FireIntensity, HazardState, WorldError, WorldStore};

#[cfg(test)]
mod tests;

/// Summary of one hazard pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HazardPass {
    pub updated: usize,
    pub removed: usize,
    pub skipped: usize,
}

/// Outcome of a suppression attempt
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuppressOutcome {
    pub hazard_id: String,
    pub fire_extinguished: bool,
    pub remaining_intensity: f64,
    pub suppression_effort: f64,
    /// Meters between the agent and the hazard center
    pub distance: f64,
}

/// Evolve one fire by `dt` seconds.
///
/// Suppressed fires decay and stop spreading; unsuppressed fires grow in
/// intensity and radius up to their caps.
pub fn step_fire(hazard: &mut HazardState, dt: f64, cfg: &HazardConfig) -> Result<(), WorldError> {
    if !hazard.is_fire() || hazard.intensity <= 0.0 || dt <= 0.0 {
        return Ok(());
    }

    if hazard.suppression_effort > 0.0 {
        let factor = hazard.suppression_effort.max(cfg.min_suppression_factor);
        hazard.intensity = (hazard.intensity - cfg.decay_rate * dt * factor).max(0.0);
    } else {
        hazard.intensity = (hazard.intensity + cfg.growth_rate * dt).min(1.0);
        hazard.radius = (hazard.radius + hazard.spread_rate * dt).min(cfg.radius_cap_m);
    }

    if !hazard.intensity.is_finite() || !hazard.radius.is_finite() {
        return Err(WorldError::InternalInconsistency(format!(
            "hazard '{}' produced non-finite state",
            hazard.hazard_id
        )));
    }

    hazard.fire_intensity = Some(FireIntensity::from_intensity(hazard.intensity));
    Ok(())
}

/// Remove a fire: one final zeroed update, then the removal event
pub fn retire_hazard(store: &WorldStore, bus: &EventBus, hazard: &HazardState, now: i64) {
    if store.retire_hazard(&hazard.hazard_id, now).is_none() {
        return;
    }

    bus.emit(WorldEvent::FireUpdated(FireUpdated::extinguished(hazard, now)));
    bus.emit(WorldEvent::FireRemoved(HazardRemoved {
        hazard_id: hazard.hazard_id.clone(),
        timestamp: now,
    }));
}

/// Run one pass over every live fire
pub fn step_all(store: &WorldStore, bus: &EventBus, cfg: &HazardConfig, now: i64) -> HazardPass {
    let mut pass = HazardPass::default();

    for hazard_id in store.hazard_ids() {
        let Some(mut hazard) = store.get_hazard(&hazard_id) else {
            continue;
        };
        if !hazard.is_fire() || hazard.intensity <= 0.0 {
            continue;
        }

        let dt = (now - hazard.last_updated).max(0) as f64 / 1000.0;
        if let Err(e) = step_fire(&mut hazard, dt, cfg) {
            warn!(hazard_id = %hazard_id, error = %e, "Skipping hazard this tick");
            pass.skipped += 1;
            continue;
        }
        hazard.last_updated = now;

        if hazard.intensity <= cfg.removal_epsilon {
            info!(hazard_id = %hazard_id, "Fire burned out");
            retire_hazard(store, bus, &hazard, now);
            pass.removed += 1;
            continue;
        }

        let snapshot = hazard.clone();
        if store.update_hazard(&hazard_id, move |h| *h = snapshot) {
            bus.emit(WorldEvent::FireUpdated(FireUpdated::from_state(&hazard, now)));
            pass.updated += 1;
        }
    }

    if pass.removed > 0 || pass.skipped > 0 {
        debug!(
            updated = pass.updated,
            removed = pass.removed,
            skipped = pass.skipped,
            "Hazard pass complete"
        );
    }

    pass
}

/// Apply suppression from an agent to a fire.
///
/// Intensity drops by `rate` and the effort accumulator rises by `rate`
/// (capped at 1). At or below the extinguish threshold the fire is removed
/// immediately.
pub fn suppress(
    store: &WorldStore,
    bus: &EventBus,
    cfg: &HazardConfig,
    agent_id: &str,
    hazard_id: &str,
    rate: f64,
    now: i64,
) -> Result<SuppressOutcome, WorldError> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(WorldError::Validation(format!(
            "suppression rate must be positive, got {}",
            rate
        )));
    }

    let mut hazard = store
        .get_hazard(hazard_id)
        .filter(|h| h.is_fire())
        .ok_or_else(|| WorldError::HazardNotFound(hazard_id.to_string()))?;

    let agent = store
        .get_agent(agent_id)
        .ok_or_else(|| WorldError::AgentNotFound(agent_id.to_string()))?;

    let meters = distance(agent.position, hazard.position);
    if meters > cfg.suppression_range_m {
        return Err(WorldError::OutOfRange {
            distance: meters,
            max: cfg.suppression_range_m,
        });
    }

    hazard.intensity = (hazard.intensity - rate).max(0.0);
    hazard.suppression_effort = (hazard.suppression_effort + rate).min(1.0);
    hazard.last_updated = now;

    if hazard.intensity <= cfg.extinguish_threshold {
        hazard.intensity = 0.0;
        hazard.suppression_effort = 1.0;

        info!(hazard_id = %hazard_id, agent_id = %agent_id, "Fire extinguished");
        retire_hazard(store, bus, &hazard, now);

        return Ok(SuppressOutcome {
            hazard_id: hazard_id.to_string(),
            fire_extinguished: true,
            remaining_intensity: 0.0,
            suppression_effort: 1.0,
            distance: meters,
        });
    }

    hazard.fire_intensity = Some(FireIntensity::from_intensity(hazard.intensity));
    let snapshot = hazard.clone();
    store.update_hazard(hazard_id, move |h| *h = snapshot);
    bus.emit(WorldEvent::FireUpdated(FireUpdated::from_state(&hazard, now)));

    debug!(
        hazard_id = %hazard_id,
        agent_id = %agent_id,
        intensity = hazard.intensity,
        "Suppression applied"
    );

    Ok(SuppressOutcome {
        hazard_id: hazard_id.to_string(),
        fire_extinguished: false,
        remaining_intensity: hazard.intensity,
        suppression_effort: hazard.suppression_effort,
        distance: meters,
    })
}
