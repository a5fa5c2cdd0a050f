// Movement engine: route -> ActiveMovement, and per-tick interpolation

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::event::{EventBus, MovementCompleted, PositionUpdate, Velocity, WorldEvent};
use crate::geo::{bearing, interpolate, path_length, segment_lengths, Position};
use crate::routing::Route;
use crate::world::{ActiveMovement, WorldError, WorldStore};


/// Longest travel time a movement may be planned for (one year, ms)
pub const MAX_DURATION_MS: f64 = 365.0 * 24.0 * 3600.0 * 1000.0;

/// How hard the agent pushes; scales total travel time
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    #[default]
    Normal,
    Urgent,
    Emergency,
}

impl Urgency {
    pub fn multiplier(&self) -> f64 {
        match self {
            Urgency::Normal => 1.0,
            Urgency::Urgent => 0.75,
            Urgency::Emergency => 0.5,
        }
    }
}

/// A movement ready to be registered for an agent
#[derive(Clone, Debug)]
pub struct PlannedMove {
    pub movement: ActiveMovement,
    /// m/s over the whole path
    pub speed: f64,
    /// Route duration before urgency / speed override (seconds)
    pub base_duration: f64,
    pub route_success: bool,
    pub route_error: Option<String>,
}

impl PlannedMove {
    /// Adjusted travel time in seconds
    pub fn duration_secs(&self) -> f64 {
        self.movement.duration / 1000.0
    }

    /// Wall-clock arrival (Unix epoch milliseconds)
    pub fn estimated_arrival(&self) -> i64 {
        self.movement
            .start_time
            .saturating_add(self.movement.duration.round() as i64)
    }
}

/// Turn a route into a timed movement.
///
/// Total time is the route duration scaled by the urgency multiplier, or by
/// `profile_speed / speed_override` when an override is given. Per-segment
/// times are scaled by the same ratio.
pub fn plan_movement(
    agent_id: &str,
    route: &Route,
    profile_speed: f64,
    urgency: Urgency,
    speed_override: Option<f64>,
    now: i64,
) -> Result<PlannedMove, WorldError> {
    if route.waypoints.len() < 2 {
        return Err(WorldError::Validation(
            "route must contain at least two waypoints".to_string(),
        ));
    }

    let base_ms = route.duration.max(0.0) * 1000.0;
    let adjusted_ms = match speed_override {
        Some(speed) if speed.is_finite() && speed > 0.0 => base_ms * profile_speed / speed,
        Some(speed) => {
            return Err(WorldError::Validation(format!(
                "speed override must be positive, got {}",
                speed
            )))
        }
        None => base_ms * urgency.multiplier(),
    };
    if !adjusted_ms.is_finite() || adjusted_ms > MAX_DURATION_MS {
        return Err(WorldError::Validation(format!(
            "travel time of {} s exceeds the {} s limit",
            adjusted_ms / 1000.0,
            MAX_DURATION_MS / 1000.0
        )));
    }
    let ratio = if base_ms > 0.0 { adjusted_ms / base_ms } else { 1.0 };

    let segment_durations = match &route.segment_durations {
        Some(durations) if durations.len() + 1 == route.waypoints.len() => {
            Some(durations.iter().map(|d| d * 1000.0 * ratio).collect::<Vec<_>>())
        }
        Some(durations) => {
            warn!(
                agent_id = %agent_id,
                segments = durations.len(),
                waypoints = route.waypoints.len(),
                "Segment timing does not match waypoints, using distance interpolation"
            );
            None
        }
        None => None,
    };

    let total_distance = path_length(&route.waypoints);
    let speed = if adjusted_ms > 0.0 {
        total_distance / (adjusted_ms / 1000.0)
    } else {
        0.0
    };

    Ok(PlannedMove {
        movement: ActiveMovement {
            agent_id: agent_id.to_string(),
            start_time: now,
            duration: adjusted_ms,
            waypoints: route.waypoints.clone(),
            current_segment: 0,
            total_distance,
            segment_durations,
        },
        speed,
        base_duration: route.duration,
        route_success: route.success,
        route_error: route.error.clone(),
    })
}

/// Register a planned movement, replacing any in-flight one for the agent
pub fn begin_movement(store: &WorldStore, plan: &PlannedMove, now: i64) -> Result<(), WorldError> {
    let agent_id = plan.movement.agent_id.clone();
    if !store.contains_agent(&agent_id) {
        return Err(WorldError::AgentNotFound(agent_id));
    }

    let destination = plan.movement.destination();
    store.set_movement(plan.movement.clone())?;
    store.update_agent(&agent_id, |agent| {
        agent.moving = true;
        agent.destination = Some(destination);
        agent.speed = plan.speed;
        agent.last_updated = now;
    });

    info!(
        agent_id = %agent_id,
        duration_s = plan.duration_secs(),
        waypoints = plan.movement.waypoints.len(),
        "Movement started"
    );
    Ok(())
}

/// Result of advancing one movement to a point in time
#[derive(Clone, Debug, PartialEq)]
pub enum MovementStep {
    Moving {
        position: Position,
        segment: usize,
        bearing: Option<f64>,
        velocity: Option<Velocity>,
    },
    Arrived {
        position: Position,
    },
}

/// Interpolated position of `movement` at `now`.
///
/// A time exactly on a segment boundary belongs to the following segment.
pub fn advance(movement: &ActiveMovement, now: i64) -> Result<MovementStep, WorldError> {
    let destination = movement.destination();
    let elapsed = (now - movement.start_time).max(0) as f64;

    if movement.duration <= 0.0 || elapsed / movement.duration >= 1.0 {
        return Ok(MovementStep::Arrived {
            position: destination,
        });
    }

    let step = match movement.consistent_segment_durations() {
        Some(durations) => by_segment_time(&movement.waypoints, durations, elapsed),
        None => {
            if movement.segment_durations.is_some() {
                debug!(
                    agent_id = %movement.agent_id,
                    "Inconsistent segment timing, interpolating by distance"
                );
            }
            by_distance(movement, elapsed / movement.duration)
        }
    };

    if let MovementStep::Moving { position, .. } = &step {
        if !position.lat.is_finite() || !position.lon.is_finite() {
            return Err(WorldError::InternalInconsistency(format!(
                "non-finite position for agent '{}'",
                movement.agent_id
            )));
        }
    }

    Ok(step)
}

fn by_segment_time(waypoints: &[Position], durations: &[f64], elapsed: f64) -> MovementStep {
    let mut consumed = 0.0;

    for (i, &segment_ms) in durations.iter().enumerate() {
        if elapsed < consumed + segment_ms {
            let t = (elapsed - consumed) / segment_ms;
            return moving_on_segment(waypoints[i], waypoints[i + 1], i, t, segment_ms);
        }
        consumed += segment_ms;
    }

    // Rounding slop past the last segment: hold at the final waypoint
    MovementStep::Moving {
        position: waypoints[waypoints.len() - 1],
        segment: durations.len().saturating_sub(1),
        bearing: None,
        velocity: None,
    }
}

fn by_distance(movement: &ActiveMovement, progress: f64) -> MovementStep {
    let waypoints = &movement.waypoints;
    let lengths = segment_lengths(waypoints);
    let total: f64 = lengths.iter().sum();
    let target = progress * total;
    let mut covered = 0.0;

    for (i, &len) in lengths.iter().enumerate() {
        if target < covered + len {
            let t = (target - covered) / len;
            let segment_ms = movement.duration * len / total;
            return moving_on_segment(waypoints[i], waypoints[i + 1], i, t, segment_ms);
        }
        covered += len;
    }

    MovementStep::Moving {
        position: waypoints[waypoints.len() - 1],
        segment: lengths.len().saturating_sub(1),
        bearing: None,
        velocity: None,
    }
}

fn moving_on_segment(
    from: Position,
    to: Position,
    segment: usize,
    t: f64,
    segment_ms: f64,
) -> MovementStep {
    let secs = segment_ms / 1000.0;
    let velocity = (secs > 0.0).then(|| Velocity {
        lat: (to.lat - from.lat) / secs,
        lon: (to.lon - from.lon) / secs,
    });

    MovementStep::Moving {
        position: interpolate(from, to, t),
        segment,
        bearing: Some(bearing(from, to)),
        velocity,
    }
}

/// Advance every in-flight movement to `now`, emitting position and
/// arrival events. Returns the number of arrivals.
pub fn advance_all(store: &WorldStore, bus: &EventBus, now: i64) -> usize {
    let mut arrivals = 0;

    for agent_id in store.movement_ids() {
        let Some(movement) = store.get_movement(&agent_id) else {
            continue;
        };

        if !store.contains_agent(&agent_id) {
            warn!(agent_id = %agent_id, "Movement without agent, discarding");
            store.remove_movement(&agent_id);
            continue;
        }

        let step = match advance(&movement, now) {
            Ok(step) => step,
            Err(e) => {
                warn!(agent_id = %agent_id, error = %e, "Skipping movement this tick");
                continue;
            }
        };

        match step {
            MovementStep::Moving {
                position,
                segment,
                bearing,
                velocity,
            } => {
                store.update_movement(&agent_id, |m| m.current_segment = segment);
                store.update_agent(&agent_id, |agent| {
                    agent.position = position;
                    agent.last_updated = now;
                });
                bus.emit(WorldEvent::PositionUpdated(PositionUpdate {
                    agent_id,
                    position,
                    moving: true,
                    bearing,
                    velocity,
                    timestamp: now,
                }));
            }
            MovementStep::Arrived { position } => {
                store.remove_movement(&agent_id);
                store.update_agent(&agent_id, |agent| {
                    agent.position = position;
                    agent.moving = false;
                    agent.destination = None;
                    agent.last_updated = now;
                });
                arrivals += 1;

                info!(agent_id = %agent_id, "Movement completed");
                bus.emit(WorldEvent::MovementCompleted(MovementCompleted {
                    agent_id: agent_id.clone(),
                    position,
                    timestamp: now,
                }));
                bus.emit(WorldEvent::PositionUpdated(PositionUpdate {
                    agent_id,
                    position,
                    moving: false,
                    bearing: None,
                    velocity: None,
                    timestamp: now,
                }));
            }
        }
    }

    arrivals
}
