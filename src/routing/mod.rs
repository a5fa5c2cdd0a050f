// Route provider adapter: external routing with a straight-line fallback

mod osrm;

pub use osrm::OsrmClient;

use crate::config::RoutingConfig;
use crate::geo::{decode_polyline, distance, segment_lengths, simplify_waypoints, Position};
use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[cfg(test)]
mod tests;

/// Travel mode requested from the routing provider
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelProfile {
    Walking,
    #[default]
    Driving,
}

impl TravelProfile {
    /// OSRM profile path segment
    pub fn osrm_profile(&self) -> &'static str {
        match self {
            TravelProfile::Walking => "foot",
            TravelProfile::Driving => "driving",
        }
    }
}

/// One maneuver of a provider route
#[derive(Clone, Debug)]
pub struct RawStep {
    /// Encoded polyline of this step
    pub geometry: String,
    /// Seconds
    pub duration: f64,
}

/// Undecoded route as returned by a provider
#[derive(Clone, Debug)]
pub struct RawRoute {
    /// Meters
    pub distance: f64,
    /// Seconds
    pub duration: f64,
    /// Encoded overview polyline
    pub geometry: Option<String>,
    pub steps: Vec<RawStep>,
    /// Polyline precision (decimal digits)
    pub precision: u32,
}

/// External routing service
#[async_trait]
pub trait RouteProvider: Send + Sync {
    async fn fetch_route(
        &self,
        from: Position,
        to: Position,
        profile: TravelProfile,
    ) -> Result<RawRoute>;
}

/// Decoded route ready for movement planning.
///
/// Callers treat provider routes and fallbacks identically; `success`
/// and `error` are informational.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    /// Meters
    pub distance: f64,
    /// Seconds
    pub duration: f64,
    pub waypoints: Vec<Position>,
    /// Seconds per segment (length = waypoints.len() - 1)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment_durations: Option<Vec<f64>>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Route lookups with decoding, simplification and fallback
pub struct RouteService {
    provider: Option<Arc<dyn RouteProvider>>,
    timeout: Duration,
    min_waypoint_distance: f64,
    walking_speed: f64,
    driving_speed: f64,
}

impl RouteService {
    pub fn new(provider: Option<Arc<dyn RouteProvider>>, config: &RoutingConfig) -> Self {
        Self {
            provider,
            timeout: Duration::from_millis(config.timeout_ms),
            min_waypoint_distance: config.min_waypoint_distance_m,
            walking_speed: config.walking_speed_mps,
            driving_speed: config.driving_speed_mps,
        }
    }

    /// Build from config: OSRM when enabled, otherwise straight-line only
    pub fn from_config(config: &RoutingConfig) -> Result<Self> {
        let provider: Option<Arc<dyn RouteProvider>> = if config.enabled {
            Some(Arc::new(OsrmClient::new(
                config.osrm_url.clone(),
                Duration::from_millis(config.timeout_ms),
            )?))
        } else {
            None
        };
        Ok(Self::new(provider, config))
    }

    /// Default speed for a profile (m/s)
    pub fn profile_speed(&self, profile: TravelProfile) -> f64 {
        match profile {
            TravelProfile::Walking => self.walking_speed,
            TravelProfile::Driving => self.driving_speed,
        }
    }

    /// Get a route; never fails, falling back to a straight line
    pub async fn get_route(&self, from: Position, to: Position, profile: TravelProfile) -> Route {
        let Some(provider) = &self.provider else {
            return self.fallback(from, to, profile, "routing provider disabled".to_string());
        };

        let fetched = tokio::time::timeout(self.timeout, provider.fetch_route(from, to, profile)).await;

        let raw = match fetched {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => return self.fallback(from, to, profile, format!("{:#}", e)),
            Err(_) => {
                return self.fallback(
                    from,
                    to,
                    profile,
                    format!("routing provider timed out after {:?}", self.timeout),
                )
            }
        };

        match self.decode(&raw) {
            Ok((waypoints, segment_durations)) => {
                debug!(
                    waypoints = waypoints.len(),
                    distance = raw.distance,
                    duration = raw.duration,
                    "Route decoded"
                );
                Route {
                    distance: raw.distance,
                    duration: raw.duration,
                    waypoints,
                    segment_durations: Some(segment_durations),
                    success: true,
                    error: None,
                }
            }
            Err(e) => self.fallback(from, to, profile, format!("{:#}", e)),
        }
    }

    /// Straight two-point route at the profile's default speed
    pub fn fallback(
        &self,
        from: Position,
        to: Position,
        profile: TravelProfile,
        error: String,
    ) -> Route {
        warn!(error = %error, profile = ?profile, "Routing failed, using straight-line route");

        let meters = distance(from, to);
        Route {
            distance: meters,
            duration: meters / self.profile_speed(profile),
            waypoints: vec![from, to],
            segment_durations: None,
            success: false,
            error: Some(error),
        }
    }

    /// Decode provider geometry into simplified waypoints and per-segment seconds
    fn decode(&self, raw: &RawRoute) -> Result<(Vec<Position>, Vec<f64>)> {
        let (mut points, mut durations) = decode_steps(raw)?;

        if points.len() < 2 {
            let Some(geometry) = &raw.geometry else {
                bail!("route has neither step nor overview geometry");
            };
            points = dedup_consecutive(decode_polyline(geometry, raw.precision)?);
            durations = distribute(raw.duration, &segment_lengths(&points));
        }

        if points.len() < 2 {
            bail!("route geometry has fewer than two distinct points");
        }

        // Steps without timing: spread the route total by length
        if durations.iter().sum::<f64>() < 1e-9 && raw.duration > 0.0 {
            durations = distribute(raw.duration, &segment_lengths(&points));
        }

        let simplified = simplify_waypoints(&points, self.min_waypoint_distance);
        if simplified.len() != points.len() {
            let total: f64 = durations.iter().sum();
            durations = distribute(total, &segment_lengths(&simplified));
            points = simplified;
        }

        Ok((points, durations))
    }
}

/// Concatenate step geometries, splitting each step's time across its
/// sub-segments by length. Time of steps that add no segment carries over.
fn decode_steps(raw: &RawRoute) -> Result<(Vec<Position>, Vec<f64>)> {
    let mut points: Vec<Position> = Vec::new();
    let mut durations: Vec<f64> = Vec::new();
    let mut carry = 0.0;

    for step in &raw.steps {
        let decoded = decode_polyline(&step.geometry, raw.precision)?;

        let mut lengths = Vec::new();
        for point in decoded {
            match points.last() {
                Some(last) if *last == point => continue,
                Some(last) => lengths.push(distance(*last, point)),
                None => {}
            }
            points.push(point);
        }

        let step_time = step.duration + carry;
        if lengths.is_empty() {
            carry = step_time;
        } else {
            durations.extend(distribute(step_time, &lengths));
            carry = 0.0;
        }
    }

    if carry > 0.0 {
        if let Some(last) = durations.last_mut() {
            *last += carry;
        }
    }

    Ok((points, durations))
}

/// Split `total` across segments proportionally to length (equal split when
/// the lengths sum to ~0)
fn distribute(total: f64, lengths: &[f64]) -> Vec<f64> {
    if lengths.is_empty() {
        return Vec::new();
    }

    let sum: f64 = lengths.iter().sum();
    if sum < 1e-9 {
        let share = total / lengths.len() as f64;
        return vec![share; lengths.len()];
    }

    lengths.iter().map(|len| total * len / sum).collect()
}

fn dedup_consecutive(mut points: Vec<Position>) -> Vec<Position> {
    points.dedup();
    points
}
