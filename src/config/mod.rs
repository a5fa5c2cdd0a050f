use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

use crate::geo::Position;
use crate::world::{Location, LocationKind};

// Re-export adapter config types
pub use crate::api::ApiConfig;
pub use crate::bus::NatsConfig;

/// Complete Ember configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EmberConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub hazard: HazardConfig,
    #[serde(default)]
    pub vision: VisionConfig,
    #[serde(default)]
    pub nats: NatsConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default = "default_locations")]
    pub locations: Vec<Location>,
}

/// Tick scheduler configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Base tick rate (Hz)
    #[serde(default = "default_tick_hz")]
    pub tick_hz: f64,
    /// Batched position snapshot rate (Hz, 0 = disabled)
    #[serde(default = "default_batch_hz")]
    pub batch_hz: f64,
    /// Position refresh rate for stationary agents (Hz, 0 = disabled)
    #[serde(default)]
    pub stationary_hz: f64,
    /// Capacity of the in-process event broadcast channel
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
    /// Capacity of the engine command queue
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,
}

fn default_tick_hz() -> f64 {
    10.0
}

fn default_batch_hz() -> f64 {
    2.0
}

fn default_event_buffer() -> usize {
    4096
}

fn default_command_buffer() -> usize {
    256
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_hz: default_tick_hz(),
            batch_hz: default_batch_hz(),
            stationary_hz: 0.0,
            event_buffer: default_event_buffer(),
            command_buffer: default_command_buffer(),
        }
    }
}

/// Routing provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RoutingConfig {
    /// OSRM base URL (without trailing slash)
    #[serde(default = "default_osrm_url")]
    pub osrm_url: String,
    /// When false every route is a straight-line fallback
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Minimum spacing between kept waypoints (meters)
    #[serde(default = "default_min_waypoint_distance")]
    pub min_waypoint_distance_m: f64,
    #[serde(default = "default_walking_speed")]
    pub walking_speed_mps: f64,
    #[serde(default = "default_driving_speed")]
    pub driving_speed_mps: f64,
}

fn default_osrm_url() -> String {
    "http://router.project-osrm.org".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_min_waypoint_distance() -> f64 {
    50.0
}

fn default_walking_speed() -> f64 {
    1.4
}

fn default_driving_speed() -> f64 {
    8.0
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            osrm_url: default_osrm_url(),
            enabled: true,
            timeout_ms: default_timeout_ms(),
            min_waypoint_distance_m: default_min_waypoint_distance(),
            walking_speed_mps: default_walking_speed(),
            driving_speed_mps: default_driving_speed(),
        }
    }
}

/// Fire model coefficients
#[derive(Debug, Clone, Deserialize)]
pub struct HazardConfig {
    /// Intensity gained per second while unsuppressed
    #[serde(default = "default_growth_rate")]
    pub growth_rate: f64,
    /// Intensity lost per second at full suppression effort
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f64,
    /// Lower bound on the suppression effort factor used for decay
    #[serde(default = "default_min_suppression_factor")]
    pub min_suppression_factor: f64,
    #[serde(default = "default_radius_cap")]
    pub radius_cap_m: f64,
    #[serde(default = "default_suppression_range")]
    pub suppression_range_m: f64,
    #[serde(default = "default_extinguish_threshold")]
    pub extinguish_threshold: f64,
    /// Intensity at or below which a fire is removed
    #[serde(default = "default_removal_epsilon")]
    pub removal_epsilon: f64,
}

fn default_growth_rate() -> f64 {
    0.01
}

fn default_decay_rate() -> f64 {
    0.02
}

fn default_min_suppression_factor() -> f64 {
    0.1
}

fn default_radius_cap() -> f64 {
    100.0
}

fn default_suppression_range() -> f64 {
    45.0
}

fn default_extinguish_threshold() -> f64 {
    0.05
}

fn default_removal_epsilon() -> f64 {
    1e-6
}

impl Default for HazardConfig {
    fn default() -> Self {
        Self {
            growth_rate: default_growth_rate(),
            decay_rate: default_decay_rate(),
            min_suppression_factor: default_min_suppression_factor(),
            radius_cap_m: default_radius_cap(),
            suppression_range_m: default_suppression_range(),
            extinguish_threshold: default_extinguish_threshold(),
            removal_epsilon: default_removal_epsilon(),
        }
    }
}

/// Vision query defaults
#[derive(Debug, Clone, Deserialize)]
pub struct VisionConfig {
    #[serde(default = "default_vision_range")]
    pub default_range_m: f64,
    /// Locations are visible out to `range * location_range_factor`
    #[serde(default = "default_location_range_factor")]
    pub location_range_factor: f64,
}

fn default_vision_range() -> f64 {
    50.0
}

fn default_location_range_factor() -> f64 {
    2.0
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            default_range_m: default_vision_range(),
            location_range_factor: default_location_range_factor(),
        }
    }
}

/// Downtown Dallas reference locations
pub fn default_locations() -> Vec<Location> {
    let loc = |id: &str, name: &str, kind: LocationKind, lat: f64, lon: f64| Location {
        id: id.to_string(),
        name: name.to_string(),
        kind,
        position: Position::new(lat, lon),
    };

    vec![
        loc("exit_main", "Main Street Exit", LocationKind::Exit, 32.7830, -96.7850),
        loc("exit_north", "North Plaza Exit", LocationKind::Exit, 32.7868, -96.7990),
        loc("staging_alpha", "Staging Area Alpha", LocationKind::StagingArea, 32.7800, -96.7900),
        loc("hospital_baylor", "Baylor Medical", LocationKind::Hospital, 32.7896, -96.7810),
        loc("fire_station_18", "Fire Station 18", LocationKind::FireStation, 32.7810, -96.7960),
        loc("police_hq", "Police Headquarters", LocationKind::PoliceStation, 32.7765, -96.8000),
    ]
}

impl Default for EmberConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            routing: RoutingConfig::default(),
            hazard: HazardConfig::default(),
            vision: VisionConfig::default(),
            nats: NatsConfig::default(),
            api: ApiConfig::default(),
            locations: default_locations(),
        }
    }
}

impl EmberConfig {
    /// Load from `EMBER_CONFIG` (if set and present), then apply env overrides.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var("EMBER_CONFIG") {
            Ok(path) if Path::new(&path).exists() => {
                info!(path = %path, "Loading configuration file");
                load_config(&path)?
            }
            Ok(path) => {
                warn!(path = %path, "Configuration file not found, using defaults");
                Self::default()
            }
            Err(_) => Self::default(),
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Override selected fields from env vars; unparsable values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("EMBER_TICK_HZ") {
            if let Ok(n) = v.parse::<f64>() {
                self.simulation.tick_hz = n;
            }
        }
        if let Ok(v) = std::env::var("EMBER_BATCH_HZ") {
            if let Ok(n) = v.parse::<f64>() {
                self.simulation.batch_hz = n;
            }
        }
        if let Ok(v) = std::env::var("EMBER_STATIONARY_HZ") {
            if let Ok(n) = v.parse::<f64>() {
                self.simulation.stationary_hz = n;
            }
        }
        if let Ok(v) = std::env::var("EMBER_OSRM_URL") {
            self.routing.osrm_url = v;
        }
        if let Ok(v) = std::env::var("EMBER_API_BIND") {
            self.api.bind = v;
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<EmberConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path))?;
    let config: EmberConfig =
        toml::from_str(&contents).context("Failed to parse config TOML")?;
    Ok(config)
}
