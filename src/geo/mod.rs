// Geodesy helpers shared by routing, movement and vision queries.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};


/// Mean Earth radius used by the haversine formula (meters)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Geographic coordinate in decimal degrees (WGS84)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

impl Position {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// True when both coordinates are finite and within WGS84 bounds
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Great-circle distance between two positions in meters (haversine)
pub fn distance(a: Position, b: Position) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lon - a.lon).to_radians();

    let h = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Initial compass bearing from `a` to `b` in degrees, normalized to [0, 360).
///
/// Returns 0 when the two positions coincide.
pub fn bearing(a: Position, b: Position) -> f64 {
    if a == b {
        return 0.0;
    }

    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_lambda = (b.lon - a.lon).to_radians();

    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();

    let deg = y.atan2(x).to_degrees();
    let normalized = (deg + 360.0) % 360.0;
    // (-0.0 + 360) % 360 can land exactly on 360 through rounding
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}

/// Linear interpolation of lat/lon between two positions, `t` in [0, 1]
pub fn interpolate(a: Position, b: Position, t: f64) -> Position {
    Position {
        lat: a.lat + (b.lat - a.lat) * t,
        lon: a.lon + (b.lon - a.lon) * t,
    }
}

/// Per-segment lengths of a path (length = points.len() - 1)
pub fn segment_lengths(points: &[Position]) -> Vec<f64> {
    points.windows(2).map(|w| distance(w[0], w[1])).collect()
}

/// Total length of a path in meters
pub fn path_length(points: &[Position]) -> f64 {
    segment_lengths(points).iter().sum()
}

/// Decode an encoded polyline (Google / OSRM polyline algorithm).
///
/// `precision` is the number of decimal digits encoded (5 for Google and
/// OSRM `polyline`, 6 for `polyline6`). Values are signed deltas stored as
/// 5-bit little-endian chunks offset by 63, sign in the least significant bit.
pub fn decode_polyline(encoded: &str, precision: u32) -> Result<Vec<Position>> {
    let factor = 10f64.powi(precision as i32);
    let bytes = encoded.as_bytes();

    let mut points = Vec::new();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lon: i64 = 0;

    while index < bytes.len() {
        let (Some(next_lat), Some(next_lon)) = (
            lat.checked_add(next_value(bytes, &mut index)?),
            lon.checked_add(next_value(bytes, &mut index)?),
        ) else {
            bail!("polyline coordinate overflows at byte {}", index);
        };
        lat = next_lat;
        lon = next_lon;
        points.push(Position {
            lat: lat as f64 / factor,
            lon: lon as f64 / factor,
        });
    }

    Ok(points)
}

fn next_value(bytes: &[u8], index: &mut usize) -> Result<i64> {
    let mut result: i64 = 0;
    let mut shift = 0;

    loop {
        let Some(&byte) = bytes.get(*index) else {
            bail!("truncated polyline at byte {}", *index);
        };
        if !(63..=126).contains(&byte) {
            bail!("invalid polyline character {:?} at byte {}", byte as char, *index);
        }
        *index += 1;

        let chunk = (byte - 63) as i64;
        result |= (chunk & 0x1f) << shift;
        shift += 5;

        if chunk < 0x20 {
            break;
        }
        if shift > 60 {
            bail!("polyline value overflows 64 bits at byte {}", *index);
        }
    }

    Ok(if result & 1 != 0 {
        !(result >> 1)
    } else {
        result >> 1
    })
}

/// Thin a path so consecutive kept points are at least `min_distance` meters apart.
///
/// The first and last points are always kept; an interior point is kept only
/// if it is at least `min_distance` from the last kept point.
pub fn simplify_waypoints(points: &[Position], min_distance: f64) -> Vec<Position> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let mut kept = Vec::with_capacity(points.len());
    kept.push(points[0]);

    for point in &points[1..points.len() - 1] {
        let last = kept[kept.len() - 1];
        if distance(last, *point) >= min_distance {
            kept.push(*point);
        }
    }

    kept.push(points[points.len() - 1]);
    kept
}
