use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{RawRoute, RawStep, RouteProvider, TravelProfile};
use crate::geo::Position;

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    #[serde(default)]
    geometry: Option<String>,
    #[serde(default)]
    legs: Vec<OsrmLeg>,
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    #[serde(default)]
    steps: Vec<OsrmStep>,
}

#[derive(Debug, Deserialize)]
struct OsrmStep {
    #[serde(default)]
    geometry: Option<String>,
    duration: f64,
}

/// HTTP client for an OSRM `route` service.
///
/// Requests full overview geometry plus per-step geometry, polyline encoded
/// at precision 5.
pub struct OsrmClient {
    http_client: Client,
    base_url: String,
}

impl OsrmClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent("ember-world/1.0")
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn route_url(&self, from: Position, to: Position, profile: TravelProfile) -> String {
        format!(
            "{}/route/v1/{}/{:.6},{:.6};{:.6},{:.6}?overview=full&geometries=polyline&steps=true",
            self.base_url,
            profile.osrm_profile(),
            from.lon,
            from.lat,
            to.lon,
            to.lat
        )
    }
}

#[async_trait]
impl RouteProvider for OsrmClient {
    async fn fetch_route(
        &self,
        from: Position,
        to: Position,
        profile: TravelProfile,
    ) -> Result<RawRoute> {
        let url = self.route_url(from, to, profile);
        debug!(url = %url, "Requesting OSRM route");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .context("Failed to send OSRM route request")?;

        let status = response.status();
        if !status.is_success() {
            bail!("OSRM returned HTTP {}", status);
        }

        let body: OsrmResponse = response
            .json()
            .await
            .context("Failed to parse OSRM response")?;

        if body.code != "Ok" {
            bail!(
                "OSRM error {}: {}",
                body.code,
                body.message.unwrap_or_default()
            );
        }

        let route = body
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("OSRM returned no routes"))?;

        let steps = route
            .legs
            .into_iter()
            .flat_map(|leg| leg.steps)
            .filter_map(|step| {
                step.geometry.map(|geometry| RawStep {
                    geometry,
                    duration: step.duration,
                })
            })
            .collect();

        Ok(RawRoute {
            distance: route.distance,
            duration: route.duration,
            geometry: route.geometry,
            steps,
            precision: 5,
        })
    }
}
