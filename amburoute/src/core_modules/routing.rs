// THEORY:
// Route advice is a capability, not part of the signal decision. The controller
// can ask two questions about an ambulance it knows the position of:
//
// 1.  **Proximity**: is the ambulance close enough to the signal to matter?
// 2.  **Fastest route**: how long and how far is the drive to a destination?
//
// Both are answered by a `RouteAdvisor`. `StubRouteAdvisor` gives fixed answers
// and is the default when no mapping credentials are configured.
// `MapsRouteAdvisor` asks the Google Maps Distance Matrix and Directions web
// services over HTTP.

use crate::core_modules::gps_store::GeoPoint;
use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::time::Duration;

/// Example traffic signal location (Times Square, New York).
pub const DEFAULT_SIGNAL_LOCATION: GeoPoint = GeoPoint::new(40.758896, -73.985130);
/// Driving distance under which an ambulance counts as near the signal.
pub const DEFAULT_NEAR_THRESHOLD_M: f64 = 200.0;
pub const DEFAULT_MAPS_BASE_URL: &str = "https://maps.googleapis.com/maps/api";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A human-readable travel estimate, e.g. `("5 mins", "2 km")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEstimate {
    pub duration: String,
    pub distance: String,
}

impl RouteEstimate {
    pub fn new(duration: impl Into<String>, distance: impl Into<String>) -> Self {
        Self {
            duration: duration.into(),
            distance: distance.into(),
        }
    }
}

/// Proximity and routing questions about an ambulance position.
pub trait RouteAdvisor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether an ambulance at `ambulance` is near the traffic signal.
    fn is_near(&self, ambulance: GeoPoint) -> Result<bool>;

    /// Duration and distance of the fastest driving route from `from` to `to`.
    fn fastest_route(&self, from: GeoPoint, to: GeoPoint) -> Result<RouteEstimate>;
}

/// Fixed answers: never near, always five minutes and two kilometres away.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubRouteAdvisor;

impl RouteAdvisor for StubRouteAdvisor {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn is_near(&self, _ambulance: GeoPoint) -> Result<bool> {
        Ok(false)
    }

    fn fastest_route(&self, _from: GeoPoint, _to: GeoPoint) -> Result<RouteEstimate> {
        Ok(RouteEstimate::new("5 mins", "2 km"))
    }
}

/// Settings for the Google Maps backed advisor.
#[derive(Debug, Clone)]
pub struct MapsConfig {
    pub api_key: String,
    pub signal_location: GeoPoint,
    pub near_threshold_m: f64,
    pub base_url: String,
}

impl MapsConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            signal_location: DEFAULT_SIGNAL_LOCATION,
            near_threshold_m: DEFAULT_NEAR_THRESHOLD_M,
            base_url: DEFAULT_MAPS_BASE_URL.to_string(),
        }
    }
}

/// Route advisor backed by the Google Maps web services (driving mode).
pub struct MapsRouteAdvisor {
    config: MapsConfig,
    agent: ureq::Agent,
}

impl MapsRouteAdvisor {
    pub fn new(config: MapsConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Self { config, agent }
    }

    pub fn config(&self) -> &MapsConfig {
        &self.config
    }

    fn driving_distance_m(&self, origin: GeoPoint, destination: GeoPoint) -> Result<f64> {
        let url = format!("{}/distancematrix/json", self.config.base_url);
        let response: DistanceMatrixResponse = self
            .agent
            .get(&url)
            .query("origins", &origin.to_string())
            .query("destinations", &destination.to_string())
            .query("mode", "driving")
            .query("key", &self.config.api_key)
            .call()
            .context("distance matrix request failed")?
            .into_json()
            .context("distance matrix response was not valid JSON")?;
        response.first_distance_m()
    }
}

impl RouteAdvisor for MapsRouteAdvisor {
    fn name(&self) -> &'static str {
        "google-maps"
    }

    fn is_near(&self, ambulance: GeoPoint) -> Result<bool> {
        let meters = self.driving_distance_m(ambulance, self.config.signal_location)?;
        log::debug!("ambulance at {} is {:.0} m from the signal", ambulance, meters);
        Ok(meters < self.config.near_threshold_m)
    }

    fn fastest_route(&self, from: GeoPoint, to: GeoPoint) -> Result<RouteEstimate> {
        let url = format!("{}/directions/json", self.config.base_url);
        let response: DirectionsResponse = self
            .agent
            .get(&url)
            .query("origin", &from.to_string())
            .query("destination", &to.to_string())
            .query("mode", "driving")
            .query("alternatives", "true")
            .query("key", &self.config.api_key)
            .call()
            .context("directions request failed")?
            .into_json()
            .context("directions response was not valid JSON")?;
        response.first_leg()
    }
}

#[derive(Debug, Deserialize)]
struct TextValue {
    text: String,
    value: f64,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixResponse {
    status: String,
    #[serde(default)]
    rows: Vec<DistanceMatrixRow>,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixRow {
    elements: Vec<DistanceMatrixElement>,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixElement {
    status: String,
    distance: Option<TextValue>,
}

impl DistanceMatrixResponse {
    fn first_distance_m(&self) -> Result<f64> {
        if self.status != "OK" {
            return Err(anyhow!("distance matrix status {}", self.status));
        }
        let element = self
            .rows
            .first()
            .and_then(|row| row.elements.first())
            .ok_or_else(|| anyhow!("distance matrix returned no elements"))?;
        if element.status != "OK" {
            return Err(anyhow!("distance matrix element status {}", element.status));
        }
        element
            .distance
            .as_ref()
            .map(|d| d.value)
            .ok_or_else(|| anyhow!("distance matrix element has no distance"))
    }
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    legs: Vec<DirectionsLeg>,
}

#[derive(Debug, Deserialize)]
struct DirectionsLeg {
    duration: TextValue,
    distance: TextValue,
}

impl DirectionsResponse {
    fn first_leg(&self) -> Result<RouteEstimate> {
        if self.status != "OK" {
            return Err(anyhow!("directions status {}", self.status));
        }
        let leg = self
            .routes
            .first()
            .and_then(|route| route.legs.first())
            .ok_or_else(|| anyhow!("directions returned no route"))?;
        Ok(RouteEstimate::new(&leg.duration.text, &leg.distance.text))
    }
}
