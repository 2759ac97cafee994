use crate::api::json_or_error;
use crate::error::GuardianError;
use crate::models::Coordinate;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

/// A drivable path between two waypoints.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub path: Vec<Coordinate>,
    pub distance_m: f64,
    pub duration_s: f64,
}

#[async_trait]
pub trait RouteProvider: Send + Sync {
    async fn route(&self, from: Coordinate, to: Coordinate) -> Result<Route, GuardianError>;
}

#[derive(Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
    distance: f64,
    duration: f64,
}

// GeoJSON LineString, positions are [lon, lat]
#[derive(Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}

pub struct OsrmRouter {
    client: Client,
    base_url: String,
}

impl OsrmRouter {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn route_url(&self, from: Coordinate, to: Coordinate) -> String {
        format!(
            "{}/driving/{},{};{},{}?overview=full&geometries=geojson",
            self.base_url, from.lng, from.lat, to.lng, to.lat
        )
    }
}

#[async_trait]
impl RouteProvider for OsrmRouter {
    async fn route(&self, from: Coordinate, to: Coordinate) -> Result<Route, GuardianError> {
        let resp = self.client.get(self.route_url(from, to)).send().await?;
        let body: OsrmResponse = json_or_error(resp).await?;
        parse_route(body)
    }
}

fn parse_route(body: OsrmResponse) -> Result<Route, GuardianError> {
    if body.code != "Ok" {
        return Err(GuardianError::NotFound(format!("route ({})", body.code)));
    }
    let best = body
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| GuardianError::NotFound("route".to_string()))?;
    Ok(Route {
        path: best
            .geometry
            .coordinates
            .into_iter()
            .map(|[lon, lat]| Coordinate::new(lat, lon))
            .collect(),
        distance_m: best.distance,
        duration_s: best.duration,
    })
}
