//! Nearby police stations from OpenStreetMap via the Overpass API.
//!
//! [`StationFinder::find_nearby`] searches 10 km around the user and, only if
//! that comes back empty, widens once to 30 km. Results are sorted nearest
//! first; equal distances keep the order Overpass returned them in.

use crate::api::json_or_error;
use crate::error::GuardianError;
use crate::models::{Coordinate, OverpassElement, OverpassResponse, PoliceStation};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use tracing::{error, info};

pub const PRIMARY_RADIUS_M: u32 = 10_000;
pub const WIDER_RADIUS_M: u32 = 30_000;

const DEFAULT_NAME: &str = "Police Station";
const DEFAULT_ADDRESS: &str = "Address not available";

#[async_trait]
pub trait PoiSource: Send + Sync {
    async fn police_within(&self, center: Coordinate, radius_m: u32) -> Result<Vec<OverpassElement>, GuardianError>;
}

pub fn police_query(center: Coordinate, radius_m: u32) -> String {
    let around = format!("around:{},{},{}", radius_m, center.lat, center.lng);
    format!(
        "[out:json];(node[\"amenity\"=\"police\"]({around});way[\"amenity\"=\"police\"]({around}););out center;"
    )
}

pub struct OverpassClient {
    client: Client,
    base_url: String,
}

impl OverpassClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl PoiSource for OverpassClient {
    async fn police_within(&self, center: Coordinate, radius_m: u32) -> Result<Vec<OverpassElement>, GuardianError> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("data", police_query(center, radius_m))])
            .send()
            .await?;
        let body: OverpassResponse = json_or_error(resp).await?;
        Ok(body.elements)
    }
}

pub struct StationFinder {
    source: Arc<dyn PoiSource>,
}

impl StationFinder {
    pub fn new(source: Arc<dyn PoiSource>) -> Self {
        Self { source }
    }

    /// Never fails; a broken fetch is logged and reads as "no stations".
    pub async fn find_nearby(&self, center: Coordinate) -> Vec<PoliceStation> {
        match self.search(center).await {
            Ok(stations) => {
                info!("Found {} police stations near ({}, {})", stations.len(), center.lat, center.lng);
                stations
            }
            Err(e) => {
                error!("Error fetching police stations: {}", e);
                Vec::new()
            }
        }
    }

    async fn search(&self, center: Coordinate) -> Result<Vec<PoliceStation>, GuardianError> {
        let mut elements = self.source.police_within(center, PRIMARY_RADIUS_M).await?;
        if elements.is_empty() {
            info!("No stations within {}m, widening to {}m", PRIMARY_RADIUS_M, WIDER_RADIUS_M);
            elements = self.source.police_within(center, WIDER_RADIUS_M).await?;
        }
        Ok(rank_stations(center, elements))
    }
}

/// Converts raw elements into stations sorted by distance from `center`.
pub fn rank_stations(center: Coordinate, elements: Vec<OverpassElement>) -> Vec<PoliceStation> {
    let mut stations: Vec<PoliceStation> = elements
        .into_iter()
        .filter_map(|element| {
            let location = element.coordinate()?;
            Some(PoliceStation {
                name: element.tags.name.unwrap_or_else(|| DEFAULT_NAME.to_string()),
                address: element.tags.addr_full.unwrap_or_else(|| DEFAULT_ADDRESS.to_string()),
                distance_km: center.distance_km(&location),
                location,
            })
        })
        .collect();
    // sort_by is stable
    stations.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    stations
}
