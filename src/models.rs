use serde::{Deserialize, Serialize};
use std::fmt;

/// A WGS84 position, optionally with the reported accuracy in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            accuracy: None,
        }
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    /// Great-circle distance to `other` in kilometres.
    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        crate::geo::haversine_distance(self.lat, self.lng, other.lat, other.lng)
    }
}

/// Resolved address text for the current coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationDetails {
    pub full_address: String,
}

impl Default for LocationDetails {
    fn default() -> Self {
        Self {
            full_address: "Loading...".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Parent,
    Daughter,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Parent => "parent",
            Role::Daughter => "daughter",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The onboarding profile, stored locally and registered with the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub role: Role,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoliceStation {
    pub name: String,
    pub address: String,
    pub location: Coordinate,
    /// Distance from the query point in kilometres.
    pub distance_km: f64,
}

impl PoliceStation {
    pub fn distance_m(&self) -> f64 {
        self.distance_km * 1000.0
    }
}

// Reverse geocoding response; only the display name is consumed.
#[derive(Debug, Deserialize)]
pub struct NominatimResponse {
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<OverpassElement>,
}

/// A node carries `lat`/`lon` directly; a way carries a `center`.
#[derive(Debug, Clone, Deserialize)]
pub struct OverpassElement {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub center: Option<OverpassCenter>,
    #[serde(default)]
    pub tags: OverpassTags,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct OverpassCenter {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverpassTags {
    pub name: Option<String>,
    #[serde(rename = "addr:full")]
    pub addr_full: Option<String>,
}

impl OverpassElement {
    pub fn coordinate(&self) -> Option<Coordinate> {
        match (self.lat, self.lon, self.center) {
            (Some(lat), Some(lon), _) => Some(Coordinate::new(lat, lon)),
            (_, _, Some(c)) => Some(Coordinate::new(c.lat, c.lon)),
            _ => None,
        }
    }
}
