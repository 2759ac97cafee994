//! Layer model behind the map panel.
//!
//! [`MapView`] owns every overlay drawn on the map. Whenever the user
//! position, the tile style or the contact position changes the whole layer
//! list is torn down and rebuilt, and the generation counter moves on. Async
//! additions (nearest station, routes) carry the generation they were
//! requested under and are dropped if the view has been rebuilt since.

use crate::geo::METERS_PER_DEGREE;
use crate::models::{Coordinate, PoliceStation};
use crate::routing::Route;
use tracing::debug;

const MIN_SPAN_DEG: f64 = 0.03;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapStyle {
    #[default]
    Street,
    Satellite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSource {
    pub attribution: &'static str,
    pub max_zoom: u8,
}

impl MapStyle {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "street" => Some(MapStyle::Street),
            "satellite" => Some(MapStyle::Satellite),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            MapStyle::Street => MapStyle::Satellite,
            MapStyle::Satellite => MapStyle::Street,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MapStyle::Street => "Street",
            MapStyle::Satellite => "Satellite",
        }
    }

    pub fn tiles(&self) -> TileSource {
        match self {
            MapStyle::Street => TileSource {
                attribution: "© OpenStreetMap contributors",
                max_zoom: 19,
            },
            MapStyle::Satellite => TileSource {
                attribution: "© Esri",
                max_zoom: 19,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    User,
    Contact,
    Station,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneKind {
    Risk,
    Safe,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zone {
    pub kind: ZoneKind,
    pub center: Coordinate,
    pub radius_m: f64,
}

impl Zone {
    pub fn radius_deg(&self) -> f64 {
        self.radius_m / METERS_PER_DEGREE
    }
}

/// Illustrative overlays at fixed offsets from the user. Not hazard data.
pub fn decorative_zones(user: Coordinate) -> [Zone; 4] {
    let at = |dlat: f64, dlng: f64| Coordinate::new(user.lat + dlat, user.lng + dlng);
    [
        Zone {
            kind: ZoneKind::Risk,
            center: at(0.01, 0.01),
            radius_m: 500.0,
        },
        Zone {
            kind: ZoneKind::Risk,
            center: at(-0.01, -0.01),
            radius_m: 300.0,
        },
        Zone {
            kind: ZoneKind::Safe,
            center: at(0.005, 0.005),
            radius_m: 400.0,
        },
        Zone {
            kind: ZoneKind::Safe,
            center: at(-0.005, -0.005),
            radius_m: 600.0,
        },
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteTarget {
    Contact,
    Station,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    Tiles(TileSource),
    Marker {
        kind: MarkerKind,
        at: Coordinate,
        label: String,
    },
    Zone(Zone),
    Route {
        target: RouteTarget,
        route: Route,
    },
}

#[derive(Debug, Default)]
pub struct MapView {
    style: MapStyle,
    generation: u64,
    center: Option<Coordinate>,
    layers: Vec<Layer>,
}

impl MapView {
    pub fn new(style: MapStyle) -> Self {
        Self {
            style,
            ..Default::default()
        }
    }

    pub fn style(&self) -> MapStyle {
        self.style
    }

    pub fn set_style(&mut self, style: MapStyle) {
        self.style = style;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Drops every layer and redraws the synchronous ones from scratch.
    /// Returns the generation that pending additions must quote.
    pub fn rebuild(&mut self, user: Coordinate, contact: Option<Coordinate>) -> u64 {
        self.generation += 1;
        self.layers.clear();
        self.center = Some(user);

        self.layers.push(Layer::Tiles(self.style.tiles()));
        self.layers.push(Layer::Marker {
            kind: MarkerKind::User,
            at: user,
            label: format!("Your Location {:.6}, {:.6}", user.lat, user.lng),
        });
        if let Some(contact) = contact {
            self.layers.push(Layer::Marker {
                kind: MarkerKind::Contact,
                at: contact,
                label: format!("Daughter's Location {:.6}, {:.6}", contact.lat, contact.lng),
            });
        }
        self.layers
            .extend(decorative_zones(user).into_iter().map(Layer::Zone));

        debug!(generation = self.generation, layers = self.layers.len(), "map rebuilt");
        self.generation
    }

    pub fn add_station(&mut self, generation: u64, station: &PoliceStation) -> bool {
        if generation != self.generation {
            return false;
        }
        self.layers.retain(|l| !matches!(l, Layer::Marker { kind: MarkerKind::Station, .. }));
        self.layers.push(Layer::Marker {
            kind: MarkerKind::Station,
            at: station.location,
            label: station.name.clone(),
        });
        true
    }

    /// One route per target; a newer one for the same target replaces it.
    pub fn apply_route(&mut self, generation: u64, target: RouteTarget, route: Route) -> bool {
        if generation != self.generation {
            debug!(generation, current = self.generation, "dropping stale route");
            return false;
        }
        self.layers
            .retain(|l| !matches!(l, Layer::Route { target: t, .. } if *t == target));
        self.layers.push(Layer::Route { target, route });
        true
    }

    pub fn markers(&self) -> impl Iterator<Item = (MarkerKind, Coordinate, &str)> {
        self.layers.iter().filter_map(|l| match l {
            Layer::Marker { kind, at, label } => Some((*kind, *at, label.as_str())),
            _ => None,
        })
    }

    pub fn zones(&self) -> impl Iterator<Item = &Zone> {
        self.layers.iter().filter_map(|l| match l {
            Layer::Zone(z) => Some(z),
            _ => None,
        })
    }

    pub fn routes(&self) -> impl Iterator<Item = (RouteTarget, &Route)> {
        self.layers.iter().filter_map(|l| match l {
            Layer::Route { target, route } => Some((*target, route)),
            _ => None,
        })
    }

    /// Longitude and latitude bounds that keep every marker and route in view.
    pub fn bounds(&self) -> Option<([f64; 2], [f64; 2])> {
        let center = self.center?;
        let points = self
            .markers()
            .map(|(_, at, _)| at)
            .chain(self.routes().flat_map(|(_, r)| r.path.iter().copied()));

        let (mut min_lat, mut max_lat, mut min_lng, mut max_lng) = (center.lat, center.lat, center.lng, center.lng);
        for p in points {
            min_lat = min_lat.min(p.lat);
            max_lat = max_lat.max(p.lat);
            min_lng = min_lng.min(p.lng);
            max_lng = max_lng.max(p.lng);
        }

        let span = (max_lat - min_lat).max(max_lng - min_lng).max(MIN_SPAN_DEG) * 1.2;
        let mid_lat = (min_lat + max_lat) / 2.0;
        let mid_lng = (min_lng + max_lng) / 2.0;
        Some((
            [mid_lng - span / 2.0, mid_lng + span / 2.0],
            [mid_lat - span / 2.0, mid_lat + span / 2.0],
        ))
    }
}
