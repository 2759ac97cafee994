pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Metres per degree of latitude, used to size map overlays.
pub const METERS_PER_DEGREE: f64 = 111_320.0;

pub const WALK_KMH: f64 = 5.0;
pub const BIKE_KMH: f64 = 15.0;
pub const BUS_KMH: f64 = 30.0;
pub const CAR_KMH: f64 = 40.0;

pub fn haversine_distance(latitude_1: f64, longitude_1: f64, latitude_2: f64, longitude_2: f64) -> f64 {
    let lat1_rad = latitude_1.to_radians();
    let lon1_rad = longitude_1.to_radians();
    let lat2_rad = latitude_2.to_radians();
    let lon2_rad = longitude_2.to_radians();

    let dlat = lat2_rad - lat1_rad;
    let dlon = lon2_rad - lon1_rad;

    let a = (dlat / 2.0).sin().powi(2) + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Estimated minutes to cover a distance at fixed average speeds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TravelTimes {
    pub walk: f64,
    pub bike: f64,
    pub bus: f64,
    pub car: f64,
}

impl TravelTimes {
    pub fn for_distance(distance_km: f64) -> Self {
        let minutes = |kmh: f64| distance_km / kmh * 60.0;
        Self {
            walk: minutes(WALK_KMH),
            bike: minutes(BIKE_KMH),
            bus: minutes(BUS_KMH),
            car: minutes(CAR_KMH),
        }
    }

    pub fn entries(&self) -> [(&'static str, f64); 4] {
        [
            ("Walk", self.walk),
            ("Bike", self.bike),
            ("Bus", self.bus),
            ("Car", self.car),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_kilometres() {
        let t = TravelTimes::for_distance(2.0);
        assert!((t.walk - 24.0).abs() < 1e-9);
        assert!((t.bike - 8.0).abs() < 1e-9);
        assert!((t.bus - 4.0).abs() < 1e-9);
        assert!((t.car - 3.0).abs() < 1e-9);
    }

    #[test]
    fn zero_distance_is_zero_minutes() {
        let t = TravelTimes::for_distance(0.0);
        assert!(t.entries().iter().all(|(_, m)| *m == 0.0));
    }

    #[test]
    fn one_degree_of_latitude() {
        let d = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111.19).abs() < 0.01, "got {d}");
    }

    #[test]
    fn distance_is_symmetric() {
        let a = haversine_distance(28.61, 77.20, 19.07, 72.87);
        let b = haversine_distance(19.07, 72.87, 28.61, 77.20);
        assert!((a - b).abs() < 1e-9);
    }
}
