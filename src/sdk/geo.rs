use serde::{Deserialize, Serialize};
use std::fmt;

/// Miles per degree of latitude.
pub const MILES_PER_DEG_LAT: f64 = 69.0;
/// Miles per degree of longitude at mid latitudes.
pub const MILES_PER_DEG_LON: f64 = 54.6;

const METERS_PER_MILE: f64 = 1609.344;

/// A WGS84 position in degrees.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Planar distance in miles. Only meaningful over a few tens of miles.
    pub fn approx_miles_to(&self, other: &Coordinate) -> f64 {
        let dx = (other.latitude - self.latitude) * MILES_PER_DEG_LAT;
        let dy = (other.longitude - self.longitude) * MILES_PER_DEG_LON;
        dx.hypot(dy)
    }

    pub fn approx_meters_to(&self, other: &Coordinate) -> f64 {
        self.approx_miles_to(other) * METERS_PER_MILE
    }

    /// Inclusive: a point exactly `radius_miles` away is in range.
    pub fn is_within(&self, other: &Coordinate, radius_miles: f64) -> bool {
        self.approx_miles_to(other) <= radius_miles
    }

    pub fn offset(&self, d_lat: f64, d_lon: f64) -> Self {
        Self::new(self.latitude + d_lat, self.longitude + d_lon)
    }
}

/// `lat,lng` form expected by query strings.
impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_uses_planar_scale_factors() {
        let origin = Coordinate::new(47.610, -122.335);
        let north = origin.offset(1.0, 0.0);
        let east = origin.offset(0.0, 1.0);
        assert!((origin.approx_miles_to(&north) - 69.0).abs() < 1e-9);
        assert!((origin.approx_miles_to(&east) - 54.6).abs() < 1e-9);
    }

    #[test]
    fn boundary_is_in_range() {
        let origin = Coordinate::new(0.0, 0.0);
        let edge = Coordinate::new(0.5, 0.0);
        assert!(origin.is_within(&edge, 34.5));
        assert!(!origin.is_within(&edge, 34.499));
    }

    #[test]
    fn mock_aircraft_offset_is_inside_default_radius() {
        let origin = Coordinate::new(47.610, -122.335);
        let unit = origin.offset(0.04, 0.01);
        let miles = origin.approx_miles_to(&unit);
        assert!(miles > 2.8 && miles < 2.82, "got {miles}");
        assert!(origin.is_within(&unit, 7.5));
    }

    #[test]
    fn displays_as_lat_lng_pair() {
        assert_eq!(Coordinate::new(47.61, -122.335).to_string(), "47.61,-122.335");
    }
}
