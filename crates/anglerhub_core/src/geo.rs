//! crates/anglerhub_core/src/geo.rs
//!
//! Distance helpers used by the nearby-catch search and the client's
//! location display.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Approximate length of one degree of latitude in kilometres.
const KM_PER_DEGREE: f64 = 111.0;

/// Default horizontal accuracy (metres) considered good enough to log a catch.
pub const DEFAULT_ACCURACY_THRESHOLD_M: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Great-circle distance between two points using the haversine formula.
pub fn haversine_km(from: Coordinates, to: Coordinates) -> f64 {
    let lat_diff = (to.latitude - from.latitude).to_radians();
    let lon_diff = (to.longitude - from.longitude).to_radians();

    let a = (lat_diff / 2.0).sin().powi(2)
        + from.latitude.to_radians().cos()
            * to.latitude.to_radians().cos()
            * (lon_diff / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// A latitude/longitude rectangle used as a cheap prefilter before the exact
/// haversine check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl BoundingBox {
    pub fn around(center: Coordinates, radius_km: f64) -> Self {
        let lat_range = radius_km / KM_PER_DEGREE;
        let cos_lat = center.latitude.to_radians().cos();
        // Near the poles the longitude span degenerates; take the whole circle.
        let lon_range = if cos_lat.abs() < 1e-6 {
            180.0
        } else {
            (radius_km / (KM_PER_DEGREE * cos_lat)).abs().min(180.0)
        };

        let (mut min_longitude, mut max_longitude) =
            (center.longitude - lon_range, center.longitude + lon_range);
        // A box crossing the antimeridian is not one longitude interval.
        if min_longitude < -180.0 || max_longitude > 180.0 {
            (min_longitude, max_longitude) = (-180.0, 180.0);
        }

        Self {
            min_latitude: center.latitude - lat_range,
            max_latitude: center.latitude + lat_range,
            min_longitude,
            max_longitude,
        }
    }

    pub fn contains(&self, point: Coordinates) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&point.latitude)
            && (self.min_longitude..=self.max_longitude).contains(&point.longitude)
    }
}

/// Formats a position as `"41.878100°N, 87.629800°W"`.
pub fn format_coordinates(point: Coordinates, precision: usize) -> String {
    let lat_dir = if point.latitude >= 0.0 { 'N' } else { 'S' };
    let lon_dir = if point.longitude >= 0.0 { 'E' } else { 'W' };
    format!(
        "{:.precision$}°{lat_dir}, {:.precision$}°{lon_dir}",
        point.latitude.abs(),
        point.longitude.abs(),
    )
}

pub fn is_accurate_enough(accuracy_m: f64, threshold_m: f64) -> bool {
    accuracy_m <= threshold_m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_self_is_zero() {
        let p = Coordinates::new(45.5, -122.6);
        assert!(haversine_km(p, p).abs() < 1e-9);
    }

    #[test]
    fn london_to_paris() {
        let london = Coordinates::new(51.5074, -0.1278);
        let paris = Coordinates::new(48.8566, 2.3522);
        let d = haversine_km(london, paris);
        assert!((d - 343.5).abs() < 1.5, "got {d}");
    }

    #[test]
    fn bounding_box_contains_points_within_radius() {
        let center = Coordinates::new(44.0, -93.0);
        let bbox = BoundingBox::around(center, 10.0);
        assert!(bbox.contains(Coordinates::new(44.05, -93.05)));
        assert!(!bbox.contains(Coordinates::new(44.2, -93.0)));
    }

    #[test]
    fn bounding_box_at_pole_spans_all_longitudes() {
        let bbox = BoundingBox::around(Coordinates::new(90.0, 0.0), 10.0);
        assert!(bbox.contains(Coordinates::new(89.95, 179.0)));
    }

    #[test]
    fn bounding_box_across_the_antimeridian_keeps_the_far_side() {
        let center = Coordinates::new(-16.5, 179.95);
        let across = Coordinates::new(-16.5, -179.95);
        assert!(haversine_km(center, across) < 20.0);

        let bbox = BoundingBox::around(center, 20.0);
        assert!(bbox.contains(across));
        assert!(!bbox.contains(Coordinates::new(-17.0, 179.95)));
    }

    #[test]
    fn formats_hemispheres() {
        let formatted = format_coordinates(Coordinates::new(-33.8688, 151.2093), 2);
        assert_eq!(formatted, "33.87°S, 151.21°E");
    }

    #[test]
    fn accuracy_threshold_is_inclusive() {
        assert!(is_accurate_enough(100.0, DEFAULT_ACCURACY_THRESHOLD_M));
        assert!(!is_accurate_enough(100.5, DEFAULT_ACCURACY_THRESHOLD_M));
    }
}
