//! Great-circle distance on a spherical Earth

use crate::domain::types::GeoPoint;

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine surface distance between two points, in meters
///
/// Pure function with no failure modes: identical points yield 0 (never NaN)
/// and antipodal points stay finite. The atan2 form keeps the formula stable
/// near both extremes.
pub fn haversine_distance_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_points_are_zero() {
        let p = GeoPoint::new(45.4642, 9.19);
        let d = haversine_distance_m(p, p);
        assert_eq!(d, 0.0);
        assert!(!d.is_nan());
    }

    #[test]
    fn test_symmetry() {
        let a = GeoPoint::new(45.4642, 9.19);
        let b = GeoPoint::new(41.9028, 12.4964);
        assert_eq!(haversine_distance_m(a, b), haversine_distance_m(b, a));
    }

    #[test]
    fn test_triangle_inequality() {
        let a = GeoPoint::new(45.4642, 9.19);
        let b = GeoPoint::new(45.0703, 7.6869);
        let c = GeoPoint::new(44.4056, 8.9463);

        let ab = haversine_distance_m(a, b);
        let bc = haversine_distance_m(b, c);
        let ac = haversine_distance_m(a, c);

        assert!(ac <= ab + bc);
    }

    #[test]
    fn test_known_city_pair() {
        // Milan to Turin, roughly 125 km apart
        let milan = GeoPoint::new(45.4642, 9.19);
        let turin = GeoPoint::new(45.0703, 7.6869);

        let d = haversine_distance_m(milan, turin);
        assert!(d > 100_000.0 && d < 150_000.0, "got {d}");
    }

    #[test]
    fn test_antipodal_points_finite() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 180.0);

        let d = haversine_distance_m(a, b);
        assert!(d.is_finite());
        // Half the Earth's circumference
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_M).abs() < 1_000.0);
    }

    #[test]
    fn test_small_displacement() {
        // One degree of latitude is ~111.2 km; 100 m north of the origin
        let origin = GeoPoint::new(45.0, 9.0);
        let north = GeoPoint::new(45.0 + 100.0 / 111_195.0, 9.0);

        let d = haversine_distance_m(origin, north);
        assert!((d - 100.0).abs() < 0.1, "got {d}");
    }
}
