use crate::constants::SQUARE_BEARINGS_DEG;
use crate::models::{GeoPoint, EARTH_RADIUS_M};

/// Point reached by travelling `distance_m` from `origin` along the initial
/// great-circle bearing `bearing_deg` (clockwise from north), on a sphere.
pub fn destination_point(origin: &GeoPoint, bearing_deg: f64, distance_m: f64) -> GeoPoint {
    let delta = distance_m / EARTH_RADIUS_M;
    let theta = bearing_deg.to_radians();
    let phi1 = origin.lat.to_radians();
    let lambda1 = origin.lon.to_radians();

    let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).asin();
    let lambda2 = lambda1
        + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * phi2.sin());

    GeoPoint {
        lon: (lambda2.to_degrees() + 540.0) % 360.0 - 180.0,
        lat: phi2.to_degrees(),
    }
}

/// Corners of a square with sides of `side_length_m`, walked N, E, S, W from
/// `origin`. Each corner is recorded before the step, so the first corner is
/// `origin` itself and the final westward step only closes the outline.
///
/// A non-positive side length yields four copies of `origin`.
pub fn square_corners(origin: &GeoPoint, side_length_m: f64) -> [GeoPoint; 4] {
    let mut corners = [*origin; 4];
    let mut cursor = *origin;

    for (corner, bearing) in corners.iter_mut().zip(SQUARE_BEARINGS_DEG) {
        *corner = cursor;
        if side_length_m > 0.0 {
            cursor = destination_point(&cursor, bearing, side_length_m);
        }
    }

    corners
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> GeoPoint {
        GeoPoint::new(18.950313, 50.306321).unwrap()
    }

    #[test]
    fn test_destination_north_along_meridian() {
        let origin = start();
        let dest = destination_point(&origin, 0.0, 1000.0);
        assert!((dest.lon - origin.lon).abs() < 1e-12);
        assert!((origin.distance_to(&dest) - 1000.0).abs() < 1e-6);
        assert!(dest.lat > origin.lat);
    }

    #[test]
    fn test_destination_bearings() {
        let origin = start();
        let east = destination_point(&origin, 90.0, 500.0);
        let south = destination_point(&origin, 180.0, 500.0);
        let west = destination_point(&origin, 270.0, 500.0);

        assert!(east.lon > origin.lon);
        assert!(south.lat < origin.lat);
        assert!(west.lon < origin.lon);
        for dest in [east, south, west] {
            assert!((origin.distance_to(&dest) - 500.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_zero_distance_is_identity() {
        let origin = start();
        let dest = destination_point(&origin, 123.0, 0.0);
        assert!((dest.lat - origin.lat).abs() < 1e-12);
        assert!((dest.lon - origin.lon).abs() < 1e-12);
    }

    #[test]
    fn test_longitude_wraps_at_antimeridian() {
        let origin = GeoPoint::new(179.999, 0.0).unwrap();
        let dest = destination_point(&origin, 90.0, 1000.0);
        assert!(dest.lon < -179.0, "lon={}", dest.lon);
    }

    #[test]
    fn test_first_corner_is_origin() {
        let origin = start();
        let corners = square_corners(&origin, 1750.0);
        assert_eq!(corners[0], origin);
    }

    #[test]
    fn test_corner_spacing_matches_side_length() {
        let origin = start();
        for side in [250.0, 1750.0, 5000.0] {
            let corners = square_corners(&origin, side);
            for i in 0..4 {
                let a = corners[i];
                let b = corners[(i + 1) % 4];
                let d = a.distance_to(&b);
                assert!(
                    (d - side).abs() / side < 0.005,
                    "side={side}, corner {i}: {d}"
                );
            }
        }
    }

    #[test]
    fn test_corner_orientation() {
        let origin = start();
        let corners = square_corners(&origin, 1000.0);
        // north, then north-east, then east of the start
        assert!(corners[1].lat > origin.lat);
        assert!(corners[2].lat > origin.lat && corners[2].lon > origin.lon);
        assert!(corners[3].lon > origin.lon);
        assert!((corners[3].lat - origin.lat).abs() < 1e-5);
    }

    #[test]
    fn test_degenerate_side_length() {
        let origin = start();
        assert_eq!(square_corners(&origin, 0.0), [origin; 4]);
        assert_eq!(square_corners(&origin, -10.0), [origin; 4]);
    }
}
