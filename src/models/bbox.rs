use geo::BoundingRect;

use crate::models::{GeoPoint, EARTH_RADIUS_M};

/// Smallest cosine used to widen longitudes, so boxes near the poles stay finite.
const MIN_LON_SCALE: f64 = 0.01;

/// Axis-aligned region in geographic coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl From<geo::Rect<f64>> for BoundingBox {
    fn from(rect: geo::Rect<f64>) -> Self {
        BoundingBox {
            min_lat: rect.min().y,
            max_lat: rect.max().y,
            min_lon: rect.min().x,
            max_lon: rect.max().x,
        }
    }
}

impl BoundingBox {
    /// Extent of `points` grown by `buffer_m` on every side, `None` without
    /// points.
    ///
    /// Longitudes are widened for the most poleward edge, so the buffer is at
    /// least `buffer_m` everywhere in the box. The result is clamped to valid
    /// coordinates.
    pub fn around(points: &[GeoPoint], buffer_m: f64) -> Option<Self> {
        let extent: BoundingBox = geo::MultiPoint::from(
            points.iter().map(|&p| geo::Point::from(p)).collect::<Vec<_>>(),
        )
        .bounding_rect()?
        .into();

        let lat_buffer = (buffer_m / EARTH_RADIUS_M).to_degrees();
        let poleward_lat = (extent.min_lat.abs().max(extent.max_lat.abs()) + lat_buffer).min(90.0);
        let lon_buffer = lat_buffer / poleward_lat.to_radians().cos().max(MIN_LON_SCALE);

        Some(BoundingBox {
            min_lat: (extent.min_lat - lat_buffer).max(-90.0),
            max_lat: (extent.max_lat + lat_buffer).min(90.0),
            min_lon: (extent.min_lon - lon_buffer).max(-180.0),
            max_lon: (extent.max_lon + lon_buffer).min(180.0),
        })
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lon..=self.max_lon).contains(&point.lon)
    }

    /// Overpass QL bbox filter order: south, west, north, east.
    pub fn to_overpass(&self) -> String {
        format!(
            "{:.6},{:.6},{:.6},{:.6}",
            self.min_lat, self.min_lon, self.max_lat, self.max_lon
        )
    }
}
