pub mod bbox;
pub mod coordinates;
pub mod route;

pub use bbox::BoundingBox;
pub use coordinates::{GeoPoint, EARTH_RADIUS_M};
pub use route::{RouteCandidate, SquareLoopPlan};
