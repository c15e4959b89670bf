//! Stable application-wide constants.
//!
//! Values here are structural invariants and default fallbacks for the
//! env-var-based configuration in [`crate::config`]. They should rarely change.

// --- Proportion sweep ---

/// Ratio denominators tried by default ("route length : perimeter = 10 : r").
/// Real routes run longer than the ideal square, so every value is below 10.
pub const DEFAULT_RATIO_DENOMINATORS: [f64; 3] = [7.0, 6.5, 6.0];

/// Numerator of the route-length : perimeter ratio.
pub const RATIO_NUMERATOR: f64 = 10.0;

/// Bearings walked from the start point to lay out the square (N, E, S, W).
pub const SQUARE_BEARINGS_DEG: [f64; 4] = [0.0, 90.0, 180.0, 270.0];

// --- Tour construction ---

/// Distance (meters) between a corner and its snapped graph node above which
/// a warning is logged. Snapping still succeeds.
pub const DEFAULT_SNAP_WARN_DISTANCE_M: f64 = 250.0;

// --- Coordinate cleaning ---

/// Look-ahead bound for backtrack detection: a repeat of point `i` is only
/// searched for at positions `i + 2 .. i + window`.
pub const DEFAULT_BACKTRACK_WINDOW: usize = 15;

/// Smallest window that can detect any backtrack (`i + 2` must be in range).
pub const MIN_BACKTRACK_WINDOW: usize = 3;

// --- Overpass input ---

/// `highway` values requested when building a road network query.
pub const OVERPASS_HIGHWAY_FILTER: &str = "cycleway|path|footway|residential|service|track|living_street|unclassified|tertiary|secondary|primary";

/// Overpass server-side timeout (seconds) embedded in generated queries.
pub const OVERPASS_QUERY_TIMEOUT_SECONDS: u32 = 25;

/// Buffer (meters) added around the square corners when sizing the Overpass
/// query region, so legs may leave the ideal outline.
pub const NETWORK_QUERY_BUFFER_M: f64 = 1_000.0;
