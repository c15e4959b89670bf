use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::graph::{NodeId, RoadNetwork};

/// Summed edge length of a node path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathLength {
    pub meters: f64,
    /// Consecutive pairs with no connecting edge (counted as 0 m)
    pub missing_edges: usize,
}

/// How far an achieved route length is from the requested one
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Deviation {
    pub absolute_m: f64,
    /// Absolute deviation as a percentage of the target
    pub percentage: f64,
}

/// Sum the edge lengths between consecutive nodes of `path`.
///
/// With parallel edges the one with the smallest edge key is counted, which
/// is not necessarily the edge the shortest-path search travelled. Paths
/// with fewer than two nodes have zero length.
pub fn total_length<N>(network: &N, path: &[NodeId]) -> PathLength
where
    N: RoadNetwork + ?Sized,
{
    let mut length = PathLength {
        meters: 0.0,
        missing_edges: 0,
    };

    for pair in path.windows(2) {
        match network.edge_length(pair[0], pair[1]) {
            Some(meters) => length.meters += meters,
            None => {
                tracing::warn!(
                    from = %pair[0],
                    to = %pair[1],
                    "No edge between consecutive path nodes {} and {}",
                    pair[0],
                    pair[1]
                );
                length.missing_edges += 1;
            }
        }
    }

    length
}

pub fn deviation(actual_m: f64, target_m: f64) -> Result<Deviation> {
    if !target_m.is_finite() || target_m <= 0.0 {
        return Err(AppError::InvalidParameter(format!(
            "Target length must be positive, got {}",
            target_m
        )));
    }

    let absolute_m = (actual_m - target_m).abs();
    Ok(Deviation {
        absolute_m,
        percentage: absolute_m / target_m * 100.0,
    })
}
