use crate::graph::NodeId;
use crate::models::GeoPoint;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One evaluated aspect-ratio variant of the square loop.
///
/// Built once per ratio by the route generator and never modified afterwards.
/// Candidates are ranked by `deviation_pct` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteCandidate {
    pub id: Uuid,
    /// Ratio denominator `r` in "route length : perimeter = 10 : r"
    pub ratio: f64,
    pub perimeter_m: f64,
    pub side_length_m: f64,
    /// Square corners in visiting order; the first equals the start point
    pub corners: Vec<GeoPoint>,
    pub node_path: Vec<NodeId>,
    /// Node positions along `node_path`
    pub path: Vec<GeoPoint>,
    pub total_length_m: f64,
    pub deviation_m: f64,
    pub deviation_pct: f64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// Legs that had to reuse edges because no disjoint path existed
    #[serde(default)]
    pub degraded_legs: Vec<usize>,
    /// Consecutive node pairs with no connecting edge in the graph
    #[serde(default)]
    pub missing_edges: usize,
}

impl RouteCandidate {
    /// A candidate whose tour could not be built. Lengths stay at zero and
    /// the deviation is infinite so it never looks like a good match.
    pub fn failed(
        ratio: f64,
        perimeter_m: f64,
        side_length_m: f64,
        corners: Vec<GeoPoint>,
        reason: String,
    ) -> Self {
        RouteCandidate {
            id: Uuid::new_v4(),
            ratio,
            perimeter_m,
            side_length_m,
            corners,
            node_path: Vec::new(),
            path: Vec::new(),
            total_length_m: 0.0,
            deviation_m: f64::INFINITY,
            deviation_pct: f64::INFINITY,
            success: false,
            failure_reason: Some(reason),
            degraded_legs: Vec::new(),
            missing_edges: 0,
        }
    }

    pub fn is_degraded(&self) -> bool {
        !self.degraded_legs.is_empty()
    }
}

/// Outcome of a full ratio sweep: every candidate plus the selected one.
#[derive(Debug, Clone, Serialize)]
pub struct SquareLoopPlan {
    pub start: GeoPoint,
    pub target_length_m: f64,
    pub candidates: Vec<RouteCandidate>,
    pub best: RouteCandidate,
}

impl SquareLoopPlan {
    pub fn successful_candidates(&self) -> usize {
        self.candidates.iter().filter(|c| c.success).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_candidate_shape() {
        let corner = GeoPoint::new(19.0, 50.0).unwrap();
        let candidate =
            RouteCandidate::failed(6.5, 6500.0, 1625.0, vec![corner; 4], "no path".to_string());

        assert!(!candidate.success);
        assert!(candidate.node_path.is_empty());
        assert!(candidate.deviation_pct.is_infinite());
        assert_eq!(candidate.failure_reason.as_deref(), Some("no path"));
        assert!(!candidate.is_degraded());
    }

    #[test]
    fn test_failed_candidate_serialization() {
        let corner = GeoPoint::new(19.0, 50.0).unwrap();
        let candidate =
            RouteCandidate::failed(7.0, 7000.0, 1750.0, vec![corner; 4], "boom".to_string());
        let value = serde_json::to_value(&candidate).unwrap();

        assert_eq!(value["ratio"], 7.0);
        assert_eq!(value["success"], false);
        assert_eq!(value["failure_reason"], "boom");
    }
}
