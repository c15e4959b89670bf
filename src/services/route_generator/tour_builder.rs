use crate::config::FallbackPolicy;
use crate::constants::DEFAULT_SNAP_WARN_DISTANCE_M;
use crate::error::{AppError, Result};
use crate::graph::{NodeId, RoadNetwork, UsedEdgeSet};
use crate::models::GeoPoint;

/// Closed node tour through the snapped square corners.
#[derive(Debug, Clone, PartialEq)]
pub struct Tour {
    /// Node sequence; the last node repeats the first
    pub nodes: Vec<NodeId>,
    /// Graph node each corner was snapped to, in visiting order
    pub waypoint_nodes: Vec<NodeId>,
    /// Legs routed over already used edges
    pub degraded_legs: Vec<usize>,
}

/// Chains shortest paths between consecutive waypoints while avoiding edges
/// an earlier leg of the same tour already used.
pub struct TourBuilder {
    fallback_policy: FallbackPolicy,
    snap_warn_distance_m: f64,
}

impl Default for TourBuilder {
    fn default() -> Self {
        Self::new(FallbackPolicy::default(), DEFAULT_SNAP_WARN_DISTANCE_M)
    }
}

impl TourBuilder {
    pub fn new(fallback_policy: FallbackPolicy, snap_warn_distance_m: f64) -> Self {
        TourBuilder {
            fallback_policy,
            snap_warn_distance_m,
        }
    }

    /// Build a closed tour visiting every waypoint in order and returning to
    /// the first one.
    ///
    /// Leg `k` runs from waypoint `k` to waypoint `k + 1` (cyclic). Each leg
    /// is first searched on the graph minus the pairs used so far. When that
    /// fails the leg is either routed on the full graph and recorded as
    /// degraded, or the whole tour fails, depending on the fallback policy.
    /// A leg with no path at all fails the tour and nothing partial is
    /// returned.
    pub fn build_closed_tour<N>(&self, network: &N, waypoints: &[GeoPoint]) -> Result<Tour>
    where
        N: RoadNetwork + ?Sized,
    {
        if waypoints.len() < 2 {
            return Err(AppError::InvalidParameter(format!(
                "A tour needs at least 2 waypoints, got {}",
                waypoints.len()
            )));
        }

        let waypoint_nodes = self.snap_waypoints(network, waypoints)?;
        self.log_component_split(network, &waypoint_nodes);

        let mut used = UsedEdgeSet::new();
        let mut nodes: Vec<NodeId> = Vec::new();
        let mut degraded_legs = Vec::new();
        let leg_count = waypoint_nodes.len();

        for leg in 0..leg_count {
            let from = waypoint_nodes[leg];
            let to = waypoint_nodes[(leg + 1) % leg_count];

            let path = match network.shortest_path(from, to, &used) {
                Some(path) => path,
                None => {
                    let disjoint_err = AppError::DisjointPathUnavailable { leg, from, to };
                    if self.fallback_policy == FallbackPolicy::FailCandidate {
                        return Err(disjoint_err);
                    }

                    let path = network
                        .shortest_path(from, to, &UsedEdgeSet::new())
                        .ok_or(AppError::NoPathBetweenWaypoints { leg, from, to })?;

                    tracing::warn!(
                        leg,
                        from = %from,
                        to = %to,
                        "{}; reusing edges",
                        disjoint_err
                    );
                    degraded_legs.push(leg);
                    path
                }
            };

            tracing::debug!(leg, from = %from, to = %to, nodes = path.len(), "Routed leg");

            used.mark_path(&path);
            // The final node is the next leg's start
            nodes.extend_from_slice(&path[..path.len().saturating_sub(1)]);
        }

        let Some(&first) = nodes.first() else {
            return Err(AppError::InvalidParameter(
                "All waypoints snap to the same node; the tour has no edges".to_string(),
            ));
        };
        nodes.push(first);

        Ok(Tour {
            nodes,
            waypoint_nodes,
            degraded_legs,
        })
    }

    fn snap_waypoints<N>(&self, network: &N, waypoints: &[GeoPoint]) -> Result<Vec<NodeId>>
    where
        N: RoadNetwork + ?Sized,
    {
        waypoints
            .iter()
            .enumerate()
            .map(|(i, waypoint)| {
                let node = network
                    .nearest_node(waypoint)
                    .ok_or_else(|| AppError::Graph("Road network has no nodes".to_string()))?;

                if let Some(position) = network.node_position(node) {
                    let snap_distance = waypoint.distance_to(&position);
                    if snap_distance > self.snap_warn_distance_m {
                        tracing::warn!(
                            waypoint = i,
                            node = %node,
                            distance_m = snap_distance,
                            "Waypoint {} snapped {:.0}m away from its position",
                            i,
                            snap_distance
                        );
                    }
                }
                Ok(node)
            })
            .collect()
    }

    fn log_component_split<N>(&self, network: &N, waypoint_nodes: &[NodeId])
    where
        N: RoadNetwork + ?Sized,
    {
        let first = waypoint_nodes[0];
        for (i, &node) in waypoint_nodes.iter().enumerate().skip(1) {
            if node != first && !network.are_connected(first, node) {
                tracing::warn!(
                    waypoint = i,
                    node = %node,
                    start = %first,
                    "Waypoint {} lies in a different network component than the start",
                    i
                );
            }
        }
    }
}
