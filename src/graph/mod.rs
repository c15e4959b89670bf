//! In-memory road network used as the routing collaborator.
//!
//! The graph is built once and never mutated while routes are evaluated.
//! Edge exclusion for disjoint routing is expressed as a filtered view over
//! the base graph (see [`RoadGraph::shortest_path`]), so a single graph can
//! serve any number of independent candidates.

pub mod overpass;

use std::collections::{HashMap, HashSet};
use std::fmt;

use geo::BoundingRect;
use petgraph::algo::{astar, connected_components, has_path_connecting};
use petgraph::graph::{EdgeReference, NodeIndex, UnGraph};
use petgraph::visit::{EdgeFiltered, EdgeRef};
use rstar::primitives::GeomWithData;
use rstar::RTree;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::GeoPoint;

/// Stable external node identifier (the OSM node id for Overpass data).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub i64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoadNode {
    pub id: NodeId,
    pub position: GeoPoint,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RoadEdge {
    pub length_m: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub way_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highway: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surface: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl RoadEdge {
    pub fn with_length(length_m: f64) -> Self {
        RoadEdge {
            length_m,
            ..Default::default()
        }
    }
}

/// Edges already consumed by earlier legs of one tour.
///
/// Pairs are stored unordered: marking `(u, v)` blocks `(v, u)` as well,
/// and every parallel edge between the two nodes.
#[derive(Debug, Clone, Default)]
pub struct UsedEdgeSet {
    pairs: HashSet<(NodeId, NodeId)>,
}

impl UsedEdgeSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Returns true if the pair was not already marked.
    pub fn insert(&mut self, a: NodeId, b: NodeId) -> bool {
        self.pairs.insert(Self::key(a, b))
    }

    /// Mark every consecutive pair of a node path.
    pub fn mark_path(&mut self, path: &[NodeId]) {
        for pair in path.windows(2) {
            self.insert(pair[0], pair[1]);
        }
    }

    pub fn contains(&self, a: NodeId, b: NodeId) -> bool {
        self.pairs.contains(&Self::key(a, b))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Query surface the route generator needs from a road network.
///
/// Implementations must be read-only during evaluation; `Sync` lets callers
/// evaluate independent candidates from several threads.
pub trait RoadNetwork: Sync {
    /// Nearest graph node to a coordinate.
    fn nearest_node(&self, point: &GeoPoint) -> Option<NodeId>;

    fn node_position(&self, node: NodeId) -> Option<GeoPoint>;

    /// Shortest path by edge length that never crosses a pair in `excluded`.
    /// Returns the node sequence including both endpoints.
    fn shortest_path(&self, from: NodeId, to: NodeId, excluded: &UsedEdgeSet)
        -> Option<Vec<NodeId>>;

    /// Length of the edge with the smallest edge key between `a` and `b`.
    fn edge_length(&self, a: NodeId, b: NodeId) -> Option<f64>;

    fn are_connected(&self, a: NodeId, b: NodeId) -> bool {
        self.shortest_path(a, b, &UsedEdgeSet::new()).is_some()
    }

    /// Whether a point lies inside the loaded network extent.
    fn covers(&self, _point: &GeoPoint) -> bool {
        true
    }
}

const UNKNOWN_SURFACE: &str = "unknown";

/// Road tags seen along a route, built by [`RoadGraph::segment_summary`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SegmentSummary {
    pub segments_count: usize,
    /// Surfaces in order of first appearance ("unknown" when untagged)
    pub unique_surfaces: Vec<String>,
    /// Highway classes in order of first appearance; untagged edges are left out
    pub highways: Vec<String>,
    pub surface_statistics: HashMap<String, usize>,
}

type SpatialEntry = GeomWithData<[f64; 2], NodeIndex>;

/// Undirected road graph backed by petgraph with an R-tree for snapping.
pub struct RoadGraph {
    graph: UnGraph<RoadNode, RoadEdge>,
    index: HashMap<NodeId, NodeIndex>,
    spatial: RTree<SpatialEntry>,
    /// Longitude scale applied before nearest-neighbour queries
    lon_scale: f64,
    bounds: Option<geo::Rect<f64>>,
}

impl RoadGraph {
    pub fn builder() -> RoadGraphBuilder {
        RoadGraphBuilder::default()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        self.index.contains_key(&node)
    }

    /// Extent of all node positions, `None` for an empty graph.
    pub fn bounds(&self) -> Option<geo::Rect<f64>> {
        self.bounds
    }

    pub fn connected_component_count(&self) -> usize {
        connected_components(&self.graph)
    }

    /// Parallel edge with the smallest edge index between two nodes.
    pub fn edge_between(&self, a: NodeId, b: NodeId) -> Option<&RoadEdge> {
        let ia = *self.index.get(&a)?;
        let ib = *self.index.get(&b)?;
        self.graph
            .edges_connecting(ia, ib)
            .min_by_key(|edge| edge.id())
            .map(|edge| edge.weight())
    }

    /// Edge metadata for every consecutive pair in a path. Pairs without an
    /// edge yield `None`.
    pub fn segment_metadata(&self, path: &[NodeId]) -> Vec<Option<&RoadEdge>> {
        path.windows(2)
            .map(|pair| self.edge_between(pair[0], pair[1]))
            .collect()
    }

    /// Count of segments per surface tag along a path ("unknown" when untagged
    /// or when no edge connects the pair).
    pub fn surface_statistics(&self, path: &[NodeId]) -> HashMap<String, usize> {
        self.segment_summary(path).surface_statistics
    }

    /// Tag summary of the segments along a path.
    pub fn segment_summary(&self, path: &[NodeId]) -> SegmentSummary {
        let mut summary = SegmentSummary::default();
        for edge in self.segment_metadata(path) {
            summary.segments_count += 1;

            let surface = edge
                .and_then(|e| e.surface.clone())
                .unwrap_or_else(|| UNKNOWN_SURFACE.to_string());
            if !summary.unique_surfaces.contains(&surface) {
                summary.unique_surfaces.push(surface.clone());
            }
            *summary.surface_statistics.entry(surface).or_insert(0) += 1;

            if let Some(highway) = edge.and_then(|e| e.highway.as_ref()) {
                if !summary.highways.contains(highway) {
                    summary.highways.push(highway.clone());
                }
            }
        }
        summary
    }

    fn project(&self, point: &GeoPoint) -> [f64; 2] {
        [point.lon * self.lon_scale, point.lat]
    }
}

impl RoadNetwork for RoadGraph {
    fn nearest_node(&self, point: &GeoPoint) -> Option<NodeId> {
        self.spatial
            .nearest_neighbor(&self.project(point))
            .map(|entry| self.graph[entry.data].id)
    }

    fn node_position(&self, node: NodeId) -> Option<GeoPoint> {
        self.index
            .get(&node)
            .map(|&idx| self.graph[idx].position)
    }

    fn shortest_path(
        &self,
        from: NodeId,
        to: NodeId,
        excluded: &UsedEdgeSet,
    ) -> Option<Vec<NodeId>> {
        let start = *self.index.get(&from)?;
        let goal = *self.index.get(&to)?;
        let graph = &self.graph;

        let view = EdgeFiltered::from_fn(graph, |edge: EdgeReference<'_, RoadEdge>| {
            !excluded.contains(graph[edge.source()].id, graph[edge.target()].id)
        });

        let (_cost, path) = astar(
            &view,
            start,
            |node| node == goal,
            |edge: EdgeReference<'_, RoadEdge>| edge.weight().length_m,
            |_| 0.0,
        )?;

        Some(path.into_iter().map(|idx| graph[idx].id).collect())
    }

    fn edge_length(&self, a: NodeId, b: NodeId) -> Option<f64> {
        self.edge_between(a, b).map(|edge| edge.length_m)
    }

    fn are_connected(&self, a: NodeId, b: NodeId) -> bool {
        match (self.index.get(&a), self.index.get(&b)) {
            (Some(&ia), Some(&ib)) => has_path_connecting(&self.graph, ia, ib, None),
            _ => false,
        }
    }

    fn covers(&self, point: &GeoPoint) -> bool {
        self.bounds.is_some_and(|rect| {
            let (min, max) = (rect.min(), rect.max());
            (min.x..=max.x).contains(&point.lon) && (min.y..=max.y).contains(&point.lat)
        })
    }
}

/// Collects nodes and edges, then builds the indexed [`RoadGraph`].
#[derive(Debug, Default)]
pub struct RoadGraphBuilder {
    nodes: Vec<RoadNode>,
    edges: Vec<(NodeId, NodeId, RoadEdge)>,
}

impl RoadGraphBuilder {
    pub fn add_node(&mut self, id: NodeId, position: GeoPoint) -> &mut Self {
        self.nodes.push(RoadNode { id, position });
        self
    }

    pub fn add_edge(&mut self, a: NodeId, b: NodeId, edge: RoadEdge) -> &mut Self {
        self.edges.push((a, b, edge));
        self
    }

    /// Edge whose length is the haversine distance between its endpoints.
    /// Fails if either endpoint has not been added yet.
    pub fn add_straight_edge(&mut self, a: NodeId, b: NodeId) -> Result<&mut Self> {
        let position = |id: NodeId| {
            self.nodes
                .iter()
                .rev()
                .find(|n| n.id == id)
                .map(|n| n.position)
                .ok_or_else(|| AppError::Graph(format!("Unknown node {}", id)))
        };
        let length_m = position(a)?.distance_to(&position(b)?);
        Ok(self.add_edge(a, b, RoadEdge::with_length(length_m)))
    }

    pub fn build(self) -> Result<RoadGraph> {
        let mut graph = UnGraph::with_capacity(self.nodes.len(), self.edges.len());
        let mut index = HashMap::with_capacity(self.nodes.len());

        for node in self.nodes {
            if index.contains_key(&node.id) {
                return Err(AppError::Graph(format!("Duplicate node {}", node.id)));
            }
            let id = node.id;
            index.insert(id, graph.add_node(node));
        }

        for (a, b, edge) in self.edges {
            if !edge.length_m.is_finite() || edge.length_m < 0.0 {
                return Err(AppError::Graph(format!(
                    "Edge {} - {} has invalid length {}",
                    a, b, edge.length_m
                )));
            }
            let (Some(&ia), Some(&ib)) = (index.get(&a), index.get(&b)) else {
                return Err(AppError::Graph(format!(
                    "Edge {} - {} references an unknown node",
                    a, b
                )));
            };
            if ia == ib {
                tracing::debug!(node = %a, "Skipping self-loop edge");
                continue;
            }
            graph.add_edge(ia, ib, edge);
        }

        let mean_lat = if graph.node_count() == 0 {
            0.0
        } else {
            graph.raw_nodes().iter().map(|n| n.weight.position.lat).sum::<f64>()
                / graph.node_count() as f64
        };
        let lon_scale = mean_lat.to_radians().cos();

        let spatial = RTree::bulk_load(
            graph
                .node_indices()
                .map(|idx| {
                    let p = graph[idx].position;
                    GeomWithData::new([p.lon * lon_scale, p.lat], idx)
                })
                .collect(),
        );

        let bounds = geo::MultiPoint::from(
            graph
                .raw_nodes()
                .iter()
                .map(|n| geo::Point::from(n.weight.position))
                .collect::<Vec<_>>(),
        )
        .bounding_rect();

        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Built road graph with {} nodes and {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        Ok(RoadGraph {
            graph,
            index,
            spatial,
            lon_scale,
            bounds,
        })
    }
}
