//! Road graph loading from Overpass API JSON (`out body; >; out skel qt;`).
//!
//! Fetching is left to the caller; this module only turns an already
//! downloaded response into a [`RoadGraph`].

use std::collections::HashMap;

use serde::Deserialize;

use super::{NodeId, RoadEdge, RoadGraph};
use crate::constants::OVERPASS_HIGHWAY_FILTER;
use crate::error::{AppError, Result};
use crate::models::{BoundingBox, GeoPoint};

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum OverpassElement {
    Node {
        id: i64,
        lat: f64,
        lon: f64,
    },
    Way {
        id: i64,
        #[serde(default)]
        nodes: Vec<i64>,
        #[serde(default)]
        tags: HashMap<String, String>,
    },
    #[serde(other)]
    Other,
}

impl RoadGraph {
    /// Build a graph from Overpass JSON text.
    ///
    /// Every consecutive node pair of a way becomes one edge whose length is
    /// the haversine distance between the nodes; the way's `highway`,
    /// `surface` and `name` tags are copied onto each edge. Segments that
    /// reference nodes missing from the response are skipped.
    pub fn from_overpass_json(json: &str) -> Result<RoadGraph> {
        let response: OverpassResponse = serde_json::from_str(json)?;

        let mut positions: HashMap<i64, GeoPoint> = HashMap::new();
        let mut ways = Vec::new();
        for element in response.elements {
            match element {
                OverpassElement::Node { id, lat, lon } => match GeoPoint::new(lon, lat) {
                    Ok(point) => {
                        positions.insert(id, point);
                    }
                    Err(e) => tracing::warn!(node = id, "Skipping OSM node: {}", e),
                },
                OverpassElement::Way { id, nodes, tags } => ways.push((id, nodes, tags)),
                OverpassElement::Other => {}
            }
        }

        // Only nodes that belong to a way segment end up in the graph
        let mut used_nodes: Vec<i64> = Vec::new();
        let mut edges = Vec::new();
        let mut skipped_segments = 0usize;

        for (way_id, nodes, tags) in &ways {
            if nodes.len() < 2 {
                continue;
            }
            for pair in nodes.windows(2) {
                let (Some(a), Some(b)) = (positions.get(&pair[0]), positions.get(&pair[1])) else {
                    skipped_segments += 1;
                    continue;
                };
                used_nodes.push(pair[0]);
                used_nodes.push(pair[1]);
                edges.push((
                    NodeId(pair[0]),
                    NodeId(pair[1]),
                    RoadEdge {
                        length_m: a.distance_to(b),
                        way_id: Some(*way_id),
                        highway: tags.get("highway").cloned(),
                        surface: tags.get("surface").cloned(),
                        name: tags.get("name").cloned(),
                    },
                ));
            }
        }

        used_nodes.sort_unstable();
        used_nodes.dedup();

        if used_nodes.is_empty() {
            return Err(AppError::Graph(
                "Overpass response contains no routable way segments".to_string(),
            ));
        }

        let mut builder = RoadGraph::builder();
        for id in &used_nodes {
            if let Some(point) = positions.get(id) {
                builder.add_node(NodeId(*id), *point);
            }
        }
        let edge_count = edges.len();
        for (a, b, edge) in edges {
            builder.add_edge(a, b, edge);
        }

        if skipped_segments > 0 {
            tracing::warn!(
                skipped = skipped_segments,
                "Skipped {} way segments referencing unknown nodes",
                skipped_segments
            );
        }
        tracing::info!(
            ways = ways.len(),
            nodes = used_nodes.len(),
            edges = edge_count,
            "Loaded road network from Overpass data"
        );

        builder.build()
    }
}

/// Overpass QL query for the routable road network inside `bbox`.
pub fn road_network_query(bbox: &BoundingBox, timeout_seconds: u32) -> String {
    format!(
        "[out:json][timeout:{timeout}];\n(\n  way[\"highway\"~\"{filter}\"]({bbox});\n);\nout body;\n>;\nout skel qt;\n",
        timeout = timeout_seconds,
        filter = OVERPASS_HIGHWAY_FILTER,
        bbox = bbox.to_overpass(),
    )
}
