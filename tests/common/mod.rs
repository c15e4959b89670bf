use serde_json::json;
use squareloop::config::{FallbackPolicy, RouteGeneratorConfig};
use squareloop::graph::{NodeId, RoadGraph};
use squareloop::models::GeoPoint;
use squareloop::services::route_generator::geodesic::destination_point;

/// Southwest corner of every synthetic grid
#[allow(dead_code)]
pub fn grid_origin() -> GeoPoint {
    GeoPoint::new(19.94, 50.06).unwrap()
}

/// Node id of the grid intersection at `row` (northwards) and `col` (eastwards).
#[allow(dead_code)]
pub fn grid_node(row: usize, col: usize, cols: usize) -> NodeId {
    NodeId((row * cols + col) as i64 + 1)
}

/// Position of a grid intersection, `spacing_m` apart in both directions.
#[allow(dead_code)]
pub fn grid_position(row: usize, col: usize, spacing_m: f64) -> GeoPoint {
    let west_edge = destination_point(&grid_origin(), 0.0, row as f64 * spacing_m);
    destination_point(&west_edge, 90.0, col as f64 * spacing_m)
}

/// Street grid with `rows` x `cols` intersections and straight edges between
/// horizontal and vertical neighbours.
#[allow(dead_code)]
pub fn grid_graph(rows: usize, cols: usize, spacing_m: f64) -> RoadGraph {
    let mut builder = RoadGraph::builder();
    for row in 0..rows {
        for col in 0..cols {
            builder.add_node(grid_node(row, col, cols), grid_position(row, col, spacing_m));
        }
    }
    for row in 0..rows {
        for col in 0..cols {
            let here = grid_node(row, col, cols);
            if col + 1 < cols {
                builder
                    .add_straight_edge(here, grid_node(row, col + 1, cols))
                    .unwrap();
            }
            if row + 1 < rows {
                builder
                    .add_straight_edge(here, grid_node(row + 1, col, cols))
                    .unwrap();
            }
        }
    }
    builder.build().unwrap()
}

/// A single north-south street along the grid's west edge.
#[allow(dead_code)]
pub fn single_street_graph(rows: usize, spacing_m: f64) -> RoadGraph {
    let mut builder = RoadGraph::builder();
    for row in 0..rows {
        builder.add_node(grid_node(row, 0, 1), grid_position(row, 0, spacing_m));
    }
    for row in 1..rows {
        builder
            .add_straight_edge(grid_node(row - 1, 0, 1), grid_node(row, 0, 1))
            .unwrap();
    }
    builder.build().unwrap()
}

/// The same grid as [`grid_graph`] encoded as an Overpass API response:
/// one way per row and per column, tagged as paved residential streets.
#[allow(dead_code)]
pub fn grid_overpass_json(rows: usize, cols: usize, spacing_m: f64) -> String {
    let mut elements = Vec::new();
    for row in 0..rows {
        for col in 0..cols {
            let p = grid_position(row, col, spacing_m);
            elements.push(json!({
                "type": "node",
                "id": grid_node(row, col, cols).0,
                "lat": p.lat,
                "lon": p.lon
            }));
        }
    }

    let mut way_id = 1000;
    let tags = json!({"highway": "residential", "surface": "asphalt"});
    for row in 0..rows {
        way_id += 1;
        let nodes: Vec<i64> = (0..cols).map(|col| grid_node(row, col, cols).0).collect();
        elements.push(json!({"type": "way", "id": way_id, "nodes": nodes, "tags": tags}));
    }
    for col in 0..cols {
        way_id += 1;
        let nodes: Vec<i64> = (0..rows).map(|row| grid_node(row, col, cols).0).collect();
        elements.push(json!({"type": "way", "id": way_id, "nodes": nodes, "tags": tags}));
    }

    json!({"version": 0.6, "elements": elements}).to_string()
}

/// Generator settings with an explicit fallback policy
#[allow(dead_code)]
pub fn generator_config(policy: FallbackPolicy) -> RouteGeneratorConfig {
    RouteGeneratorConfig {
        fallback_policy: policy,
        ..RouteGeneratorConfig::default()
    }
}
