use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Position, Value};
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::Result;
use crate::graph::SegmentSummary;
use crate::models::{GeoPoint, RouteCandidate, SquareLoopPlan};

/// Per-ratio line of the `candidates` summary on the route feature.
#[derive(Debug, Serialize)]
struct CandidateSummary<'a> {
    id: Uuid,
    ratio: f64,
    success: bool,
    total_length_m: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    deviation_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure_reason: Option<&'a str>,
}

impl<'a> From<&'a RouteCandidate> for CandidateSummary<'a> {
    fn from(candidate: &'a RouteCandidate) -> Self {
        CandidateSummary {
            id: candidate.id,
            ratio: candidate.ratio,
            success: candidate.success,
            total_length_m: candidate.total_length_m,
            deviation_pct: candidate.success.then_some(candidate.deviation_pct),
            failure_reason: candidate.failure_reason.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
struct RouteProperties<'a> {
    kind: &'static str,
    id: Uuid,
    length_m: f64,
    target_length_m: f64,
    ratio: f64,
    perimeter_m: f64,
    side_length_m: f64,
    deviation_m: f64,
    deviation_pct: f64,
    degraded_legs: &'a [usize],
    missing_edges: usize,
    candidates: Vec<CandidateSummary<'a>>,
    /// `segments_count`, `unique_surfaces`, `highways`, `surface_statistics`
    #[serde(flatten)]
    segments: Option<&'a SegmentSummary>,
    #[serde(with = "time::serde::rfc3339")]
    generated_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
struct MarkerProperties {
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    index: Option<usize>,
}

fn to_properties<T: Serialize>(value: &T) -> Result<JsonObject> {
    Ok(serde_json::from_value(serde_json::to_value(value)?)?)
}

fn feature(value: Value, properties: JsonObject, id: Option<Id>) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn positions(points: &[GeoPoint]) -> Vec<Position> {
    points.iter().map(|p| p.to_position()).collect()
}

/// Export the selected loop of a plan.
///
/// Features, in order: the route LineString, one Point per corner, the start
/// Point and the closed outline of the ideal square. The segment summary is
/// attached to the route when the caller can resolve edge metadata.
pub fn plan_to_feature_collection(
    plan: &SquareLoopPlan,
    segments: Option<&SegmentSummary>,
    generated_at: OffsetDateTime,
) -> Result<FeatureCollection> {
    let best = &plan.best;

    let route_properties = RouteProperties {
        kind: "route",
        id: best.id,
        length_m: best.total_length_m,
        target_length_m: plan.target_length_m,
        ratio: best.ratio,
        perimeter_m: best.perimeter_m,
        side_length_m: best.side_length_m,
        deviation_m: best.deviation_m,
        deviation_pct: best.deviation_pct,
        degraded_legs: &best.degraded_legs,
        missing_edges: best.missing_edges,
        candidates: plan.candidates.iter().map(CandidateSummary::from).collect(),
        segments,
        generated_at,
    };

    let mut features = vec![feature(
        Value::LineString(positions(&best.path)),
        to_properties(&route_properties)?,
        Some(Id::String(best.id.to_string())),
    )];

    for (index, corner) in best.corners.iter().enumerate() {
        let properties = MarkerProperties {
            kind: "corner",
            index: Some(index),
        };
        features.push(feature(
            Value::Point(corner.to_position()),
            to_properties(&properties)?,
            None,
        ));
    }

    features.push(feature(
        Value::Point(plan.start.to_position()),
        to_properties(&MarkerProperties {
            kind: "start",
            index: None,
        })?,
        None,
    ));

    let mut outline = positions(&best.corners);
    if let Some(first) = outline.first().cloned() {
        outline.push(first);
    }
    features.push(feature(
        Value::LineString(outline),
        to_properties(&MarkerProperties {
            kind: "square_outline",
            index: None,
        })?,
        None,
    ));

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

/// The route feature of an exported collection held as raw JSON.
pub fn route_feature_mut(collection: &mut serde_json::Value) -> Option<&mut serde_json::Value> {
    collection
        .get_mut("features")?
        .as_array_mut()?
        .iter_mut()
        .find(|f| f["properties"]["kind"] == "route")
}
