pub mod geodesic;
pub mod proportion;
pub mod route_metrics;
pub mod selection;
pub mod tour_builder;

use uuid::Uuid;

use crate::config::RouteGeneratorConfig;
use crate::constants::NETWORK_QUERY_BUFFER_M;
use crate::error::{AppError, Result};
use crate::graph::RoadNetwork;
use crate::models::{BoundingBox, GeoPoint, RouteCandidate, SquareLoopPlan};

use geodesic::square_corners;
use proportion::square_dimensions;
use route_metrics::{deviation, total_length};
use selection::select_best;
use tour_builder::TourBuilder;

/// Sweeps square aspect ratios and keeps the loop whose network length is
/// closest to the requested distance.
pub struct RouteGenerator {
    config: RouteGeneratorConfig,
    tour_builder: TourBuilder,
}

impl RouteGenerator {
    pub fn new(config: RouteGeneratorConfig) -> Self {
        let tour_builder = TourBuilder::new(config.fallback_policy, config.snap_warn_distance_m);
        RouteGenerator {
            config,
            tour_builder,
        }
    }

    /// Build and measure the loop for a single ratio denominator.
    ///
    /// Routing failures produce an unsuccessful candidate carrying the
    /// reason. Errors unrelated to this candidate (a broken graph) are
    /// returned.
    pub fn evaluate_candidate<N>(
        &self,
        network: &N,
        start: &GeoPoint,
        target_length_m: f64,
        ratio: f64,
    ) -> Result<RouteCandidate>
    where
        N: RoadNetwork + ?Sized,
    {
        let dims = square_dimensions(target_length_m, ratio)?;
        let corners = square_corners(start, dims.side_length_m);

        for (i, corner) in corners.iter().enumerate() {
            if !network.covers(corner) {
                tracing::warn!(
                    ratio,
                    corner = i,
                    lat = corner.lat,
                    lon = corner.lon,
                    "Corner {} lies outside the loaded road network",
                    i
                );
            }
        }

        let tour = match self.tour_builder.build_closed_tour(network, &corners) {
            Ok(tour) => tour,
            Err(e) if e.is_candidate_fatal() => {
                tracing::info!(ratio, "Candidate failed: {}", e);
                return Ok(RouteCandidate::failed(
                    ratio,
                    dims.perimeter_m,
                    dims.side_length_m,
                    corners.to_vec(),
                    e.to_string(),
                ));
            }
            Err(e) => return Err(e),
        };

        let path = tour
            .nodes
            .iter()
            .map(|&node| {
                network
                    .node_position(node)
                    .ok_or_else(|| AppError::Graph(format!("Node {} has no position", node)))
            })
            .collect::<Result<Vec<_>>>()?;

        let length = total_length(network, &tour.nodes);
        let dev = deviation(length.meters, target_length_m)?;

        tracing::info!(
            ratio,
            length_m = length.meters,
            deviation_pct = dev.percentage,
            degraded_legs = tour.degraded_legs.len(),
            "Ratio {}: {:.0}m ({:.1}% off target)",
            ratio,
            length.meters,
            dev.percentage
        );

        Ok(RouteCandidate {
            id: Uuid::new_v4(),
            ratio,
            perimeter_m: dims.perimeter_m,
            side_length_m: dims.side_length_m,
            corners: corners.to_vec(),
            node_path: tour.nodes,
            path,
            total_length_m: length.meters,
            deviation_m: dev.absolute_m,
            deviation_pct: dev.percentage,
            success: true,
            failure_reason: None,
            degraded_legs: tour.degraded_legs,
            missing_edges: length.missing_edges,
        })
    }

    /// Evaluate every configured ratio and select the best loop.
    ///
    /// Each candidate is built with its own used-edge set, so the order of
    /// evaluation only matters for breaking ties.
    pub fn generate_square_loop<N>(
        &self,
        network: &N,
        start: GeoPoint,
        target_length_m: f64,
    ) -> Result<SquareLoopPlan>
    where
        N: RoadNetwork + ?Sized,
    {
        if !target_length_m.is_finite() || target_length_m <= 0.0 {
            return Err(AppError::InvalidParameter(format!(
                "Target route length must be positive, got {}",
                target_length_m
            )));
        }
        if self.config.ratio_denominators.is_empty() {
            return Err(AppError::InvalidParameter(
                "No ratio denominators configured".to_string(),
            ));
        }

        tracing::info!(
            lat = start.lat,
            lon = start.lon,
            target_m = target_length_m,
            ratios = ?self.config.ratio_denominators,
            "Generating square loop from ({}, {}), target: {}m",
            start.lat,
            start.lon,
            target_length_m
        );

        let candidates = self
            .config
            .ratio_denominators
            .iter()
            .map(|&ratio| self.evaluate_candidate(network, &start, target_length_m, ratio))
            .collect::<Result<Vec<_>>>()?;

        let best = select_best(&candidates)
            .cloned()
            .ok_or(AppError::AllCandidatesFailed(candidates.len()))?;

        tracing::info!(
            ratio = best.ratio,
            length_m = best.total_length_m,
            deviation_pct = best.deviation_pct,
            "Selected ratio {} ({:.1}% deviation)",
            best.ratio,
            best.deviation_pct
        );

        Ok(SquareLoopPlan {
            start,
            target_length_m,
            candidates,
            best,
        })
    }

    /// Region a road network must cover to evaluate every configured ratio
    /// from `start`, padded so legs can leave the ideal outline.
    pub fn network_region(&self, start: &GeoPoint, target_length_m: f64) -> Result<BoundingBox> {
        let mut points = vec![*start];
        for &ratio in &self.config.ratio_denominators {
            let dims = square_dimensions(target_length_m, ratio)?;
            points.extend(square_corners(start, dims.side_length_m));
        }
        BoundingBox::around(&points, NETWORK_QUERY_BUFFER_M)
            .ok_or_else(|| AppError::InvalidParameter("Empty query region".to_string()))
    }
}
