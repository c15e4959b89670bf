//! Removal of short out-and-back artefacts from coordinate sequences.
//!
//! Two passes run per line: runs of identical consecutive points collapse
//! to one, then a greedy scan drops every loop that returns to a point
//! within `window` positions. Longer or nested backtracks can survive a
//! single pass, and cutting one loop can pull a repeat that was out of reach
//! back inside the window, so a second pass may remove more. Cleaning is not
//! idempotent in general.
//!
//! [`clean_line`] may reduce a closed ring to a single point. The
//! FeatureCollection entry points refuse to do that and keep such a
//! geometry as it was. They work on raw JSON so that geometry they cannot
//! interpret is left exactly as it was, and they descend into
//! GeometryCollections.

use geojson::Position;
use serde::Serialize;
use serde_json::Value;

/// Counts for one cleaned line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LineCleanStats {
    pub input_points: usize,
    pub output_points: usize,
    pub duplicates_removed: usize,
    /// Number of backtracks cut out
    pub backtracks_removed: usize,
    /// Points dropped by those backtracks
    pub backtrack_points_removed: usize,
}

impl LineCleanStats {
    pub fn points_removed(&self) -> usize {
        self.duplicates_removed + self.backtrack_points_removed
    }

    fn absorb(&mut self, other: &LineCleanStats) {
        self.input_points += other.input_points;
        self.output_points += other.output_points;
        self.duplicates_removed += other.duplicates_removed;
        self.backtracks_removed += other.backtracks_removed;
        self.backtrack_points_removed += other.backtrack_points_removed;
    }
}

/// A detected loop `start..end` in the de-duplicated sequence, where the
/// point at `end` equals the point at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Backtrack {
    pub start: usize,
    pub end: usize,
}

impl Backtrack {
    pub fn points_removed(&self) -> usize {
        self.end - self.start
    }
}

/// Findings for one line, without changing it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LineAnalysis {
    pub point_count: usize,
    pub duplicate_points: usize,
    pub backtracks: Vec<Backtrack>,
}

/// Totals over every line of a FeatureCollection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    pub features: usize,
    pub lines: usize,
    /// Geometries skipped because their coordinates were not understood
    pub skipped_geometries: usize,
    pub totals: LineCleanStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub features: usize,
    pub lines: usize,
    pub skipped_geometries: usize,
    pub duplicate_points: usize,
    pub backtracks: usize,
    pub backtrack_points: usize,
}

fn collapse_duplicates(coords: &[Position]) -> (Vec<Position>, usize) {
    let mut out: Vec<Position> = Vec::with_capacity(coords.len());
    for point in coords {
        if out.last() != Some(point) {
            out.push(point.clone());
        }
    }
    let removed = coords.len() - out.len();
    (out, removed)
}

/// Greedy backtrack scan shared by cleaning and analysis. Returns the
/// indices that survive and the loops that were cut.
fn scan_backtracks(points: &[Position], window: usize) -> (Vec<usize>, Vec<Backtrack>) {
    let n = points.len();
    let mut kept = Vec::with_capacity(n);
    let mut backtracks = Vec::new();
    let mut i = 0;

    while i < n {
        let limit = n.min(i.saturating_add(window));
        let hit = (i + 2..limit).find(|&j| points[j] == points[i]);
        match hit {
            Some(j) => {
                backtracks.push(Backtrack { start: i, end: j });
                i = j;
            }
            None => {
                kept.push(i);
                i += 1;
            }
        }
    }

    (kept, backtracks)
}

/// Clean one coordinate sequence.
pub fn clean_line(coords: &[Position], window: usize) -> (Vec<Position>, LineCleanStats) {
    let (deduped, duplicates_removed) = collapse_duplicates(coords);
    let (kept, backtracks) = scan_backtracks(&deduped, window);

    let cleaned: Vec<Position> = kept.into_iter().map(|i| deduped[i].clone()).collect();
    let stats = LineCleanStats {
        input_points: coords.len(),
        output_points: cleaned.len(),
        duplicates_removed,
        backtracks_removed: backtracks.len(),
        backtrack_points_removed: backtracks.iter().map(Backtrack::points_removed).sum(),
    };
    (cleaned, stats)
}

/// Report what [`clean_line`] would remove.
pub fn analyze_line(coords: &[Position], window: usize) -> LineAnalysis {
    let (deduped, duplicate_points) = collapse_duplicates(coords);
    let (_, backtracks) = scan_backtracks(&deduped, window);
    LineAnalysis {
        point_count: coords.len(),
        duplicate_points,
        backtracks,
    }
}

fn parse_line(value: &Value) -> Option<Vec<Position>> {
    value
        .as_array()?
        .iter()
        .map(|point| {
            let coords = point.as_array()?;
            if coords.len() < 2 {
                return None;
            }
            coords.iter().map(Value::as_f64).collect::<Option<Position>>()
        })
        .collect()
}

fn line_to_value(line: Vec<Position>) -> Value {
    Value::Array(
        line.into_iter()
            .map(|p| Value::Array(p.into_iter().map(Value::from).collect()))
            .collect(),
    )
}

/// Lines carried by a geometry, or `None` when it is not a (Multi)LineString
/// with readable coordinates.
fn geometry_lines(geometry: &Value) -> Option<Vec<Vec<Position>>> {
    let coordinates = geometry.get("coordinates")?;
    match geometry.get("type")?.as_str()? {
        "LineString" => Some(vec![parse_line(coordinates)?]),
        "MultiLineString" => coordinates
            .as_array()?
            .iter()
            .map(parse_line)
            .collect(),
        _ => None,
    }
}

fn is_line_geometry(geometry: &Value) -> bool {
    matches!(
        geometry.get("type").and_then(Value::as_str),
        Some("LineString" | "MultiLineString")
    )
}

fn kind(value: &Value) -> Option<&str> {
    value.get("type").and_then(Value::as_str)
}

/// Leaf geometries under `geometry`, descending into GeometryCollections.
fn collect_geometries<'a>(geometry: &'a Value, out: &mut Vec<&'a Value>) {
    if kind(geometry) == Some("GeometryCollection") {
        for child in geometry.get("geometries").and_then(Value::as_array).into_iter().flatten() {
            collect_geometries(child, out);
        }
    } else {
        out.push(geometry);
    }
}

fn collect_geometries_mut<'a>(geometry: &'a mut Value, out: &mut Vec<&'a mut Value>) {
    if kind(geometry) == Some("GeometryCollection") {
        if let Some(children) = geometry.get_mut("geometries").and_then(Value::as_array_mut) {
            for child in children {
                collect_geometries_mut(child, out);
            }
        }
    } else {
        out.push(geometry);
    }
}

/// Geometries of a FeatureCollection, a single Feature or a bare geometry.
fn geometries(root: &Value) -> Vec<&Value> {
    let tops: Vec<&Value> = match kind(root) {
        Some("FeatureCollection") => root
            .get("features")
            .and_then(Value::as_array)
            .map(|features| features.iter().filter_map(|f| f.get("geometry")).collect())
            .unwrap_or_default(),
        Some("Feature") => root.get("geometry").into_iter().collect(),
        Some(_) => vec![root],
        None => Vec::new(),
    };

    let mut out = Vec::new();
    for geometry in tops {
        collect_geometries(geometry, &mut out);
    }
    out
}

fn geometries_mut(root: &mut Value) -> Vec<&mut Value> {
    let root_kind = kind(root).map(str::to_owned);
    let tops: Vec<&mut Value> = match root_kind.as_deref() {
        Some("FeatureCollection") => root
            .get_mut("features")
            .and_then(Value::as_array_mut)
            .map(|features| {
                features
                    .iter_mut()
                    .filter_map(|f| f.get_mut("geometry"))
                    .collect()
            })
            .unwrap_or_default(),
        Some("Feature") => root.get_mut("geometry").into_iter().collect(),
        Some(_) => vec![root],
        None => Vec::new(),
    };

    let mut out = Vec::new();
    for geometry in tops {
        collect_geometries_mut(geometry, &mut out);
    }
    out
}

fn feature_count(root: &Value) -> usize {
    match kind(root) {
        Some("FeatureCollection") => root
            .get("features")
            .and_then(Value::as_array)
            .map_or(0, Vec::len),
        Some("Feature") => 1,
        _ => 0,
    }
}

/// Clean every line of one geometry. `None` when a line would end up with
/// fewer than two positions, since that is no longer a valid LineString.
fn clean_lines(
    lines: &[Vec<Position>],
    window: usize,
) -> Option<Vec<(Vec<Position>, LineCleanStats)>> {
    lines
        .iter()
        .map(|line| {
            let (cleaned, stats) = clean_line(line, window);
            let collapsed = cleaned.len() < 2 && cleaned.len() < line.len();
            (!collapsed).then_some((cleaned, stats))
        })
        .collect()
}

/// Clean every LineString and MultiLineString in place, including those
/// inside GeometryCollections. Only their `coordinates` change.
///
/// Geometries that cannot be read, or that cleaning would collapse below two
/// positions (a closed ring whose start repeats inside the window), keep
/// their original coordinates and are counted in `skipped_geometries`.
pub fn clean_feature_collection(root: &mut Value, window: usize) -> CleanReport {
    let mut report = CleanReport {
        features: feature_count(root),
        ..CleanReport::default()
    };

    for geometry in geometries_mut(root) {
        let multi = match kind(geometry) {
            Some("LineString") => false,
            Some("MultiLineString") => true,
            _ => continue,
        };
        let Some(lines) = geometry_lines(geometry) else {
            tracing::warn!("Skipping line geometry with malformed coordinates");
            report.skipped_geometries += 1;
            continue;
        };
        let Some(cleaned) = clean_lines(&lines, window) else {
            tracing::warn!("Skipping line geometry that cleaning would collapse to one point");
            report.skipped_geometries += 1;
            continue;
        };

        let mut cleaned_lines = Vec::with_capacity(cleaned.len());
        for (line, stats) in cleaned {
            report.totals.absorb(&stats);
            report.lines += 1;
            cleaned_lines.push(line_to_value(line));
        }

        let coordinates = if multi {
            Value::Array(cleaned_lines)
        } else {
            cleaned_lines.pop().unwrap_or(Value::Array(Vec::new()))
        };
        geometry["coordinates"] = coordinates;
    }

    tracing::info!(
        lines = report.lines,
        removed = report.totals.points_removed(),
        backtracks = report.totals.backtracks_removed,
        skipped = report.skipped_geometries,
        "Cleaned {} lines, removed {} points",
        report.lines,
        report.totals.points_removed()
    );
    report
}

/// Same walk as [`clean_feature_collection`], reporting instead of editing.
/// Geometries the cleaner would skip are skipped here too.
pub fn analyze_feature_collection(root: &Value, window: usize) -> AnalysisReport {
    let mut report = AnalysisReport {
        features: feature_count(root),
        ..AnalysisReport::default()
    };

    for geometry in geometries(root) {
        if !is_line_geometry(geometry) {
            continue;
        }
        let Some(lines) = geometry_lines(geometry) else {
            report.skipped_geometries += 1;
            continue;
        };
        if clean_lines(&lines, window).is_none() {
            report.skipped_geometries += 1;
            continue;
        }
        for line in &lines {
            let analysis = analyze_line(line, window);
            report.lines += 1;
            report.duplicate_points += analysis.duplicate_points;
            report.backtracks += analysis.backtracks.len();
            report.backtrack_points += analysis
                .backtracks
                .iter()
                .map(Backtrack::points_removed)
                .sum::<usize>();
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_BACKTRACK_WINDOW;
    use serde_json::json;

    fn line(points: &[[f64; 2]]) -> Vec<Position> {
        points.iter().map(|p| p.to_vec()).collect()
    }

    #[test]
    fn test_reference_example() {
        let input = line(&[[0.0, 0.0], [0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [1.0, 1.0], [3.0, 3.0]]);
        let (cleaned, stats) = clean_line(&input, DEFAULT_BACKTRACK_WINDOW);

        assert_eq!(cleaned, line(&[[0.0, 0.0], [1.0, 1.0], [3.0, 3.0]]));
        assert_eq!(stats.duplicates_removed, 1);
        assert_eq!(stats.backtracks_removed, 1);
        assert_eq!(stats.backtrack_points_removed, 2);
        assert_eq!(stats.input_points, 6);
        assert_eq!(stats.output_points, 3);
    }

    #[test]
    fn test_second_pass_keeps_separate_detours() {
        let input = line(&[
            [0.0, 0.0],
            [0.0, 0.0],
            [1.0, 1.0],
            [2.0, 2.0],
            [1.0, 1.0],
            [3.0, 3.0],
            [4.0, 4.0],
            [4.0, 4.0],
            [5.0, 5.0],
        ]);
        let (once, _) = clean_line(&input, DEFAULT_BACKTRACK_WINDOW);
        let (twice, stats) = clean_line(&once, DEFAULT_BACKTRACK_WINDOW);
        assert_eq!(once, twice);
        assert_eq!(stats.points_removed(), 0);
    }

    #[test]
    fn test_second_pass_can_remove_more() {
        // Cutting [1, 0] .. [1, 0] brings the repeat of [0, 0] inside a window of 3
        let input = line(&[[0.0, 0.0], [1.0, 0.0], [2.0, 0.0], [1.0, 0.0], [0.0, 0.0], [5.0, 0.0]]);

        let (once, _) = clean_line(&input, 3);
        assert_eq!(once, line(&[[0.0, 0.0], [1.0, 0.0], [0.0, 0.0], [5.0, 0.0]]));

        let (twice, stats) = clean_line(&once, 3);
        assert_eq!(twice, line(&[[0.0, 0.0], [5.0, 0.0]]));
        assert_eq!(stats.backtracks_removed, 1);
    }

    #[test]
    fn test_closed_ring_collapses_at_line_level() {
        let ring = line(&[[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]]);
        let (cleaned, _) = clean_line(&ring, 15);
        assert_eq!(cleaned, line(&[[0.0, 0.0]]));
    }

    #[test]
    fn test_collapsing_geometry_is_kept() {
        let mut fc = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {}, "geometry": {
                    "type": "LineString",
                    "coordinates": [[0, 0], [0, 1], [1, 1], [1, 0], [0, 0]]
                }},
                {"type": "Feature", "properties": {}, "geometry": {
                    "type": "MultiLineString",
                    "coordinates": [[[0, 0], [1, 1], [2, 2], [1, 1], [3, 3]], [[4, 4], [4, 4]]]
                }}
            ]
        });
        let before = fc.clone();

        let report = clean_feature_collection(&mut fc, 15);
        let analysis = analyze_feature_collection(&before, 15);

        assert_eq!(fc, before);
        assert_eq!(report.skipped_geometries, 2);
        assert_eq!(report.lines, 0);
        assert_eq!(analysis.skipped_geometries, 2);
        assert_eq!(analysis.lines, 0);
    }

    #[test]
    fn test_geometry_collection_is_cleaned() {
        let mut fc = json!({
            "type": "Feature",
            "properties": {},
            "geometry": {
                "type": "GeometryCollection",
                "geometries": [
                    {"type": "Point", "coordinates": [9, 9]},
                    {"type": "GeometryCollection", "geometries": [{
                        "type": "LineString",
                        "coordinates": [[0, 0], [1, 1], [2, 2], [1, 1], [3, 3]]
                    }]}
                ]
            }
        });

        let report = clean_feature_collection(&mut fc, 15);

        assert_eq!(report.lines, 1);
        assert_eq!(report.totals.backtracks_removed, 1);
        assert_eq!(
            fc["geometry"]["geometries"][1]["geometries"][0]["coordinates"],
            json!([[0.0, 0.0], [1.0, 1.0], [3.0, 3.0]])
        );
        assert_eq!(fc["geometry"]["geometries"][0]["coordinates"], json!([9, 9]));
    }

    #[test]
    fn test_no_consecutive_duplicates_remain() {
        let input = line(&[[0.0, 0.0], [1.0, 0.0], [0.0, 0.0], [1.0, 0.0], [0.0, 0.0], [2.0, 0.0]]);
        let (cleaned, _) = clean_line(&input, DEFAULT_BACKTRACK_WINDOW);
        for pair in cleaned.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }

    #[test]
    fn test_backtrack_beyond_window_survives() {
        // The repeat of [0, 0] sits 4 positions later, outside a window of 4.
        let input = line(&[[0.0, 0.0], [1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [0.0, 0.0]]);
        let (narrow, _) = clean_line(&input, 4);
        assert_eq!(narrow, input);

        let (wide, stats) = clean_line(&input, 5);
        assert_eq!(wide, line(&[[0.0, 0.0]]));
        assert_eq!(stats.backtrack_points_removed, 4);
    }

    #[test]
    fn test_short_lines() {
        assert_eq!(clean_line(&[], 15).0, Vec::<Position>::new());
        let single = line(&[[5.0, 5.0]]);
        assert_eq!(clean_line(&single, 15).0, single);
    }

    #[test]
    fn test_altitude_takes_part_in_equality() {
        let input = vec![
            vec![0.0, 0.0, 10.0],
            vec![0.0, 0.0, 12.0],
            vec![1.0, 1.0, 0.0],
            vec![0.0, 0.0, 11.0],
        ];
        let (cleaned, stats) = clean_line(&input, 15);
        assert_eq!(stats.duplicates_removed, 0);
        assert_eq!(stats.backtracks_removed, 0);
        assert_eq!(cleaned, input);
    }

    #[test]
    fn test_analysis_matches_cleaning() {
        let input = line(&[
            [0.0, 0.0],
            [1.0, 1.0],
            [1.0, 1.0],
            [2.0, 2.0],
            [1.0, 1.0],
            [5.0, 5.0],
            [6.0, 6.0],
            [5.0, 5.0],
        ]);
        let analysis = analyze_line(&input, 15);
        let (_, stats) = clean_line(&input, 15);

        assert_eq!(analysis.duplicate_points, stats.duplicates_removed);
        assert_eq!(analysis.backtracks.len(), stats.backtracks_removed);
        assert_eq!(
            analysis.backtracks,
            vec![Backtrack { start: 1, end: 3 }, Backtrack { start: 4, end: 6 }]
        );
    }

    #[test]
    fn test_feature_collection_cleaning() {
        let mut fc = json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {"name": "route"},
                    "geometry": {
                        "type": "LineString",
                        "coordinates": [[0, 0], [0, 0], [1, 1], [2, 2], [1, 1], [3, 3]]
                    }
                },
                {
                    "type": "Feature",
                    "properties": {},
                    "geometry": {
                        "type": "MultiLineString",
                        "coordinates": [
                            [[0, 0], [1, 0], [0, 0], [2, 0]],
                            [[5, 5], [5, 5], [6, 6]]
                        ]
                    }
                },
                {
                    "type": "Feature",
                    "properties": {},
                    "geometry": {"type": "Point", "coordinates": [1, 1]}
                }
            ]
        });

        let report = clean_feature_collection(&mut fc, 15);

        assert_eq!(report.features, 3);
        assert_eq!(report.lines, 3);
        assert_eq!(report.skipped_geometries, 0);
        assert_eq!(
            fc["features"][0]["geometry"]["coordinates"],
            json!([[0.0, 0.0], [1.0, 1.0], [3.0, 3.0]])
        );
        assert_eq!(
            fc["features"][1]["geometry"]["coordinates"],
            json!([[[0.0, 0.0], [2.0, 0.0]], [[5.0, 5.0], [6.0, 6.0]]])
        );
        assert_eq!(fc["features"][0]["properties"]["name"], "route");
        assert_eq!(fc["features"][2]["geometry"]["coordinates"], json!([1, 1]));
    }

    #[test]
    fn test_malformed_geometry_passes_through() {
        let mut fc = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[0, 0], "x"]}},
                {"type": "Feature", "geometry": {"type": "LineString"}},
                {"type": "Feature", "geometry": null}
            ]
        });
        let before = fc.clone();

        let report = clean_feature_collection(&mut fc, 15);

        assert_eq!(fc, before);
        assert_eq!(report.lines, 0);
        assert_eq!(report.skipped_geometries, 2);
    }

    #[test]
    fn test_feature_collection_analysis_leaves_input_alone() {
        let fc = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": {
                    "type": "LineString",
                    "coordinates": [[0, 0], [0, 0], [1, 1], [2, 2], [1, 1], [3, 3]]
                }
            }]
        });
        let before = fc.clone();

        let report = analyze_feature_collection(&fc, 15);

        assert_eq!(fc, before);
        assert_eq!(report.lines, 1);
        assert_eq!(report.duplicate_points, 1);
        assert_eq!(report.backtracks, 1);
        assert_eq!(report.backtrack_points, 2);
    }
}
