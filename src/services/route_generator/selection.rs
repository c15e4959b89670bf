use std::cmp::Ordering;

use crate::models::RouteCandidate;

/// Successful candidate with the smallest percentage deviation.
///
/// Failed candidates are ignored. On equal deviation the candidate that
/// appears first wins, so the order of the ratio sweep is the tie-breaker.
pub fn select_best(candidates: &[RouteCandidate]) -> Option<&RouteCandidate> {
    candidates
        .iter()
        .filter(|c| c.success)
        .min_by(|a, b| {
            a.deviation_pct
                .partial_cmp(&b.deviation_pct)
                .unwrap_or(Ordering::Equal)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn candidate(ratio: f64, deviation_pct: f64, success: bool) -> RouteCandidate {
        if !success {
            return RouteCandidate::failed(ratio, 0.0, 0.0, Vec::new(), "no path".to_string());
        }
        RouteCandidate {
            id: Uuid::new_v4(),
            ratio,
            perimeter_m: 0.0,
            side_length_m: 0.0,
            corners: Vec::new(),
            node_path: Vec::new(),
            path: Vec::new(),
            total_length_m: 0.0,
            deviation_m: 0.0,
            deviation_pct,
            success,
            failure_reason: None,
            degraded_legs: Vec::new(),
            missing_edges: 0,
        }
    }

    #[test]
    fn test_empty_list() {
        assert!(select_best(&[]).is_none());
    }

    #[test]
    fn test_all_failed() {
        let candidates = vec![candidate(7.0, 1.0, false), candidate(6.5, 2.0, false)];
        assert!(select_best(&candidates).is_none());
    }

    #[test]
    fn test_lowest_deviation_wins() {
        let candidates = vec![
            candidate(7.0, 12.0, true),
            candidate(6.5, 3.5, true),
            candidate(6.0, 8.0, true),
        ];
        assert_eq!(select_best(&candidates).unwrap().ratio, 6.5);
    }

    #[test]
    fn test_failed_candidates_are_skipped() {
        let candidates = vec![candidate(7.0, 0.0, false), candidate(6.0, 40.0, true)];
        assert_eq!(select_best(&candidates).unwrap().ratio, 6.0);
    }

    #[test]
    fn test_ties_keep_first() {
        let candidates = vec![
            candidate(7.0, 5.0, true),
            candidate(6.5, 5.0, true),
            candidate(6.0, 5.0, true),
        ];
        assert_eq!(select_best(&candidates).unwrap().ratio, 7.0);
    }
}
