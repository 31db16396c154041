//! Similarity between two drilldowns
//!
//! Drilldowns are sampled independently, so the overlap of B seen from A and
//! of A seen from B can differ or be missing on one side.

/// Geometric-mean overlap coefficient `sqrt(ab * ba) / sqrt(a * b)`.
///
/// `a`/`b` are total participant counts; `ab` is the overlap recorded for
/// the second community in the first drilldown, `ba` the reverse. A missing
/// side borrows the other side's value. Returns None when neither side
/// recorded an overlap, whatever the totals; otherwise 0 when either total
/// is 0.
pub fn similarity_score(a: u64, b: u64, ab: Option<u64>, ba: Option<u64>) -> Option<f64> {
    let (ab, ba) = match (ab, ba) {
        (Some(ab), Some(ba)) => (ab, ba),
        (Some(ab), None) => (ab, ab),
        (None, Some(ba)) => (ba, ba),
        (None, None) => return None,
    };

    if a == 0 || b == 0 {
        return Some(0.0);
    }

    let overlap = (ab as f64 * ba as f64).sqrt();
    let size = (a as f64 * b as f64).sqrt();
    Some(overlap / size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_missing_side_borrows_other() {
        let score = similarity_score(100, 50, None, Some(20)).unwrap();
        assert!(approx(score, 0.2828), "{score}");
        assert_eq!(similarity_score(100, 50, Some(20), None), Some(score));
    }

    #[test]
    fn test_zero_totals() {
        assert_eq!(similarity_score(0, 50, Some(3), Some(3)), Some(0.0));
        assert_eq!(similarity_score(40, 0, None, Some(2)), Some(0.0));
    }

    #[test]
    fn test_unknown_wins_over_zero_total() {
        assert_eq!(similarity_score(0, 50, None, None), None);
        assert_eq!(similarity_score(40, 0, None, None), None);
    }

    #[test]
    fn test_unknown_is_not_zero() {
        assert_eq!(similarity_score(100, 50, None, None), None);
    }

    #[test]
    fn test_symmetric_and_bounded() {
        let ab = similarity_score(80, 30, Some(12), Some(9)).unwrap();
        let ba = similarity_score(30, 80, Some(9), Some(12)).unwrap();
        assert!(approx(ab, ba));
        assert!(ab > 0.0 && ab <= 1.0);
        assert!(approx(similarity_score(10, 10, Some(10), Some(10)).unwrap(), 1.0));
    }
}
