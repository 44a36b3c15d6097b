use crate::item::RatingAssignment;
use crate::tier::TierBounds;

/// Evenly spaced ratings for `n` ordered slots inside `bounds`.
///
/// Slot `i` receives `lower + (i + 1) * (upper - lower) / n`. The last slot
/// is pinned to `upper`, so a lone item always sits on the tier ceiling.
pub fn allocate_ratings(bounds: TierBounds, n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }

    let step = bounds.width() / n as f64;
    let mut ratings: Vec<f64> = (0..n)
        .map(|i| bounds.lower + (i as f64 + 1.0) * step)
        .collect();
    ratings[n - 1] = bounds.upper;
    ratings
}

/// Assign ratings to an already ordered group (worst first).
///
/// Every member is re-rated from its position; previous ratings play no part.
pub fn allocate<S: AsRef<str>>(
    bounds: TierBounds,
    tier_id: &str,
    ordered_ids: &[S],
) -> Vec<RatingAssignment> {
    ordered_ids
        .iter()
        .zip(allocate_ratings(bounds, ordered_ids.len()))
        .map(|(id, rating)| RatingAssignment {
            item_id: id.as_ref().to_string(),
            tier_id: tier_id.to_string(),
            rating,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: TierBounds = TierBounds {
        lower: 6.66,
        upper: 10.0,
    };

    #[test]
    fn test_single_item_pinned_to_ceiling() {
        assert_eq!(allocate_ratings(GOOD, 1), vec![10.0]);
    }

    #[test]
    fn test_empty_group() {
        assert!(allocate_ratings(GOOD, 0).is_empty());
    }

    #[test]
    fn test_four_items_in_good_tier() {
        let ratings = allocate_ratings(GOOD, 4);
        let expected = [7.495, 8.33, 9.165, 10.0];

        assert_eq!(ratings.len(), 4);
        for (got, want) in ratings.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "{} != {}", got, want);
        }
        assert_eq!(ratings[3], 10.0);
    }

    #[test]
    fn test_ratings_strictly_increasing_within_bounds() {
        let bounds = TierBounds {
            lower: 3.33,
            upper: 6.66,
        };

        for n in 1..=64 {
            let ratings = allocate_ratings(bounds, n);
            assert_eq!(ratings.len(), n);
            assert_eq!(*ratings.last().unwrap(), bounds.upper);
            assert!(ratings.iter().all(|r| bounds.contains(*r)));
            assert!(ratings.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_allocate_keeps_order_of_ids() {
        let ids = ["c", "a", "b"];
        let assignments = allocate(GOOD, "good", &ids);

        let order: Vec<&str> = assignments.iter().map(|a| a.item_id.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
        assert!(assignments.iter().all(|a| a.tier_id == "good"));
        assert_eq!(assignments[2].rating, 10.0);
    }

    #[test]
    fn test_allocate_is_deterministic() {
        let ids = vec!["x".to_string(), "y".to_string(), "z".to_string()];
        assert_eq!(allocate(GOOD, "good", &ids), allocate(GOOD, "good", &ids));
    }
}
