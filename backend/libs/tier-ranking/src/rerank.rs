use crate::allocation::allocate;
use crate::error::{RankingError, Result};
use crate::item::{Item, RatingAssignment};
use crate::tier::{Tier, TierLadder};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Output of a category-wide rerank.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RerankOutcome {
    /// The tiers the assignments were derived from, sorted by cutoff.
    pub tiers: Vec<Tier>,
    /// One entry per input item. Persist all of them or none.
    pub assignments: Vec<RatingAssignment>,
    /// The category's modification marker must be refreshed.
    pub touch_updated_at: bool,
}

/// Reassign every item of a category to a tier under `new_tiers` and
/// recompute all ratings.
///
/// Items are classified by their previous rating; within a tier they keep
/// their previous relative order (input order breaks ties). The whole result
/// is rejected if any allocated rating falls outside its own tier.
pub fn bulk_rerank(items: &[Item], new_tiers: Vec<Tier>) -> Result<RerankOutcome> {
    let ladder = TierLadder::new(new_tiers)?;

    if let Some(item) = items.iter().find(|item| !item.rating.is_finite()) {
        return Err(RankingError::InvalidGroupState(format!(
            "item '{}' has no usable rating",
            item.id
        )));
    }

    // Bucket per tier, in ladder order.
    let mut buckets: Vec<Vec<&Item>> = vec![Vec::new(); ladder.tiers().len()];
    for item in items {
        let tier = ladder.classify(item.rating);
        let slot = ladder
            .tiers()
            .iter()
            .position(|t| t.id == tier.id)
            .ok_or_else(|| RankingError::AllocationFault(format!("tier '{}' vanished", tier.id)))?;
        buckets[slot].push(item);
    }

    let mut assignments = Vec::with_capacity(items.len());
    for (tier, mut bucket) in ladder.tiers().iter().zip(buckets) {
        if bucket.is_empty() {
            continue;
        }

        // Stable: equal ratings keep input order.
        bucket.sort_by(|a, b| {
            a.rating
                .partial_cmp(&b.rating)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let bounds = ladder.bounds_of(&tier.id)?;
        let ids: Vec<&str> = bucket.iter().map(|item| item.id.as_str()).collect();
        let allocated = allocate(bounds, &tier.id, &ids);

        if allocated.len() != bucket.len() {
            return Err(RankingError::AllocationFault(format!(
                "tier '{}' allocated {} ratings for {} items",
                tier.id,
                allocated.len(),
                bucket.len()
            )));
        }
        if let Some(stray) = allocated
            .iter()
            .find(|a| ladder.classify(a.rating).id != tier.id)
        {
            return Err(RankingError::AllocationFault(format!(
                "item '{}' rated {} falls outside tier '{}'",
                stray.item_id, stray.rating, tier.id
            )));
        }

        debug!(tier_id = %tier.id, items = bucket.len(), "tier re-rated");
        assignments.extend(allocated);
    }

    Ok(RerankOutcome {
        tiers: ladder.into_tiers(),
        assignments,
        touch_updated_at: true,
    })
}
