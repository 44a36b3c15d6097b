use crate::error::Result;
use crate::insertion::InsertionSession;
use crate::item::{Item, PendingItem, RatingAssignment};
use crate::tier::TierLadder;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Ratings to persist once a placement is settled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllocationResult {
    pub tier_id: String,
    /// The item that was placed.
    pub item_id: String,
    pub comparisons: u32,
    /// Every member of the tier, worst first, the placed item included.
    pub assignments: Vec<RatingAssignment>,
}

impl AllocationResult {
    pub fn rating_of(&self, item_id: &str) -> Option<f64> {
        self.assignments
            .iter()
            .find(|a| a.item_id == item_id)
            .map(|a| a.rating)
    }
}

/// Outcome of one step of a placement.
#[derive(Debug, Clone, PartialEq)]
pub enum RankStep {
    Allocated(AllocationResult),
    /// Another comparison is needed; the session's pivot is the item to show.
    Compare(InsertionSession),
}

/// Items of `tier_id` sorted ascending by rating, `exclude` left out.
/// Equal ratings keep their input order.
pub fn collect_group<'a, I>(tier_id: &str, items: I, exclude: Option<&str>) -> Vec<Item>
where
    I: IntoIterator<Item = &'a Item>,
{
    let mut group: Vec<Item> = items
        .into_iter()
        .filter(|item| item.tier_id == tier_id && Some(item.id.as_str()) != exclude)
        .cloned()
        .collect();
    group.sort_by(|a, b| {
        a.rating
            .partial_cmp(&b.rating)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    group
}

/// Start placing `new_item` into `tier_id` among `items` (the whole
/// category; other tiers are ignored).
pub fn rank_new_item(
    ladder: &TierLadder,
    tier_id: &str,
    new_item: PendingItem,
    items: &[Item],
) -> Result<RankStep> {
    let bounds = ladder.bounds_of(tier_id)?;
    let group = collect_group(tier_id, items, Some(new_item.id.as_str()));
    let session = InsertionSession::begin(tier_id, bounds, new_item, group)?;
    settle(session)
}

/// Feed one comparison into a live session.
pub fn submit_comparison(
    mut session: InsertionSession,
    new_item_is_better: bool,
) -> Result<RankStep> {
    session.choose(new_item_is_better)?;
    settle(session)
}

fn settle(session: InsertionSession) -> Result<RankStep> {
    if !session.is_resolved() {
        return Ok(RankStep::Compare(session));
    }

    let comparisons = session.comparisons();
    let item_id = session.new_item().id.clone();
    let ordered = session.into_ordered_group()?;

    debug!(
        tier_id = %ordered.tier_id,
        item_id = %item_id,
        index = ordered.inserted_index,
        comparisons,
        "placement resolved"
    );

    Ok(RankStep::Allocated(AllocationResult {
        assignments: ordered.allocate(),
        tier_id: ordered.tier_id,
        item_id,
        comparisons,
    }))
}
