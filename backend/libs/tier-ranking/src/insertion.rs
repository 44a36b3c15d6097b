//! Binary-insertion ranking.
//!
//! A new item is placed among the existing items of one tier by asking the
//! user to compare it with a pivot, halving the candidate range each time.
//! The whole interaction is captured in [`InsertionSession`], a plain
//! serializable value, so it can be parked in a cache between requests.

use crate::allocation::allocate;
use crate::error::{RankingError, Result};
use crate::item::{Item, PendingItem, RatingAssignment};
use crate::tier::TierBounds;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::trace;

/// Where an insertion session stands.
///
/// `lo` and `hi` are inclusive bounds over the group; while awaiting a
/// comparison `lo <= hi` always holds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum InsertionState {
    AwaitingComparison { lo: usize, hi: usize, pivot: usize },
    Resolved { index: usize },
}

impl InsertionState {
    fn awaiting(lo: usize, hi: usize) -> Self {
        InsertionState::AwaitingComparison {
            lo,
            hi,
            pivot: (lo + hi) / 2,
        }
    }
}

/// One in-progress placement of a new item into a tier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InsertionSession {
    tier_id: String,
    bounds: TierBounds,
    new_item: PendingItem,
    group: Vec<Item>,
    state: InsertionState,
    comparisons: u32,
}

impl InsertionSession {
    /// Start placing `new_item` into `sorted_group` (ascending by rating).
    ///
    /// An empty group resolves straight away at index 0.
    pub fn begin(
        tier_id: impl Into<String>,
        bounds: TierBounds,
        new_item: PendingItem,
        sorted_group: Vec<Item>,
    ) -> Result<Self> {
        let tier_id = tier_id.into();
        validate_group(&tier_id, &new_item, &sorted_group)?;

        let state = if sorted_group.is_empty() {
            InsertionState::Resolved { index: 0 }
        } else {
            InsertionState::awaiting(0, sorted_group.len() - 1)
        };

        trace!(
            tier_id = %tier_id,
            item_id = %new_item.id,
            group_len = sorted_group.len(),
            "insertion session started"
        );

        Ok(Self {
            tier_id,
            bounds,
            new_item,
            group: sorted_group,
            state,
            comparisons: 0,
        })
    }

    /// Record one comparison against the current pivot.
    ///
    /// "Better" covers ties: the new item then lands right of the pivot.
    pub fn choose(&mut self, new_item_is_better: bool) -> Result<InsertionState> {
        let (lo, hi, pivot) = match self.state {
            InsertionState::AwaitingComparison { lo, hi, pivot } => (lo, hi, pivot),
            InsertionState::Resolved { .. } => return Err(RankingError::AlreadyResolved),
        };

        self.comparisons += 1;
        self.state = if new_item_is_better {
            let lo = pivot + 1;
            if lo > hi {
                InsertionState::Resolved { index: lo }
            } else {
                InsertionState::awaiting(lo, hi)
            }
        } else if pivot == lo {
            // hi would drop below lo
            InsertionState::Resolved { index: lo }
        } else {
            InsertionState::awaiting(lo, pivot - 1)
        };

        trace!(
            item_id = %self.new_item.id,
            better = new_item_is_better,
            comparisons = self.comparisons,
            state = ?self.state,
            "comparison recorded"
        );

        Ok(self.state)
    }

    /// The item the user should compare against, unless resolved.
    pub fn pivot_item(&self) -> Option<&Item> {
        match self.state {
            InsertionState::AwaitingComparison { pivot, .. } => self.group.get(pivot),
            InsertionState::Resolved { .. } => None,
        }
    }

    pub fn insertion_index(&self) -> Option<usize> {
        match self.state {
            InsertionState::Resolved { index } => Some(index),
            InsertionState::AwaitingComparison { .. } => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.state, InsertionState::Resolved { .. })
    }

    pub fn state(&self) -> InsertionState {
        self.state
    }

    pub fn comparisons(&self) -> u32 {
        self.comparisons
    }

    pub fn bounds(&self) -> TierBounds {
        self.bounds
    }

    pub fn new_item(&self) -> &PendingItem {
        &self.new_item
    }

    /// The group with the new item spliced in at its insertion index.
    pub fn into_ordered_group(self) -> Result<OrderedGroup> {
        let index = self.insertion_index().ok_or_else(|| {
            RankingError::InvalidGroupState("insertion session is not resolved yet".to_string())
        })?;

        let mut item_ids: Vec<String> = self.group.into_iter().map(|item| item.id).collect();
        item_ids.insert(index, self.new_item.id);

        Ok(OrderedGroup {
            tier_id: self.tier_id,
            bounds: self.bounds,
            item_ids,
            inserted_index: index,
        })
    }
}

/// Final order of a tier after an insertion, ready for re-rating.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderedGroup {
    pub tier_id: String,
    pub bounds: TierBounds,
    /// Worst first.
    pub item_ids: Vec<String>,
    pub inserted_index: usize,
}

impl OrderedGroup {
    /// Ratings for every member, not only the inserted one.
    pub fn allocate(&self) -> Vec<RatingAssignment> {
        allocate(self.bounds, &self.tier_id, &self.item_ids)
    }
}

/// Upper bound on comparisons for a group of `n`: `ceil(log2(n + 1))`.
pub fn max_comparisons(n: usize) -> u32 {
    usize::BITS - n.leading_zeros()
}

fn validate_group(tier_id: &str, new_item: &PendingItem, group: &[Item]) -> Result<()> {
    let mut ids = HashSet::with_capacity(group.len());

    for item in group {
        if item.tier_id != tier_id {
            return Err(RankingError::InvalidGroupState(format!(
                "item '{}' belongs to tier '{}', not '{}'",
                item.id, item.tier_id, tier_id
            )));
        }
        if !item.rating.is_finite() {
            return Err(RankingError::InvalidGroupState(format!(
                "item '{}' has no usable rating",
                item.id
            )));
        }
        if !ids.insert(item.id.as_str()) {
            return Err(RankingError::InvalidGroupState(format!(
                "item '{}' appears twice in the group",
                item.id
            )));
        }
    }

    if ids.contains(new_item.id.as_str()) {
        return Err(RankingError::InvalidGroupState(format!(
            "item '{}' is already part of the group",
            new_item.id
        )));
    }

    if let Some(pair) = group.windows(2).find(|w| w[1].rating < w[0].rating) {
        return Err(RankingError::InvalidGroupState(format!(
            "group is not sorted: '{}' ({}) precedes '{}' ({})",
            pair[0].id, pair[0].rating, pair[1].id, pair[1].rating
        )));
    }

    Ok(())
}
