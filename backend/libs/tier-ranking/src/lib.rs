//! # tier-ranking
//!
//! Binary-insertion ranking over tiered rating bands.
//!
//! A category's rating scale `[0, 10]` is split into tiers by their upper
//! cutoffs. A new item is first given a tier by its owner, then placed inside
//! that tier through pairwise comparisons (one binary choice per step), and
//! finally every item of the tier is re-rated from its position so ratings
//! stay evenly spaced. When cutoffs move, the whole category is re-derived in
//! one pass.
//!
//! - [`tier`] - tier ordering, bounds and classification
//! - [`allocation`] - position to rating
//! - [`insertion`] - the interactive comparison session
//! - [`rerank`] - category-wide re-derivation after a tier edit
//! - [`engine`] - the step-by-step flow combining the above
//!
//! Nothing here performs I/O or keeps state between calls.

pub mod allocation;
pub mod engine;
pub mod error;
pub mod insertion;
pub mod item;
pub mod rerank;
pub mod tier;

pub use allocation::{allocate, allocate_ratings};
pub use engine::{collect_group, rank_new_item, submit_comparison, AllocationResult, RankStep};
pub use error::{RankingError, Result};
pub use insertion::{max_comparisons, InsertionSession, InsertionState, OrderedGroup};
pub use item::{Item, ItemFields, PendingItem, RatingAssignment};
pub use rerank::{bulk_rerank, RerankOutcome};
pub use tier::{bounds_of, classify, sort_tiers, Tier, TierBounds, TierLadder, SCALE_MAX, SCALE_MIN};
