//! Category persistence.
//!
//! The ranking flow only needs three things from storage: the tiers of a
//! category, all of its items, and a way to write a batch of changes
//! atomically. [`CategoryStore`] is that contract.
//!
//! Every category carries a version that each successful commit bumps. A
//! batch names the version it was computed from and the store refuses it
//! with [`StoreError::Stale`] when another writer got there first, so
//! several service replicas can share one database.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryCategoryStore;
pub use postgres::PgCategoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tier_ranking::{Item, ItemFields, RatingAssignment, Tier};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Unknown item: {0}")]
    UnknownItem(String),

    #[error("Category changed concurrently: {0}")]
    Stale(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A single item write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemUpsert {
    pub id: String,
    pub tier_id: String,
    pub rating: f64,
    /// `Some` creates the item (or replaces its fields); `None` only moves
    /// an item that must already exist.
    pub fields: Option<ItemFields>,
}

impl ItemUpsert {
    pub fn rerated(assignment: RatingAssignment) -> Self {
        Self {
            id: assignment.item_id,
            tier_id: assignment.tier_id,
            rating: assignment.rating,
            fields: None,
        }
    }
}

/// Tiers of a category and the version they were read at.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryHead {
    pub tiers: Vec<Tier>,
    pub version: i64,
}

/// Changes that must land together or not at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    /// Version the batch was computed from. `None` requires the category
    /// to be absent, which only makes sense together with `tiers`.
    pub expected_version: Option<i64>,
    /// Replaces the category's tiers, creating the category if needed.
    pub tiers: Option<Vec<Tier>>,
    pub upserts: Vec<ItemUpsert>,
    pub touch_updated_at: bool,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// `None` when the category does not exist.
    async fn load_category(&self, category_id: &str) -> StoreResult<Option<CategoryHead>>;

    /// All items of the category in creation order.
    async fn load_items(&self, category_id: &str) -> StoreResult<Vec<Item>>;

    /// Apply `batch` atomically and bump the category version.
    ///
    /// Fails with [`StoreError::Stale`] when the stored version is not
    /// `batch.expected_version`.
    async fn commit(&self, category_id: &str, batch: WriteBatch) -> StoreResult<()>;
}
