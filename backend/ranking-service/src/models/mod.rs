use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tier_ranking::{Item, ItemFields, RatingAssignment, Tier};

/// Body of `POST /categories/{category_id}/items`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankItemRequest {
    pub tier_id: String,
    #[serde(default)]
    pub item: NewItem,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewItem {
    /// Generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub fields: ItemFields,
}

/// Body of `POST /categories/{category_id}/items/{item_id}/rank`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankItemRequest {
    pub tier_id: String,
}

/// Body of `POST /sessions/{token}/comparisons`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonRequest {
    pub new_item_is_better: bool,
}

/// Body of `PUT /categories/{category_id}/tiers`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTiersRequest {
    pub tiers: Vec<Tier>,
}

/// Result of one placement step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RankResponse {
    /// Placement finished. `ratings` holds every rating that was rewritten:
    /// the whole tier placed into, plus the tier a moved item left.
    Allocated {
        tier_id: String,
        item_id: String,
        comparisons: u32,
        ratings: Vec<RatingAssignment>,
    },
    /// Show `pivot` to the user and submit their answer under `session_token`.
    ComparisonRequired {
        session_token: String,
        pivot: Item,
        comparisons: u32,
        /// Worst case number of comparisons still to come.
        max_remaining: u32,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RerankResponse {
    pub category_id: String,
    pub tiers: Vec<Tier>,
    pub ratings: Vec<RatingAssignment>,
    pub updated_at_refreshed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: DateTime<Utc>,
}

/// Body of `GET /categories/{category_id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryView {
    pub category_id: String,
    pub tiers: Vec<Tier>,
    /// Highest rating first.
    pub items: Vec<Item>,
}
