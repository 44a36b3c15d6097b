use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form user fields carried alongside an item.
pub type ItemFields = Map<String, Value>;

/// A ranked entry of a category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: String,
    pub tier_id: String,
    pub rating: f64,
    #[serde(default)]
    pub fields: ItemFields,
}

impl Item {
    pub fn new(id: impl Into<String>, tier_id: impl Into<String>, rating: f64) -> Self {
        Self {
            id: id.into(),
            tier_id: tier_id.into(),
            rating,
            fields: ItemFields::new(),
        }
    }
}

/// An item waiting for its rating. Also used when an existing item is
/// placed into a tier again.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingItem {
    pub id: String,
    #[serde(default)]
    pub fields: ItemFields,
}

impl PendingItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: ItemFields::new(),
        }
    }

    pub fn with_fields(mut self, fields: ItemFields) -> Self {
        self.fields = fields;
        self
    }
}

/// One persisted outcome: the rating and tier an item ends up with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatingAssignment {
    pub item_id: String,
    pub tier_id: String,
    pub rating: f64,
}
