use super::{CategoryHead, CategoryStore, StoreError, StoreResult, WriteBatch};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tier_ranking::{Item, Tier};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct CategoryRecord {
    tiers: Vec<Tier>,
    items: Vec<Item>,
    version: i64,
    updated_at: DateTime<Utc>,
}

/// Process-local store, used when no database is configured and in tests.
#[derive(Debug, Default)]
pub struct InMemoryCategoryStore {
    categories: RwLock<HashMap<String, CategoryRecord>>,
}

impl InMemoryCategoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a category directly, bypassing the ranking flow. The seeded
    /// category starts at version 0.
    pub async fn insert_category(&self, category_id: &str, tiers: Vec<Tier>, items: Vec<Item>) {
        self.categories.write().await.insert(
            category_id.to_string(),
            CategoryRecord {
                tiers,
                items,
                version: 0,
                updated_at: Utc::now(),
            },
        );
    }

    pub async fn updated_at(&self, category_id: &str) -> Option<DateTime<Utc>> {
        self.categories
            .read()
            .await
            .get(category_id)
            .map(|record| record.updated_at)
    }
}

#[async_trait]
impl CategoryStore for InMemoryCategoryStore {
    async fn load_category(&self, category_id: &str) -> StoreResult<Option<CategoryHead>> {
        Ok(self
            .categories
            .read()
            .await
            .get(category_id)
            .map(|record| CategoryHead {
                tiers: record.tiers.clone(),
                version: record.version,
            }))
    }

    async fn load_items(&self, category_id: &str) -> StoreResult<Vec<Item>> {
        Ok(self
            .categories
            .read()
            .await
            .get(category_id)
            .map(|record| record.items.clone())
            .unwrap_or_default())
    }

    async fn commit(&self, category_id: &str, batch: WriteBatch) -> StoreResult<()> {
        let mut categories = self.categories.write().await;

        // Work on a copy so a failing batch leaves nothing behind.
        let mut record = match (categories.get(category_id), batch.expected_version) {
            (Some(existing), Some(expected)) if existing.version == expected => existing.clone(),
            (Some(_), _) => return Err(StoreError::Stale(category_id.to_string())),
            (None, None) if batch.tiers.is_some() => CategoryRecord {
                tiers: Vec::new(),
                items: Vec::new(),
                version: 0,
                updated_at: Utc::now(),
            },
            (None, _) => return Err(StoreError::UnknownCategory(category_id.to_string())),
        };
        record.version += 1;

        if let Some(tiers) = batch.tiers {
            record.tiers = tiers;
        }

        for upsert in batch.upserts {
            match record.items.iter_mut().find(|item| item.id == upsert.id) {
                Some(item) => {
                    item.tier_id = upsert.tier_id;
                    item.rating = upsert.rating;
                    if let Some(fields) = upsert.fields {
                        item.fields = fields;
                    }
                }
                None => match upsert.fields {
                    Some(fields) => record.items.push(Item {
                        id: upsert.id,
                        tier_id: upsert.tier_id,
                        rating: upsert.rating,
                        fields,
                    }),
                    None => return Err(StoreError::UnknownItem(upsert.id)),
                },
            }
        }

        if batch.touch_updated_at {
            record.updated_at = Utc::now();
        }

        categories.insert(category_id.to_string(), record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::ItemUpsert;
    use tier_ranking::ItemFields;

    fn upsert(id: &str, rating: f64, fields: Option<ItemFields>) -> ItemUpsert {
        ItemUpsert {
            id: id.to_string(),
            tier_id: "good".to_string(),
            rating,
            fields,
        }
    }

    #[tokio::test]
    async fn test_commit_creates_category_with_tiers() {
        let store = InMemoryCategoryStore::new();
        let batch = WriteBatch {
            expected_version: None,
            tiers: Some(vec![Tier::new("good", "Good", 10.0)]),
            upserts: vec![upsert("a", 10.0, Some(ItemFields::new()))],
            touch_updated_at: true,
        };

        store.commit("films", batch).await.unwrap();

        let head = store.load_category("films").await.unwrap().unwrap();
        assert_eq!(head.tiers.len(), 1);
        assert_eq!(head.version, 1);
        assert_eq!(store.load_items("films").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_commit_without_category_fails() {
        let store = InMemoryCategoryStore::new();
        let result = store.commit("missing", WriteBatch::default()).await;
        assert!(matches!(result, Err(StoreError::UnknownCategory(_))));
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_no_partial_writes() {
        let store = InMemoryCategoryStore::new();
        store
            .insert_category(
                "films",
                vec![Tier::new("good", "Good", 10.0)],
                vec![Item::new("a", "good", 10.0)],
            )
            .await;

        let batch = WriteBatch {
            expected_version: Some(0),
            tiers: None,
            upserts: vec![upsert("a", 8.0, None), upsert("ghost", 10.0, None)],
            touch_updated_at: true,
        };
        let result = store.commit("films", batch).await;

        assert!(matches!(result, Err(StoreError::UnknownItem(id)) if id == "ghost"));
        let items = store.load_items("films").await.unwrap();
        assert_eq!(items[0].rating, 10.0);
        assert_eq!(store.load_category("films").await.unwrap().unwrap().version, 0);
    }

    #[tokio::test]
    async fn test_rerating_keeps_fields_and_order() {
        let store = InMemoryCategoryStore::new();
        let mut fields = ItemFields::new();
        fields.insert("title".to_string(), serde_json::json!("Alien"));

        let mut first = Item::new("a", "good", 10.0);
        first.fields = fields.clone();
        store
            .insert_category(
                "films",
                vec![Tier::new("good", "Good", 10.0)],
                vec![first, Item::new("b", "good", 9.0)],
            )
            .await;

        let batch = WriteBatch {
            expected_version: Some(0),
            upserts: vec![upsert("a", 7.0, None)],
            ..Default::default()
        };
        store.commit("films", batch).await.unwrap();

        let items = store.load_items("films").await.unwrap();
        assert_eq!(items[0].id, "a");
        assert_eq!(items[0].rating, 7.0);
        assert_eq!(items[0].fields, fields);
    }

    #[tokio::test]
    async fn test_commit_from_old_version_is_stale() {
        let store = InMemoryCategoryStore::new();
        store
            .insert_category(
                "films",
                vec![Tier::new("good", "Good", 10.0)],
                vec![Item::new("a", "good", 10.0)],
            )
            .await;

        let first = WriteBatch {
            expected_version: Some(0),
            upserts: vec![upsert("a", 9.0, None)],
            ..Default::default()
        };
        store.commit("films", first.clone()).await.unwrap();

        // A second writer that read version 0 as well loses.
        let result = store.commit("films", first).await;
        assert!(matches!(result, Err(StoreError::Stale(_))));

        // So does creating a category that already exists.
        let create = WriteBatch {
            expected_version: None,
            tiers: Some(vec![Tier::new("good", "Good", 10.0)]),
            ..Default::default()
        };
        let result = store.commit("films", create).await;
        assert!(matches!(result, Err(StoreError::Stale(_))));

        assert_eq!(store.load_category("films").await.unwrap().unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_touch_updated_at() {
        let store = InMemoryCategoryStore::new();
        store
            .insert_category(
                "films",
                vec![Tier::new("good", "Good", 10.0)],
                vec![Item::new("a", "good", 10.0)],
            )
            .await;
        let seeded = store.updated_at("films").await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let untouched = WriteBatch {
            expected_version: Some(0),
            upserts: vec![upsert("a", 9.0, None)],
            touch_updated_at: false,
            ..Default::default()
        };
        store.commit("films", untouched).await.unwrap();
        assert_eq!(store.updated_at("films").await.unwrap(), seeded);

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let touched = WriteBatch {
            expected_version: Some(1),
            upserts: vec![upsert("a", 10.0, None)],
            touch_updated_at: true,
            ..Default::default()
        };
        store.commit("films", touched).await.unwrap();
        assert!(store.updated_at("films").await.unwrap() > seeded);
    }
}
