use super::{CategoryHead, CategoryStore, StoreError, StoreResult, WriteBatch};
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tier_ranking::{Item, ItemFields, Tier};
use tracing::debug;

/// Postgres-backed store. One transaction per [`WriteBatch`].
#[derive(Clone)]
pub struct PgCategoryStore {
    pool: PgPool,
}

impl PgCategoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryStore for PgCategoryStore {
    async fn load_category(&self, category_id: &str) -> StoreResult<Option<CategoryHead>> {
        let row = sqlx::query("SELECT tiers, version FROM ranking_categories WHERE id = $1")
            .bind(category_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let Json(tiers): Json<Vec<Tier>> = row.try_get("tiers")?;
                Ok(Some(CategoryHead {
                    tiers,
                    version: row.try_get("version")?,
                }))
            }
            None => Ok(None),
        }
    }

    async fn load_items(&self, category_id: &str) -> StoreResult<Vec<Item>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tier_id, rating, fields
            FROM ranking_items
            WHERE category_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> StoreResult<Item> {
                let Json(fields): Json<ItemFields> = row.try_get("fields")?;
                Ok(Item {
                    id: row.try_get("id")?,
                    tier_id: row.try_get("tier_id")?,
                    rating: row.try_get("rating")?,
                    fields,
                })
            })
            .collect()
    }

    async fn commit(&self, category_id: &str, batch: WriteBatch) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        match batch.expected_version {
            None => {
                let tiers = batch
                    .tiers
                    .as_ref()
                    .ok_or_else(|| StoreError::UnknownCategory(category_id.to_string()))?;

                let created = sqlx::query(
                    r#"
                    INSERT INTO ranking_categories (id, tiers, version, updated_at)
                    VALUES ($1, $2, 1, NOW())
                    ON CONFLICT (id) DO NOTHING
                    "#,
                )
                .bind(category_id)
                .bind(Json(tiers))
                .execute(&mut *tx)
                .await?;

                if created.rows_affected() == 0 {
                    return Err(StoreError::Stale(category_id.to_string()));
                }
            }
            Some(expected) => {
                // Takes the row lock and checks the version in one statement.
                // A writer queued behind the lock re-evaluates the WHERE
                // clause after the first one commits and matches nothing.
                let bumped = sqlx::query(
                    r#"
                    UPDATE ranking_categories
                    SET version = version + 1,
                        tiers = COALESCE($3, tiers)
                    WHERE id = $1 AND version = $2
                    "#,
                )
                .bind(category_id)
                .bind(expected)
                .bind(batch.tiers.as_ref().map(Json))
                .execute(&mut *tx)
                .await?;

                if bumped.rows_affected() == 0 {
                    let exists = sqlx::query("SELECT 1 FROM ranking_categories WHERE id = $1")
                        .bind(category_id)
                        .fetch_optional(&mut *tx)
                        .await?;
                    return Err(match exists {
                        Some(_) => StoreError::Stale(category_id.to_string()),
                        None => StoreError::UnknownCategory(category_id.to_string()),
                    });
                }
            }
        }

        for upsert in &batch.upserts {
            match &upsert.fields {
                Some(fields) => {
                    sqlx::query(
                        r#"
                        INSERT INTO ranking_items (category_id, id, tier_id, rating, fields)
                        VALUES ($1, $2, $3, $4, $5)
                        ON CONFLICT (category_id, id) DO UPDATE
                        SET tier_id = EXCLUDED.tier_id,
                            rating = EXCLUDED.rating,
                            fields = EXCLUDED.fields,
                            updated_at = NOW()
                        "#,
                    )
                    .bind(category_id)
                    .bind(&upsert.id)
                    .bind(&upsert.tier_id)
                    .bind(upsert.rating)
                    .bind(Json(fields))
                    .execute(&mut *tx)
                    .await?;
                }
                None => {
                    let result = sqlx::query(
                        r#"
                        UPDATE ranking_items
                        SET tier_id = $3, rating = $4, updated_at = NOW()
                        WHERE category_id = $1 AND id = $2
                        "#,
                    )
                    .bind(category_id)
                    .bind(&upsert.id)
                    .bind(&upsert.tier_id)
                    .bind(upsert.rating)
                    .execute(&mut *tx)
                    .await?;

                    if result.rows_affected() == 0 {
                        // Dropping tx rolls back everything written so far.
                        return Err(StoreError::UnknownItem(upsert.id.clone()));
                    }
                }
            }
        }

        if batch.touch_updated_at {
            sqlx::query("UPDATE ranking_categories SET updated_at = NOW() WHERE id = $1")
                .bind(category_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        debug!(
            category_id = category_id,
            upserts = batch.upserts.len(),
            tiers_replaced = batch.tiers.is_some(),
            "category batch committed"
        );

        Ok(())
    }
}
