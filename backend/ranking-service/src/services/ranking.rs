use crate::error::{AppError, Result};
use crate::models::{CategoryView, RankItemRequest, RankResponse, RerankResponse};
use crate::repository::{CategoryStore, ItemUpsert, WriteBatch};
use crate::sessions::{PlacementOrigin, SessionStore, StoredSession};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tier_ranking::{
    allocate, collect_group, engine, max_comparisons, AllocationResult, InsertionState,
    PendingItem, RankStep, RankingError, RatingAssignment, Tier, TierBounds, TierLadder,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Where a placement came from, carried until it is committed.
struct Placement<'a> {
    category_id: &'a str,
    token: Option<&'a str>,
    created_at: Option<DateTime<Utc>>,
    origin: PlacementOrigin,
    new_item: PendingItem,
    bounds: TierBounds,
}

type LockMap = DashMap<String, Arc<Mutex<()>>>;

/// Held for a read-compute-commit section on one category. Dropping it
/// removes the map entry once nobody else holds or waits on the lock, so
/// the map only holds categories that are busy right now.
struct CategoryGuard<'a> {
    locks: &'a LockMap,
    category_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for CategoryGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.locks
            .remove_if(&self.category_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Drives placements and tier edits against the category store.
///
/// Within one process, read-compute-commit sections on a category are
/// serialized through a per-category async mutex. Across processes the
/// store's version check does the same job: every batch names the version
/// it was computed from, and a batch that lost the race becomes `Conflict`.
/// Comparison steps take no lock; a session works on its own snapshot and
/// is checked against the current category before its result is written.
pub struct RankingService {
    store: Arc<dyn CategoryStore>,
    sessions: Arc<dyn SessionStore>,
    locks: LockMap,
}

impl RankingService {
    pub fn new(store: Arc<dyn CategoryStore>, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            sessions,
            locks: DashMap::new(),
        }
    }

    async fn lock_category(&self, category_id: &str) -> CategoryGuard<'_> {
        let lock = self
            .locks
            .entry(category_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        CategoryGuard {
            locks: &self.locks,
            category_id: category_id.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    async fn load_ladder(&self, category_id: &str) -> Result<(TierLadder, i64)> {
        let head = self
            .store
            .load_category(category_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("category '{}'", category_id)))?;
        Ok((TierLadder::new(head.tiers)?, head.version))
    }

    /// Tiers and items of a category, best item first.
    pub async fn get_category(&self, category_id: &str) -> Result<CategoryView> {
        let (ladder, _) = self.load_ladder(category_id).await?;
        let mut items = self.store.load_items(category_id).await?;
        items.sort_by(|a, b| {
            b.rating
                .partial_cmp(&a.rating)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(CategoryView {
            category_id: category_id.to_string(),
            tiers: ladder.into_tiers(),
            items,
        })
    }

    /// Start placing a brand new item into a tier.
    pub async fn rank_new_item(
        &self,
        category_id: &str,
        request: RankItemRequest,
    ) -> Result<RankResponse> {
        let item_id = request
            .item
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let (ladder, _) = self.load_ladder(category_id).await?;
        let bounds = ladder.bounds_of(&request.tier_id)?;
        let items = self.store.load_items(category_id).await?;

        if items.iter().any(|item| item.id == item_id) {
            return Err(duplicate_item(&item_id, category_id));
        }

        let new_item = PendingItem::new(item_id).with_fields(request.item.fields);
        let step = engine::rank_new_item(&ladder, &request.tier_id, new_item.clone(), &items)?;

        info!(
            category_id = category_id,
            tier_id = %request.tier_id,
            item_id = %new_item.id,
            "placement started"
        );

        self.advance(
            Placement {
                category_id,
                token: None,
                created_at: None,
                origin: PlacementOrigin::New,
                new_item,
                bounds,
            },
            step,
        )
        .await
    }

    /// Place an existing item again, possibly into another tier.
    pub async fn rerank_item(
        &self,
        category_id: &str,
        item_id: &str,
        tier_id: &str,
    ) -> Result<RankResponse> {
        let (ladder, _) = self.load_ladder(category_id).await?;
        let bounds = ladder.bounds_of(tier_id)?;
        let items = self.store.load_items(category_id).await?;

        let existing = items
            .iter()
            .find(|item| item.id == item_id)
            .ok_or_else(|| AppError::NotFound(format!("item '{}'", item_id)))?;

        let new_item = PendingItem::new(item_id).with_fields(existing.fields.clone());
        let step = engine::rank_new_item(&ladder, tier_id, new_item.clone(), &items)?;

        info!(
            category_id = category_id,
            item_id = item_id,
            from_tier = %existing.tier_id,
            to_tier = tier_id,
            "re-placement started"
        );

        self.advance(
            Placement {
                category_id,
                token: None,
                created_at: None,
                origin: PlacementOrigin::Existing {
                    tier_id: existing.tier_id.clone(),
                },
                new_item,
                bounds,
            },
            step,
        )
        .await
    }

    /// Answer the pending comparison of a session.
    pub async fn submit_comparison(
        &self,
        token: &str,
        new_item_is_better: bool,
    ) -> Result<RankResponse> {
        let stored = self
            .sessions
            .load(token)
            .await?
            .ok_or_else(|| RankingError::SessionNotFound(token.to_string()))?;

        let new_item = stored.session.new_item().clone();
        let bounds = stored.session.bounds();
        let step = engine::submit_comparison(stored.session, new_item_is_better)?;

        self.advance(
            Placement {
                category_id: &stored.category_id,
                token: Some(token),
                created_at: Some(stored.created_at),
                origin: stored.origin,
                new_item,
                bounds,
            },
            step,
        )
        .await
    }

    /// Drop an unfinished session.
    pub async fn abandon_session(&self, token: &str) -> Result<()> {
        if self.sessions.remove(token).await? {
            debug!(token = token, "comparison session abandoned");
            Ok(())
        } else {
            Err(RankingError::SessionNotFound(token.to_string()).into())
        }
    }

    /// Replace the tiers of a category and re-derive every item from them.
    /// Creates the category when it does not exist yet.
    pub async fn update_tiers(&self, category_id: &str, tiers: Vec<Tier>) -> Result<RerankResponse> {
        let _guard = self.lock_category(category_id).await;

        let expected_version = self
            .store
            .load_category(category_id)
            .await?
            .map(|head| head.version);
        let items = self.store.load_items(category_id).await?;
        let outcome = tier_ranking::bulk_rerank(&items, tiers)?;

        let moved = outcome
            .assignments
            .iter()
            .filter(|a| {
                items
                    .iter()
                    .any(|item| item.id == a.item_id && item.tier_id != a.tier_id)
            })
            .count();

        let batch = WriteBatch {
            expected_version,
            tiers: Some(outcome.tiers.clone()),
            upserts: outcome
                .assignments
                .iter()
                .cloned()
                .map(ItemUpsert::rerated)
                .collect(),
            touch_updated_at: outcome.touch_updated_at,
        };
        self.store.commit(category_id, batch).await?;

        info!(
            category_id = category_id,
            items = outcome.assignments.len(),
            moved,
            "category re-ranked"
        );

        Ok(RerankResponse {
            category_id: category_id.to_string(),
            tiers: outcome.tiers,
            ratings: outcome.assignments,
            updated_at_refreshed: outcome.touch_updated_at,
        })
    }

    async fn advance(&self, placement: Placement<'_>, step: RankStep) -> Result<RankResponse> {
        match step {
            RankStep::Compare(session) => {
                let pivot = session.pivot_item().cloned().ok_or_else(|| {
                    AppError::Internal("unresolved session without a pivot".to_string())
                })?;
                let max_remaining = match session.state() {
                    InsertionState::AwaitingComparison { lo, hi, .. } => max_comparisons(hi - lo + 1),
                    InsertionState::Resolved { .. } => 0,
                };
                let comparisons = session.comparisons();

                let token = placement
                    .token
                    .map(str::to_string)
                    .unwrap_or_else(|| Uuid::new_v4().to_string());
                let mut stored =
                    StoredSession::new(placement.category_id, placement.origin, session);
                if let Some(created_at) = placement.created_at {
                    stored.created_at = created_at;
                }
                self.sessions.save(&token, &stored).await?;

                Ok(RankResponse::ComparisonRequired {
                    session_token: token,
                    pivot,
                    comparisons,
                    max_remaining,
                })
            }
            RankStep::Allocated(result) => {
                let ratings = self.commit_allocation(&placement, &result).await?;

                if let Some(token) = placement.token {
                    self.sessions.remove(token).await?;
                }

                Ok(RankResponse::Allocated {
                    tier_id: result.tier_id,
                    item_id: result.item_id,
                    comparisons: result.comparisons,
                    ratings,
                })
            }
        }
    }

    /// Check the session snapshot against the current category and write
    /// the placement. Returns every rating that was rewritten.
    async fn commit_allocation(
        &self,
        placement: &Placement<'_>,
        result: &AllocationResult,
    ) -> Result<Vec<RatingAssignment>> {
        let category_id = placement.category_id;
        let _guard = self.lock_category(category_id).await;

        let (ladder, version) = self.load_ladder(category_id).await?;
        let items = self.store.load_items(category_id).await?;

        let placed = items.iter().find(|item| item.id == result.item_id);
        match (&placement.origin, placed) {
            (PlacementOrigin::New, None) => {}
            (PlacementOrigin::New, Some(_)) => {
                return Err(duplicate_item(&result.item_id, category_id));
            }
            (PlacementOrigin::Existing { tier_id }, Some(item)) if item.tier_id == *tier_id => {}
            (PlacementOrigin::Existing { .. }, Some(_)) => {
                warn!(
                    category_id = category_id,
                    item_id = %result.item_id,
                    "item moved during placement"
                );
                return Err(AppError::Conflict(format!(
                    "item '{}' was moved while comparing, please retry",
                    result.item_id
                )));
            }
            (PlacementOrigin::Existing { .. }, None) => {
                return Err(AppError::NotFound(format!("item '{}'", result.item_id)));
            }
        }

        if ladder.bounds_of(&result.tier_id).ok() != Some(placement.bounds) {
            warn!(
                category_id = category_id,
                tier_id = %result.tier_id,
                "tier bounds changed during placement"
            );
            return Err(tier_changed(&result.tier_id));
        }

        let current: HashSet<&str> = items
            .iter()
            .filter(|item| item.tier_id == result.tier_id && item.id != result.item_id)
            .map(|item| item.id.as_str())
            .collect();
        let compared: HashSet<&str> = result
            .assignments
            .iter()
            .filter(|a| a.item_id != result.item_id)
            .map(|a| a.item_id.as_str())
            .collect();
        if current != compared {
            warn!(
                category_id = category_id,
                tier_id = %result.tier_id,
                "tier membership changed during placement"
            );
            return Err(tier_changed(&result.tier_id));
        }

        let mut ratings = result.assignments.clone();

        // A moved item leaves a gap; re-spread what stays behind.
        if let PlacementOrigin::Existing { tier_id: from } = &placement.origin {
            if *from != result.tier_id {
                let remaining = collect_group(from, &items, Some(result.item_id.as_str()));
                let ids: Vec<&str> = remaining.iter().map(|item| item.id.as_str()).collect();
                ratings.extend(allocate(ladder.bounds_of(from)?, from, &ids));
            }
        }

        let upserts = ratings
            .iter()
            .map(|a| {
                let mut upsert = ItemUpsert::rerated(a.clone());
                if a.item_id == result.item_id && placement.origin == PlacementOrigin::New {
                    upsert.fields = Some(placement.new_item.fields.clone());
                }
                upsert
            })
            .collect();

        self.store
            .commit(
                category_id,
                WriteBatch {
                    expected_version: Some(version),
                    tiers: None,
                    upserts,
                    touch_updated_at: true,
                },
            )
            .await?;

        info!(
            category_id = category_id,
            tier_id = %result.tier_id,
            item_id = %result.item_id,
            comparisons = result.comparisons,
            rerated = ratings.len(),
            "placement committed"
        );
        Ok(ratings)
    }
}

fn duplicate_item(item_id: &str, category_id: &str) -> AppError {
    AppError::Validation(format!(
        "item '{}' already exists in category '{}'",
        item_id, category_id
    ))
}

fn tier_changed(tier_id: &str) -> AppError {
    AppError::Conflict(format!(
        "tier '{}' changed while comparing, please retry",
        tier_id
    ))
}
