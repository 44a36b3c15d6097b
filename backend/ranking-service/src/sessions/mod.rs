// ============================================
// Comparison Sessions
// ============================================
//
// A placement takes several requests: one per comparison, separated by
// however long the user thinks. Between requests the insertion session is
// parked here under an opaque token.
//
// Backends:
// - memory: DashMap, TTL checked on read, periodic purge
// - redis:  {prefix}:{token} -> JSON, SET EX for TTL

pub mod memory;
pub mod redis_store;

pub use memory::InMemorySessionStore;
pub use redis_store::RedisSessionStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tier_ranking::InsertionSession;

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Invalid session data: {0}")]
    InvalidData(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SessionStoreError>;

/// Whether a placement creates an item or moves an existing one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlacementOrigin {
    /// The id must still be free when the placement is committed.
    New,
    /// The item sat in `tier_id` when the placement began.
    Existing { tier_id: String },
}

/// What gets parked between two comparisons.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredSession {
    pub category_id: String,
    pub origin: PlacementOrigin,
    pub session: InsertionSession,
    pub created_at: DateTime<Utc>,
}

impl StoredSession {
    pub fn new(
        category_id: impl Into<String>,
        origin: PlacementOrigin,
        session: InsertionSession,
    ) -> Self {
        Self {
            category_id: category_id.into(),
            origin,
            session,
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store (or overwrite) a session and restart its TTL.
    async fn save(&self, token: &str, session: &StoredSession) -> Result<()>;

    /// `None` for unknown or expired tokens.
    async fn load(&self, token: &str) -> Result<Option<StoredSession>>;

    /// Returns whether a session was actually removed.
    async fn remove(&self, token: &str) -> Result<bool>;
}
