use super::{Result, SessionStore, StoredSession};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::debug;

struct Entry {
    expires_at: DateTime<Utc>,
    stored: StoredSession,
}

/// Sessions held in process memory. Lost on restart, which only means the
/// user starts the placement over.
pub struct InMemorySessionStore {
    sessions: DashMap<String, Entry>,
    ttl: Duration,
}

impl InMemorySessionStore {
    /// TTLs beyond what chrono can represent saturate instead of wrapping.
    pub fn new(ttl_seconds: u64) -> Self {
        let ttl = i64::try_from(ttl_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);

        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop every expired session. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| entry.expires_at > now);
        let purged = before.saturating_sub(self.sessions.len());

        if purged > 0 {
            debug!(purged, "expired comparison sessions purged");
        }
        purged
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save(&self, token: &str, session: &StoredSession) -> Result<()> {
        self.sessions.insert(
            token.to_string(),
            Entry {
                expires_at: Utc::now()
                    .checked_add_signed(self.ttl)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC),
                stored: session.clone(),
            },
        );
        Ok(())
    }

    async fn load(&self, token: &str) -> Result<Option<StoredSession>> {
        let now = Utc::now();
        let expired = match self.sessions.get(token) {
            Some(entry) if entry.expires_at > now => return Ok(Some(entry.stored.clone())),
            Some(_) => true,
            None => false,
        };

        if expired {
            self.sessions.remove(token);
        }
        Ok(None)
    }

    async fn remove(&self, token: &str) -> Result<bool> {
        Ok(self.sessions.remove(token).is_some())
    }
}
