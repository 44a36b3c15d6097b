use super::{Result, SessionStore, StoredSession};
use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

/// Sessions kept in Redis so any replica can continue a placement.
pub struct RedisSessionStore {
    redis: redis::Client,
    /// Session TTL in seconds, refreshed on every save
    session_ttl: u64,
    key_prefix: String,
}

impl RedisSessionStore {
    pub fn new(redis: redis::Client) -> Self {
        Self {
            redis,
            session_ttl: 1800,
            key_prefix: "rank_session".to_string(),
        }
    }

    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.session_ttl = ttl_seconds;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    fn session_key(&self, token: &str) -> String {
        format!("{}:{}", self.key_prefix, token)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn save(&self, token: &str, session: &StoredSession) -> Result<()> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let json = serde_json::to_string(session)?;

        let _: () = conn
            .set_ex(self.session_key(token), json, self.session_ttl)
            .await?;

        debug!(
            token = token,
            category_id = %session.category_id,
            comparisons = session.session.comparisons(),
            "comparison session saved"
        );
        Ok(())
    }

    async fn load(&self, token: &str) -> Result<Option<StoredSession>> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let json: Option<String> = conn.get(self.session_key(token)).await?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn remove(&self, token: &str) -> Result<bool> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let removed: i64 = conn.del(self.session_key(token)).await?;
        Ok(removed > 0)
    }
}
