use anyhow::{anyhow, bail, Result};
use serde::Deserialize;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub sessions: SessionConfig,
    pub redis: RedisConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub host: String,
    pub http_port: u16,
    pub service_name: String,
    /// `json` switches the log formatter to JSON lines.
    pub log_format: String,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    Memory,
    Redis,
}

impl FromStr for SessionBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(SessionBackend::Memory),
            "redis" => Ok(SessionBackend::Redis),
            other => bail!("unknown session backend '{}'", other),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub backend: SessionBackend,
    /// Lifetime of an unfinished comparison session.
    pub ttl_secs: u64,
    pub key_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Without a URL categories live in process memory.
    pub url: Option<String>,
    pub max_connections: u32,
}

/// Longest accepted `SESSION_TTL_SECS` (30 days).
pub const MAX_SESSION_TTL_SECS: u64 = 30 * 24 * 60 * 60;

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let ttl_secs: u64 = parse_var("SESSION_TTL_SECS", 1800)?;
        if ttl_secs == 0 || ttl_secs > MAX_SESSION_TTL_SECS {
            bail!(
                "SESSION_TTL_SECS must be between 1 and {}, got {}",
                MAX_SESSION_TTL_SECS,
                ttl_secs
            );
        }

        Ok(Config {
            service: ServiceConfig {
                host: env::var("HTTP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                http_port: parse_var("HTTP_PORT", 8012)?,
                service_name: env::var("SERVICE_NAME")
                    .unwrap_or_else(|_| "tier-ranking-service".to_string()),
                log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string()),
            },
            sessions: SessionConfig {
                backend: parse_var("SESSION_BACKEND", SessionBackend::Memory)?,
                ttl_secs,
                key_prefix: env::var("SESSION_KEY_PREFIX")
                    .unwrap_or_else(|_| "rank_session".to_string()),
            },
            redis: RedisConfig {
                url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
                max_connections: parse_var("DB_MAX_CONNECTIONS", 10)?,
            },
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow!("{} has an invalid value '{}': {}", name, raw, e)),
        Err(_) => Ok(default),
    }
}
