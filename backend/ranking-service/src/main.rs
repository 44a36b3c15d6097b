use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tier_ranking_service::{
    config::SessionBackend,
    handlers::{self, ServiceName},
    repository::{CategoryStore, InMemoryCategoryStore, PgCategoryStore},
    sessions::{InMemorySessionStore, RedisSessionStore, SessionStore},
    Config, RankingService,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[actix_web::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tier_ranking_service=debug".into());
    if config.service.log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }

    info!(
        "Starting {} on {}:{}",
        config.service.service_name, config.service.host, config.service.http_port
    );

    let store: Arc<dyn CategoryStore> = match &config.database.url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .connect(url)
                .await
                .context("Failed to create database pool")?;

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run migrations")?;
            info!("Category store: postgres");

            Arc::new(PgCategoryStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, categories are kept in memory only");
            Arc::new(InMemoryCategoryStore::new())
        }
    };

    let sessions: Arc<dyn SessionStore> = match config.sessions.backend {
        SessionBackend::Redis => {
            let client = redis::Client::open(config.redis.url.clone())
                .context("Failed to create Redis client")?;
            info!("Session store: redis");

            Arc::new(
                RedisSessionStore::new(client)
                    .with_ttl(config.sessions.ttl_secs)
                    .with_prefix(config.sessions.key_prefix.clone()),
            )
        }
        SessionBackend::Memory => {
            let memory = Arc::new(InMemorySessionStore::new(config.sessions.ttl_secs));

            // Expired sessions are invisible already; this only frees memory.
            let purger = Arc::clone(&memory);
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_secs(60));
                loop {
                    interval.tick().await;
                    purger.purge_expired();
                }
            });

            memory
        }
    };

    let service = web::Data::new(RankingService::new(store, sessions));
    let service_name = web::Data::new(ServiceName(config.service.service_name.clone()));

    info!(
        "HTTP server listening on {}:{}",
        config.service.host, config.service.http_port
    );

    HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .app_data(service_name.clone())
            .configure(handlers::configure)
    })
    .bind((config.service.host.as_str(), config.service.http_port))
    .context("Failed to bind HTTP server")?
    .run()
    .await
    .context("HTTP server error")
}
