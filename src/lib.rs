pub mod config;
pub mod database;
pub mod redis_client;
pub mod error;
pub mod models;
pub mod controllers;
pub mod middleware;
pub mod cache;
pub mod seed;
pub mod services;
pub mod telemetry;

use std::sync::Arc;

use services::auth::JwtKeys;

// State shared by every booking API handler
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub cache: cache::CacheService,
    pub jwt: JwtKeys,
    pub config: config::Config,
}

impl AppState {
    /// Connects to Postgres (and Redis when configured) and runs migrations.
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::new(&config.database.url, config.database.pool_size).await?;
        tracing::info!("Database connected");

        db.run_migrations().await?;

        let cache = match &config.redis {
            Some(redis) => {
                let client = redis_client::RedisClient::new(&redis.url).await?;
                tracing::info!("Redis connected");
                cache::CacheService::new(client, redis.ttl_seconds)
            }
            None => {
                tracing::info!("REDIS_URL not set, catalog cache disabled");
                cache::CacheService::disabled()
            }
        };

        Ok(Self::from_parts(db, cache, config))
    }

    pub fn from_parts(db: database::Database, cache: cache::CacheService, config: config::Config) -> Arc<Self> {
        let jwt = JwtKeys::from_config(&config.jwt);
        Arc::new(Self { db, cache, jwt, config })
    }
}
