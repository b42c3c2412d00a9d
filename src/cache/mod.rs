//! Read-through Redis cache for catalog lookups.
//!
//! Values are stored as JSON with a TTL. Any Redis failure is treated as a
//! miss and the caller goes to Postgres, so the API keeps working with Redis
//! down or not configured at all.

use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::PgPool;
use tracing::{debug, info, warn};

use crate::redis_client::RedisClient;

pub mod movies;
pub mod screenings;

pub mod keys {
    pub const FEATURED_MOVIES: &str = "movies:featured";

    pub fn movie(id: i32) -> String {
        format!("movie:{id}")
    }

    pub fn screening(id: i32) -> String {
        format!("screening:{id}")
    }
}

#[derive(Clone)]
pub struct CacheService {
    redis: Option<RedisClient>,
    ttl_seconds: u64,
}

impl CacheService {
    pub fn new(redis: RedisClient, ttl_seconds: u64) -> Self {
        Self { redis: Some(redis), ttl_seconds }
    }

    /// Pass-through cache that always misses.
    pub fn disabled() -> Self {
        Self { redis: None, ttl_seconds: 0 }
    }

    pub fn is_enabled(&self) -> bool {
        self.redis.is_some()
    }

    // Prime the entries hit by the landing page
    pub async fn warmup_cache(&self, pool: &PgPool) {
        if !self.is_enabled() {
            return;
        }
        info!("Starting cache warmup...");
        match self.featured_movies(pool).await {
            Ok(movies) => info!(count = movies.len(), "Featured movies cached"),
            Err(e) => warn!(error = %e, "Cache warmup failed"),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.redis.as_ref()?.conn.clone();
        let data = match conn.get::<_, Option<String>>(key).await {
            Ok(data) => data,
            Err(e) => {
                warn!(key, error = %e, "Cache read failed");
                return None;
            }
        };
        let data = data?;
        match serde_json::from_str(&data) {
            Ok(value) => {
                debug!(key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key, error = %e, "Dropping undecodable cache entry");
                self.invalidate(&[key.to_string()]).await;
                None
            }
        }
    }

    async fn set_json<T: Serialize>(&self, key: &str, value: &T) {
        let Some(redis) = self.redis.as_ref() else {
            return;
        };
        let data = match serde_json::to_string(value) {
            Ok(data) => data,
            Err(e) => {
                warn!(key, error = %e, "Cache serialization failed");
                return;
            }
        };
        let mut conn = redis.conn.clone();
        if let Err(e) = conn.set_ex::<_, _, ()>(key, data, self.ttl_seconds).await {
            warn!(key, error = %e, "Cache write failed");
        }
    }

    pub async fn invalidate(&self, keys: &[String]) {
        let Some(redis) = self.redis.as_ref() else {
            return;
        };
        if keys.is_empty() {
            return;
        }
        let mut conn = redis.conn.clone();
        match conn.del::<_, ()>(keys.to_vec()).await {
            Ok(()) => debug!(?keys, "Cache invalidated"),
            Err(e) => warn!(?keys, error = %e, "Cache invalidation failed"),
        }
    }
}
