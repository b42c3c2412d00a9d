use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, info};

use crate::config::{AdminConfig, JwtConfig};
use crate::error::{AppError, AppResult};
use crate::models::user::{User, ADMIN_USERNAME};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Username of the token owner.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 signing and verification keys derived from the configured secret.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtKeys {
    pub fn from_config(config: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            ttl: Duration::minutes(config.expires_in_minutes),
        }
    }

    pub fn issue(&self, username: &str) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: username.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("jwt encode: {e}")))?;
        debug!(username, "access token issued");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        Ok(data.claims)
    }
}

/// bcrypt is CPU-bound, so hashing runs on the blocking pool.
pub async fn hash_password(plain: &str, cost: u32) -> AppResult<String> {
    let plain = plain.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost))
        .await
        .map_err(|e| AppError::Internal(format!("hash task: {e}")))?
        .map_err(|e| AppError::Internal(format!("bcrypt hash: {e}")))
}

/// A malformed stored hash counts as a mismatch.
pub async fn verify_password(plain: &str, hashed: &str) -> AppResult<bool> {
    let plain = plain.to_string();
    let hashed = hashed.to_string();
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(plain, &hashed))
        .await
        .map_err(|e| AppError::Internal(format!("verify task: {e}")))?;
    Ok(verified.unwrap_or(false))
}

/// Looks up `username` and checks `password` against the stored hash.
pub async fn authenticate(pool: &PgPool, username: &str, password: &str) -> AppResult<User> {
    let rejected = || AppError::unauthorized("Incorrect username or password");

    let user = User::find_by_username(pool, username)
        .await?
        .ok_or_else(rejected)?;

    if !verify_password(password, &user.hashed_password).await? {
        return Err(rejected());
    }
    Ok(user)
}

/// Creates the `admin` account on first start.
pub async fn ensure_admin_user(pool: &PgPool, admin: &AdminConfig, bcrypt_cost: u32) -> AppResult<()> {
    if User::find_by_username(pool, ADMIN_USERNAME).await?.is_some() {
        info!("Admin user already exists");
        return Ok(());
    }

    let hashed = hash_password(&admin.password, bcrypt_cost).await?;
    User::create(pool, ADMIN_USERNAME, &admin.email, &hashed, true).await?;
    info!(email = %admin.email, "Admin user created");
    Ok(())
}
