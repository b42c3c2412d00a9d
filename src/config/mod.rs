use serde::Deserialize;
use std::env;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

// Top-level configuration of the booking API
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: Option<RedisConfig>,
    pub jwt: JwtConfig,
    pub security: SecurityConfig,
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub log_format: LogFormat,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// Redis is optional: without REDIS_URL the catalog is served straight from Postgres
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    pub ttl_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expires_in_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub bcrypt_cost: u32,
}

// Bootstrap account created on first start
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    pub email: String,
    pub password: String,
}

// Settings of the standalone payment process
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    pub host: String,
    pub port: u16,
    pub rust_log: String,
    pub log_format: LogFormat,
    pub stripe_secret_key: String,
    pub endpoint_secret: String,
    pub api_base: String,
    pub intent_amount: i64,
    pub intent_currency: String,
    pub webhook_tolerance_seconds: i64,
    pub circuit_breaker: CircuitBreakerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub timeout_seconds: u64,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn or_default(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed<T: FromStr>(name: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = or_default(name, default);
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let redis = match env::var("REDIS_URL") {
            Ok(url) if !url.trim().is_empty() => Some(RedisConfig {
                url,
                ttl_seconds: parsed("CACHE_TTL_SECONDS", "3600")?,
            }),
            _ => None,
        };

        Ok(Config {
            app: AppConfig {
                host: or_default("HOST", "0.0.0.0"),
                port: parsed("PORT", "8000")?,
                environment: or_default("ENVIRONMENT", "development"),
                rust_log: or_default("RUST_LOG", "movie_booking=debug,tower_http=debug"),
                log_format: parsed("LOG_FORMAT", "pretty")?,
                cors_origins: split_list(&or_default("CORS_ORIGINS", "http://localhost:3000")),
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                pool_size: parsed("DB_POOL_SIZE", "20")?,
            },
            redis,
            jwt: JwtConfig {
                secret: required("JWT_SECRET")?,
                expires_in_minutes: parsed("ACCESS_TOKEN_EXPIRE_MINUTES", "30")?,
            },
            security: SecurityConfig {
                bcrypt_cost: parsed("BCRYPT_COST", "12")?,
            },
            admin: AdminConfig {
                email: or_default("ADMIN_EMAIL", "admin@example.com"),
                password: or_default("ADMIN_PASSWORD", "admin123"),
            },
        })
    }
}

impl PaymentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(PaymentConfig {
            host: or_default("PAYMENT_HOST", "0.0.0.0"),
            port: parsed("PAYMENT_PORT", "4242")?,
            rust_log: or_default("RUST_LOG", "payment_service=debug,movie_booking=debug,tower_http=debug"),
            log_format: parsed("LOG_FORMAT", "pretty")?,
            stripe_secret_key: required("STRIPE_SECRET_KEY")?,
            endpoint_secret: required("STRIPE_ENDPOINT_SECRET")?,
            api_base: or_default("STRIPE_API_BASE", "https://api.stripe.com"),
            intent_amount: parsed("PAYMENT_INTENT_AMOUNT", "1000")?,
            intent_currency: or_default("PAYMENT_INTENT_CURRENCY", "usd"),
            webhook_tolerance_seconds: parsed("WEBHOOK_TOLERANCE_SECONDS", "300")?,
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: parsed("CIRCUIT_BREAKER_FAILURE_THRESHOLD", "5")?,
                timeout_seconds: parsed("CIRCUIT_BREAKER_TIMEOUT_SECONDS", "60")?,
            },
        })
    }
}
