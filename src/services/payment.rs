//! Outbound Stripe calls for the payment service.
//!
//! 1. **CircuitBreaker**: closed/open/half-open guard in front of the
//!    provider. After `failure_threshold` consecutive failures requests are
//!    refused until `timeout_seconds` have passed. Half-open admits a single
//!    in-flight trial call; one that never reports back is replaced after
//!    another timeout.
//! 2. **StripeClient**: creates PaymentIntents over the form-encoded REST
//!    API. Every call goes through the breaker and carries a fresh
//!    `Idempotency-Key`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{CircuitBreakerConfig, PaymentConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    state: RwLock<CircuitState>,
    failure_count: AtomicU32,
    opened_at: Mutex<Option<Instant>>,
    /// Start of the half-open trial call currently in flight.
    trial_started: Mutex<Option<Instant>>,
    failure_threshold: u32,
    timeout: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, timeout: Duration) -> Self {
        Self {
            state: RwLock::new(CircuitState::Closed),
            failure_count: AtomicU32::new(0),
            opened_at: Mutex::new(None),
            trial_started: Mutex::new(None),
            failure_threshold: failure_threshold.max(1),
            timeout,
        }
    }

    pub fn from_config(config: &CircuitBreakerConfig) -> Self {
        Self::new(config.failure_threshold, Duration::from_secs(config.timeout_seconds))
    }

    /// Whether the next request may go out. An open breaker whose timeout
    /// has elapsed moves to half-open and admits one trial call; further calls
    /// are refused until that call reports success or failure.
    pub fn can_execute(&self) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        match *state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => self.try_start_trial(),
            CircuitState::Open => {
                let opened_at = *self.opened_at.lock().unwrap_or_else(PoisonError::into_inner);
                if !opened_at.map_or(true, |at| at.elapsed() >= self.timeout) {
                    return false;
                }
                *state = CircuitState::HalfOpen;
                *self.trial_started.lock().unwrap_or_else(PoisonError::into_inner) = None;
                info!("circuit breaker half-open, probing provider");
                self.try_start_trial()
            }
        }
    }

    fn try_start_trial(&self) -> bool {
        let mut trial = self.trial_started.lock().unwrap_or_else(PoisonError::into_inner);
        let free = trial.map_or(true, |at| at.elapsed() >= self.timeout);
        if free {
            *trial = Some(Instant::now());
        }
        free
    }

    fn finish_trial(&self) {
        *self.trial_started.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn record_success(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        self.failure_count.store(0, Ordering::Relaxed);
        self.finish_trial();
        if *state == CircuitState::HalfOpen {
            *state = CircuitState::Closed;
            info!("circuit breaker closed, provider recovered");
        }
    }

    pub fn record_failure(&self) {
        let failures = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        let open = match *state {
            CircuitState::Closed if failures >= self.failure_threshold => {
                error!(failures, threshold = self.failure_threshold, "circuit breaker opened");
                true
            }
            CircuitState::HalfOpen => {
                warn!("circuit breaker trial call failed, reopening");
                true
            }
            _ => false,
        };
        self.finish_trial();
        if open {
            *state = CircuitState::Open;
            *self.opened_at.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
        }
    }

    pub fn state(&self) -> CircuitState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Failures of the payment service, rendered as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Payment provider temporarily unavailable")]
    CircuitOpen,

    /// Message reported by Stripe itself.
    #[error("{0}")]
    Provider(String),

    #[error("Payment provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid payload")]
    InvalidPayload,

    #[error("Invalid signature")]
    InvalidSignature,
}

impl PaymentError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PaymentError::InvalidPayload | PaymentError::InvalidSignature => StatusCode::BAD_REQUEST,
            PaymentError::CircuitOpen | PaymentError::Provider(_) | PaymentError::Transport(_) => {
                StatusCode::FORBIDDEN
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentErrorBody {
    pub error: String,
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(PaymentErrorBody { error: self.to_string() })).into_response()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
struct CreateIntentForm<'a> {
    amount: i64,
    currency: &'a str,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

pub struct StripeClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
    circuit_breaker: CircuitBreaker,
}

impl StripeClient {
    pub fn from_config(config: &PaymentConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key: config.stripe_secret_key.clone(),
            circuit_breaker: CircuitBreaker::from_config(&config.circuit_breaker),
        })
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state()
    }

    pub async fn create_payment_intent(
        &self,
        amount: i64,
        currency: &str,
    ) -> Result<PaymentIntent, PaymentError> {
        if !self.circuit_breaker.can_execute() {
            warn!("circuit breaker open, refusing payment intent");
            return Err(PaymentError::CircuitOpen);
        }

        let form = serde_urlencoded::to_string(CreateIntentForm { amount, currency })
            .map_err(|e| PaymentError::Provider(e.to_string()))?;
        let idempotency_key = Uuid::new_v4().to_string();
        info!(amount, currency, %idempotency_key, "creating payment intent");

        let result = self
            .http
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(&self.secret_key)
            .header("Idempotency-Key", &idempotency_key)
            .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "payment provider unreachable");
                self.circuit_breaker.record_failure();
                return Err(PaymentError::Transport(e));
            }
        };

        let status = response.status();
        if status.is_success() {
            self.circuit_breaker.record_success();
            let intent = response.json::<PaymentIntent>().await?;
            info!(intent_id = %intent.id, status = %intent.status, "payment intent created");
            return Ok(intent);
        }

        // Only outages count against the breaker; a rejected request means Stripe is up
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            self.circuit_breaker.record_failure();
        } else {
            self.circuit_breaker.record_success();
        }

        let message = match response.json::<StripeErrorEnvelope>().await {
            Ok(envelope) => {
                warn!(%status, kind = ?envelope.error.kind, "payment provider rejected request");
                envelope
                    .error
                    .message
                    .unwrap_or_else(|| format!("Payment provider returned {status}"))
            }
            Err(_) => format!("Payment provider returned {status}"),
        };
        Err(PaymentError::Provider(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(api_base: &str, failure_threshold: u32) -> PaymentConfig {
        PaymentConfig {
            host: "127.0.0.1".into(),
            port: 0,
            rust_log: "debug".into(),
            log_format: crate::config::LogFormat::Pretty,
            stripe_secret_key: "sk_test_123".into(),
            endpoint_secret: "whsec_test".into(),
            api_base: api_base.into(),
            intent_amount: 1000,
            intent_currency: "usd".into(),
            webhook_tolerance_seconds: 300,
            circuit_breaker: CircuitBreakerConfig { failure_threshold, timeout_seconds: 60 },
        }
    }

    fn intent_json() -> serde_json::Value {
        serde_json::json!({
            "id": "pi_123",
            "object": "payment_intent",
            "client_secret": "pi_123_secret_abc",
            "amount": 1000,
            "currency": "usd",
            "status": "requires_payment_method"
        })
    }

    #[test]
    fn breaker_opens_at_threshold_and_recovers_after_timeout() {
        let breaker = CircuitBreaker::new(2, Duration::ZERO);
        assert!(breaker.can_execute());
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);

        // zero timeout: the next call is the half-open trial call
        assert!(breaker.can_execute());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn breaker_stays_open_within_timeout() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(3600));
        breaker.record_failure();
        assert!(!breaker.can_execute());
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn half_open_admits_a_single_trial_call() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(200));
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(250));

        assert!(breaker.can_execute());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(!breaker.can_execute());
        assert!(!breaker.can_execute());

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.can_execute());
        assert!(breaker.can_execute());
    }

    #[test]
    fn failed_trial_call_reopens() {
        let breaker = CircuitBreaker::new(1, Duration::ZERO);
        breaker.record_failure();
        assert!(breaker.can_execute());
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn error_statuses() {
        assert_eq!(PaymentError::InvalidPayload.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(PaymentError::InvalidSignature.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(PaymentError::Provider("x".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(PaymentError::CircuitOpen.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn creates_intent_with_form_body_and_idempotency_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .and(header("authorization", "Bearer sk_test_123"))
            .and(header_exists("idempotency-key"))
            .and(body_string_contains("amount=1000"))
            .and(body_string_contains("currency=usd"))
            .respond_with(ResponseTemplate::new(200).set_body_json(intent_json()))
            .expect(1)
            .mount(&server)
            .await;

        let client = StripeClient::from_config(&config(&server.uri(), 5)).unwrap();
        let intent = client.create_payment_intent(1000, "usd").await.unwrap();
        assert_eq!(intent.client_secret, "pi_123_secret_abc");
        assert_eq!(client.circuit_state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn provider_rejection_surfaces_stripe_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"type": "invalid_request_error", "message": "Invalid API Key provided"}
            })))
            .mount(&server)
            .await;

        let client = StripeClient::from_config(&config(&server.uri(), 1)).unwrap();
        let err = client.create_payment_intent(1000, "usd").await.unwrap_err();
        assert!(matches!(&err, PaymentError::Provider(msg) if msg == "Invalid API Key provided"));
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(client.circuit_state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn outages_open_the_breaker() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let client = StripeClient::from_config(&config(&server.uri(), 2)).unwrap();
        for _ in 0..2 {
            let err = client.create_payment_intent(1000, "usd").await.unwrap_err();
            assert!(matches!(err, PaymentError::Provider(_)));
        }
        assert_eq!(client.circuit_state(), CircuitState::Open);

        let err = client.create_payment_intent(1000, "usd").await.unwrap_err();
        assert!(matches!(err, PaymentError::CircuitOpen));
    }
}
