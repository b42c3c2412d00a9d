use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::PaymentConfig;
use crate::services::payment::{PaymentError, StripeClient};
use crate::services::webhook::{construct_event, PAYMENT_SUCCEEDED, SIGNATURE_HEADER};

// State of the payment service process
pub struct PaymentState {
    pub stripe: StripeClient,
    pub config: PaymentConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub client_secret: String,
}

pub fn payment_router(state: Arc<PaymentState>) -> Router {
    Router::new()
        .route("/create-payment-intent", post(create_payment_intent))
        .route("/webhook", post(stripe_webhook))
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

// POST /create-payment-intent
async fn create_payment_intent(
    State(state): State<Arc<PaymentState>>,
) -> Result<Json<PaymentIntentResponse>, PaymentError> {
    let intent = state
        .stripe
        .create_payment_intent(state.config.intent_amount, &state.config.intent_currency)
        .await?;
    Ok(Json(PaymentIntentResponse { client_secret: intent.client_secret }))
}

// POST /webhook
async fn stripe_webhook(
    State(state): State<Arc<PaymentState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, PaymentError> {
    let payload = std::str::from_utf8(&body).map_err(|_| PaymentError::InvalidPayload)?;
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());

    let event = construct_event(
        payload,
        signature,
        &state.config.endpoint_secret,
        state.config.webhook_tolerance_seconds,
    )
    .inspect_err(|e| warn!(error = %e, "webhook rejected"))?;

    if event.event_type == PAYMENT_SUCCEEDED {
        let intent_id = event.data.object.get("id").and_then(|v| v.as_str()).unwrap_or_default();
        info!(event_id = ?event.id, intent_id, "payment intent succeeded");
    } else {
        info!(event_id = ?event.id, event_type = %event.event_type, "unhandled webhook event");
    }

    Ok(Json(json!({"status": "success"})))
}
