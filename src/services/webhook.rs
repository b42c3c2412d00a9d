//! Stripe webhook verification.
//!
//! The `Stripe-Signature` header looks like `t=1700000000,v1=<hex>,v1=<hex>`.
//! A delivery is accepted when one of the `v1` values equals
//! `HMAC-SHA256(endpoint_secret, "<t>.<raw body>")` and `t` is within the
//! tolerance window.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::services::payment::PaymentError;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "stripe-signature";
pub const PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: EventData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventData {
    #[serde(default)]
    pub object: serde_json::Value,
}

#[derive(Debug, PartialEq, Eq)]
struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

fn parse_header(header: &str) -> Option<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for item in header.split(',') {
        let (key, value) = match item.trim().split_once('=') {
            Some(pair) => pair,
            None => continue,
        };
        match key {
            "t" => timestamp = value.parse::<i64>().ok(),
            // Undecodable candidates simply never match
            "v1" => signatures.extend(hex::decode(value).ok()),
            _ => {}
        }
    }
    Some(SignatureHeader { timestamp: timestamp?, signatures })
}

fn compute_signature(secret: &str, timestamp: i64, payload: &str) -> Vec<u8> {
    // HMAC accepts keys of any length
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return Vec::new(),
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// Hex signature for `payload` at `timestamp`, as Stripe would send it.
pub fn sign(secret: &str, timestamp: i64, payload: &str) -> String {
    hex::encode(compute_signature(secret, timestamp, payload))
}

pub fn verify_signature(
    payload: &str,
    header: Option<&str>,
    secret: &str,
    tolerance_seconds: i64,
    now: i64,
) -> Result<(), PaymentError> {
    let header = header
        .and_then(parse_header)
        .ok_or(PaymentError::InvalidSignature)?;
    if header.signatures.is_empty() {
        debug!("no v1 signature in header");
        return Err(PaymentError::InvalidSignature);
    }

    let expected = compute_signature(secret, header.timestamp, payload);
    let matched = header.signatures.iter().any(|candidate| {
        candidate.len() == expected.len()
            && bool::from(candidate.as_slice().ct_eq(expected.as_slice()))
    });
    if !matched {
        return Err(PaymentError::InvalidSignature);
    }

    if tolerance_seconds > 0 && (now - header.timestamp).abs() > tolerance_seconds {
        debug!(timestamp = header.timestamp, now, "webhook timestamp outside tolerance");
        return Err(PaymentError::InvalidSignature);
    }
    Ok(())
}

/// Parses the body first (a malformed body is `InvalidPayload` regardless of
/// the signature), then checks the signature.
pub fn construct_event(
    payload: &str,
    header: Option<&str>,
    secret: &str,
    tolerance_seconds: i64,
) -> Result<StripeEvent, PaymentError> {
    let event: StripeEvent = serde_json::from_str(payload).map_err(|_| PaymentError::InvalidPayload)?;
    verify_signature(payload, header, secret, tolerance_seconds, chrono::Utc::now().timestamp())?;
    Ok(event)
}
