//! Signed webhook payloads.
//!
//! The processor sends `Stripe-Signature: t=<unix seconds>,v1=<hex>` where the
//! signature is HMAC-SHA256 over `"{t}.{raw body}"`. The same scheme signs
//! client log submissions.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age (and clock skew) accepted for a signature timestamp
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Signature header has no timestamp")]
    MissingTimestamp,
    #[error("Signature header has no v1 signature")]
    MissingSignature,
    #[error("Signature timestamp is not a number")]
    InvalidTimestamp,
    #[error("Signature timestamp outside tolerance")]
    Expired,
    #[error("No signature matches the payload")]
    Mismatch,
    #[error("Signing key rejected")]
    InvalidKey,
}

fn mac(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidKey)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Hex-encoded v1 signature for `payload` at `timestamp`
pub fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, SignatureError> {
    Ok(hex::encode(mac(secret, timestamp, payload)?.finalize().into_bytes()))
}

/// A complete `t=..,v1=..` header value
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, SignatureError> {
    Ok(format!("t={},v1={}", timestamp, sign(secret, timestamp, payload)?))
}

/// Verify `header` against `payload`, with `now` in unix seconds.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value.trim()),
            Some(("v1", value)) => signatures.push(value.trim()),
            _ => {}
        }
    }

    let timestamp: i64 = timestamp
        .ok_or(SignatureError::MissingTimestamp)?
        .parse()
        .map_err(|_| SignatureError::InvalidTimestamp)?;
    if signatures.is_empty() {
        return Err(SignatureError::MissingSignature);
    }
    if now.abs_diff(timestamp) > SIGNATURE_TOLERANCE_SECS.unsigned_abs() {
        return Err(SignatureError::Expired);
    }

    let expected = mac(secret, timestamp, payload)?;
    let matched = signatures
        .iter()
        .filter_map(|sig| hex::decode(sig).ok())
        .any(|sig| expected.clone().verify_slice(&sig).is_ok());

    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// The subset of a processor event this service acts on
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookData {
    pub object: WebhookObject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookObject {
    pub id: String,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
    /// Set on checkout sessions: "paid", "unpaid" or "no_payment_required"
    #[serde(default)]
    pub payment_status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    PaymentSucceeded,
    PaymentFailed,
    CheckoutExpired,
    Ignored,
}

impl WebhookEvent {
    pub fn kind(&self) -> EventKind {
        match self.event_type.as_str() {
            "payment_intent.succeeded" | "checkout.session.async_payment_succeeded" => {
                EventKind::PaymentSucceeded
            }
            // delayed payment methods complete the session before the money arrives
            "checkout.session.completed" => match self.data.object.payment_status.as_deref() {
                None | Some("paid") => EventKind::PaymentSucceeded,
                Some(_) => EventKind::Ignored,
            },
            "payment_intent.payment_failed" | "checkout.session.async_payment_failed" => {
                EventKind::PaymentFailed
            }
            "checkout.session.expired" => EventKind::CheckoutExpired,
            _ => EventKind::Ignored,
        }
    }

    fn metadata_id(&self, key: &str) -> Option<Uuid> {
        self.data
            .object
            .metadata
            .as_ref()?
            .get(key)
            .and_then(|v| Uuid::parse_str(v).ok())
    }

    pub fn ride_id(&self) -> Option<Uuid> {
        self.metadata_id("ride_id")
    }

    pub fn order_id(&self) -> Option<Uuid> {
        self.metadata_id("order_id")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const PAYLOAD: &[u8] = br#"{"id":"evt_1","type":"payment_intent.succeeded"}"#;
    const NOW: i64 = 1_700_000_000;

    #[test]
    fn test_accepts_fresh_signature() {
        let header = signature_header(SECRET, NOW, PAYLOAD).unwrap();
        assert_eq!(verify_signature(PAYLOAD, &header, SECRET, NOW + 10), Ok(()));
    }

    #[test]
    fn test_rejects_stale_signature() {
        let header = signature_header(SECRET, NOW - SIGNATURE_TOLERANCE_SECS - 1, PAYLOAD).unwrap();
        assert_eq!(
            verify_signature(PAYLOAD, &header, SECRET, NOW),
            Err(SignatureError::Expired)
        );

        // exactly at the edge is still fine
        let header = signature_header(SECRET, NOW - SIGNATURE_TOLERANCE_SECS, PAYLOAD).unwrap();
        assert_eq!(verify_signature(PAYLOAD, &header, SECRET, NOW), Ok(()));
    }

    #[test]
    fn test_rejects_wrong_secret_or_body() {
        let header = signature_header("whsec_other", NOW, PAYLOAD).unwrap();
        assert_eq!(
            verify_signature(PAYLOAD, &header, SECRET, NOW),
            Err(SignatureError::Mismatch)
        );

        let header = signature_header(SECRET, NOW, PAYLOAD).unwrap();
        assert_eq!(
            verify_signature(b"{\"tampered\":true}", &header, SECRET, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_any_v1_may_match() {
        let good = sign(SECRET, NOW, PAYLOAD).unwrap();
        let header = format!("t={}, v1=deadbeef, v0=ignored, v1={}", NOW, good);
        assert_eq!(verify_signature(PAYLOAD, &header, SECRET, NOW), Ok(()));
    }

    #[test]
    fn test_malformed_headers() {
        assert_eq!(
            verify_signature(PAYLOAD, "v1=abc", SECRET, NOW),
            Err(SignatureError::MissingTimestamp)
        );
        assert_eq!(
            verify_signature(PAYLOAD, "t=soon,v1=abc", SECRET, NOW),
            Err(SignatureError::InvalidTimestamp)
        );
        assert_eq!(
            verify_signature(PAYLOAD, &format!("t={}", NOW), SECRET, NOW),
            Err(SignatureError::MissingSignature)
        );
        assert_eq!(
            verify_signature(PAYLOAD, &format!("t={},v1=not-hex", NOW), SECRET, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_event_kinds_and_metadata() {
        let ride_id = Uuid::new_v4();
        let event: WebhookEvent = serde_json::from_value(serde_json::json!({
            "id": "evt_2",
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": "cs_1",
                "payment_status": "paid",
                "metadata": { "ride_id": ride_id.to_string() }
            }}
        }))
        .unwrap();
        assert_eq!(event.kind(), EventKind::PaymentSucceeded);
        assert_eq!(event.ride_id(), Some(ride_id));
        assert_eq!(event.order_id(), None);

        let unpaid: WebhookEvent = serde_json::from_value(serde_json::json!({
            "id": "evt_3",
            "type": "checkout.session.completed",
            "data": { "object": { "id": "cs_2", "payment_status": "unpaid", "metadata": null } }
        }))
        .unwrap();
        assert_eq!(unpaid.kind(), EventKind::Ignored);
        assert_eq!(unpaid.ride_id(), None);
    }
}
