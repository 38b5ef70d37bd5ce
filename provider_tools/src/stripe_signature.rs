//! Verification of the `Stripe-Signature` header.
//!
//! The header looks like `t=1718000000,v1=5257a869...,v0=...`. The signed payload is `"{t}.{body}"` and each `v1`
//! entry is a hex HMAC-SHA256 of it under the endpoint's webhook secret. Any matching `v1` entry is accepted, so
//! that secrets can be rolled.
use chrono::Utc;
use hmac::{Hmac, Mac};
use log::*;
use sha2::Sha256;

use crate::ProviderApiError;

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";
/// Signatures older (or newer) than this many seconds are rejected.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

/// Checks `header` against the raw request body, using the current time.
pub fn verify(header: &str, body: &[u8], secret: &str) -> Result<(), ProviderApiError> {
    verify_at(header, body, secret, Utc::now().timestamp(), DEFAULT_TOLERANCE_SECS)
}

pub fn verify_at(header: &str, body: &[u8], secret: &str, now: i64, tolerance: i64) -> Result<(), ProviderApiError> {
    if secret.is_empty() {
        return Err(ProviderApiError::InvalidSignature("No webhook secret is configured".into()));
    }
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", t)) => timestamp = t.parse::<i64>().ok(),
            Some(("v1", sig)) => signatures.push(sig),
            _ => {},
        }
    }
    let timestamp = timestamp.ok_or_else(|| ProviderApiError::InvalidSignature("Missing timestamp".into()))?;
    if signatures.is_empty() {
        return Err(ProviderApiError::InvalidSignature("No v1 signature".into()));
    }
    if (now - timestamp).abs() > tolerance {
        warn!("🔐️ Stripe signature timestamp {timestamp} is outside the {tolerance}s tolerance (now {now})");
        return Err(ProviderApiError::InvalidSignature("Timestamp outside the tolerance zone".into()));
    }
    let valid = signatures.iter().filter_map(|sig| hex::decode(sig).ok()).any(|sig| {
        let mut mac = signed_payload_mac(secret, timestamp, body);
        // verify_slice is constant time
        mac.verify_slice(&sig).is_ok()
    });
    if valid {
        Ok(())
    } else {
        Err(ProviderApiError::InvalidSignature("No signature matches the payload".into()))
    }
}

/// Produces a header value for `body` as Stripe would. Used by tests and local tooling.
pub fn sign(body: &[u8], secret: &str, timestamp: i64) -> String {
    let sig = signed_payload_mac(secret, timestamp, body).finalize().into_bytes();
    format!("t={timestamp},v1={}", hex::encode(sig))
}

fn signed_payload_mac(secret: &str, timestamp: i64, body: &[u8]) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    mac
}
