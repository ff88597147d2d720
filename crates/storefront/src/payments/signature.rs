//! Webhook signature verification.
//!
//! Header format: `t=<unix seconds>,v1=<hex>[,v1=<hex>...]`. The expected
//! signature is HMAC-SHA256 keyed with the endpoint secret over
//! `"<t>." + raw body`. Any listed `v1` may match, which is how the provider
//! rolls secrets.

use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

use super::StripeEvent;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Reasons a webhook delivery is rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing signature header")]
    MissingHeader,

    #[error("malformed signature header")]
    MalformedHeader,

    #[error("signature header has no v1 signature")]
    NoSignatures,

    #[error("signature timestamp outside tolerance")]
    TimestampOutOfTolerance,

    #[error("signature mismatch")]
    Mismatch,

    #[error("invalid signing secret: {0}")]
    InvalidSecret(String),

    /// The body was authentic but is not a well-formed event.
    #[error("invalid event payload: {0}")]
    InvalidPayload(String),
}

/// Verifies webhook deliveries for one endpoint secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: SecretString,
    tolerance: Duration,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("secret", &"[REDACTED]")
            .field("tolerance", &self.tolerance)
            .finish()
    }
}

impl WebhookVerifier {
    #[must_use]
    pub const fn new(secret: SecretString, tolerance: Duration) -> Self {
        Self { secret, tolerance }
    }

    /// Verify a delivery against the current time and parse the event.
    ///
    /// # Errors
    ///
    /// Returns `SignatureError` if the header is absent or malformed, the
    /// timestamp is stale, no signature matches, or the body is not an event.
    pub fn verify(
        &self,
        payload: &[u8],
        header: Option<&str>,
    ) -> Result<StripeEvent, SignatureError> {
        self.verify_at(payload, header, Utc::now().timestamp())
    }

    /// Same as [`Self::verify`] with an explicit clock.
    ///
    /// # Errors
    ///
    /// See [`Self::verify`].
    pub fn verify_at(
        &self,
        payload: &[u8],
        header: Option<&str>,
        now: i64,
    ) -> Result<StripeEvent, SignatureError> {
        let header = header.ok_or(SignatureError::MissingHeader)?;
        let parsed = parse_header(header)?;

        if now.abs_diff(parsed.timestamp) > self.tolerance.as_secs() {
            return Err(SignatureError::TimestampOutOfTolerance);
        }

        let mac = signing_mac(self.secret.expose_secret(), parsed.timestamp, payload)?;
        let matched = parsed.signatures.iter().any(|candidate| {
            hex::decode(candidate).is_ok_and(|candidate| mac.clone().verify_slice(&candidate).is_ok())
        });
        if !matched {
            return Err(SignatureError::Mismatch);
        }

        serde_json::from_slice(payload).map_err(|e| SignatureError::InvalidPayload(e.to_string()))
    }
}

struct ParsedHeader<'a> {
    timestamp: i64,
    signatures: Vec<&'a str>,
}

fn parse_header(header: &str) -> Result<ParsedHeader<'_>, SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let (key, value) = part
            .trim()
            .split_once('=')
            .ok_or(SignatureError::MalformedHeader)?;
        match key {
            "t" => {
                timestamp = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| SignatureError::MalformedHeader)?,
                );
            }
            "v1" => signatures.push(value),
            // v0 and future schemes are ignored
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(SignatureError::NoSignatures);
    }
    Ok(ParsedHeader {
        timestamp,
        signatures,
    })
}

fn signing_mac(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| SignatureError::InvalidSecret(e.to_string()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Hex signature the provider would send for `payload` at `timestamp`.
///
/// # Errors
///
/// Returns `SignatureError::InvalidSecret` if the secret cannot key the MAC.
pub fn compute_signature(
    secret: &str,
    timestamp: i64,
    payload: &[u8],
) -> Result<String, SignatureError> {
    Ok(hex::encode(
        signing_mac(secret, timestamp, payload)?.finalize().into_bytes(),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_8c1f0a9d3b7e";
    const NOW: i64 = 1_760_000_000;
    const BODY: &[u8] = br#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{}}}"#;

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new(SecretString::from(SECRET), Duration::from_secs(300))
    }

    fn header(timestamp: i64, body: &[u8]) -> String {
        format!("t={timestamp},v1={}", compute_signature(SECRET, timestamp, body).unwrap())
    }

    #[test]
    fn test_valid_signature_parses_event() {
        let event = verifier()
            .verify_at(BODY, Some(&header(NOW, BODY)), NOW)
            .unwrap();
        assert_eq!(event.id, "evt_1");
        assert_eq!(event.event_type, "checkout.session.completed");
    }

    #[test]
    fn test_tampered_body_rejected() {
        let tampered = br#"{"id":"evt_2","type":"checkout.session.completed","data":{"object":{}}}"#;
        let result = verifier().verify_at(tampered, Some(&header(NOW, BODY)), NOW);
        assert_eq!(result.unwrap_err(), SignatureError::Mismatch);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let sig = compute_signature("whsec_other", NOW, BODY).unwrap();
        let result = verifier().verify_at(BODY, Some(&format!("t={NOW},v1={sig}")), NOW);
        assert_eq!(result.unwrap_err(), SignatureError::Mismatch);
    }

    #[test]
    fn test_any_listed_signature_may_match() {
        let good = compute_signature(SECRET, NOW, BODY).unwrap();
        let header = format!("t={NOW},v1=deadbeef,v0=ignored,v1={good}");
        assert!(verifier().verify_at(BODY, Some(&header), NOW).is_ok());
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let result = verifier().verify_at(BODY, Some(&header(NOW - 301, BODY)), NOW);
        assert_eq!(result.unwrap_err(), SignatureError::TimestampOutOfTolerance);
    }

    #[test]
    fn test_timestamp_at_tolerance_accepted() {
        assert!(
            verifier()
                .verify_at(BODY, Some(&header(NOW - 300, BODY)), NOW)
                .is_ok()
        );
    }

    #[test]
    fn test_missing_and_malformed_headers() {
        let v = verifier();
        assert_eq!(
            v.verify_at(BODY, None, NOW).unwrap_err(),
            SignatureError::MissingHeader
        );
        assert_eq!(
            v.verify_at(BODY, Some("garbage"), NOW).unwrap_err(),
            SignatureError::MalformedHeader
        );
        assert_eq!(
            v.verify_at(BODY, Some("v1=abcd"), NOW).unwrap_err(),
            SignatureError::MalformedHeader
        );
        assert_eq!(
            v.verify_at(BODY, Some(&format!("t={NOW}")), NOW).unwrap_err(),
            SignatureError::NoSignatures
        );
    }

    #[test]
    fn test_authentic_non_event_body() {
        let body = b"not json";
        let result = verifier().verify_at(body, Some(&header(NOW, body)), NOW);
        assert!(matches!(result, Err(SignatureError::InvalidPayload(_))));
    }
}
