//! Discourse webhook authentication.
//!
//! Discourse signs webhook bodies with HMAC-SHA256 over the shared secret and
//! sends the result in the `X-Discourse-Event-Signature` header as
//! `sha256=<hex>`. Some reverse proxies and older forum setups cannot add that
//! header, so a request without it may instead carry the secret itself in a
//! `secret` query parameter.
//!
//! Authentication happens before any parsing; unauthenticated bodies are never
//! looked at.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Parses a signature header (e.g., "sha256=abc123...") into raw bytes.
///
/// Returns `None` for malformed headers (missing prefix, invalid hex, etc.).
/// Never panics.
///
/// # Examples
///
/// ```
/// use forum_relay::webhooks::parse_signature_header;
///
/// assert!(parse_signature_header("sha256=abcd1234").is_some());
/// assert!(parse_signature_header("abcd1234").is_none());
/// assert!(parse_signature_header("sha256=xyz").is_none());
/// ```
pub fn parse_signature_header(header: &str) -> Option<Vec<u8>> {
    let hex_sig = header.trim().strip_prefix("sha256=")?;
    hex::decode(hex_sig).ok()
}

/// Computes the HMAC-SHA256 signature of a payload.
///
/// Used by tests and tooling to produce the header a forum would send.
pub fn compute_signature(payload: &[u8], secret: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Formats a signature as a header value: `sha256=<hex>`.
pub fn format_signature_header(signature: &[u8]) -> String {
    format!("sha256={}", hex::encode(signature))
}

/// Verifies a signature header against the payload and secret.
///
/// Uses the HMAC library's constant-time comparison.
///
/// # Examples
///
/// ```
/// use forum_relay::webhooks::{compute_signature, format_signature_header, verify_signature};
///
/// let payload = br#"{"topic":{"id":1}}"#;
/// let header = format_signature_header(&compute_signature(payload, b"s3cret"));
///
/// assert!(verify_signature(payload, &header, b"s3cret"));
/// assert!(!verify_signature(payload, &header, b"other"));
/// ```
pub fn verify_signature(payload: &[u8], signature_header: &str, secret: &[u8]) -> bool {
    let Some(expected_signature) = parse_signature_header(signature_header) else {
        return false;
    };

    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);
    mac.verify_slice(&expected_signature).is_ok()
}

/// Checks a plain shared secret passed as a query parameter.
///
/// The comparison time does not depend on where the inputs first differ.
pub fn verify_query_secret(provided: &str, secret: &[u8]) -> bool {
    let provided = provided.as_bytes();
    if provided.len() != secret.len() || secret.is_empty() {
        return false;
    }
    provided
        .iter()
        .zip(secret)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Authenticates a webhook request.
///
/// A signature header, when present, is authoritative: a bad signature is not
/// rescued by a correct query secret. Without a header, the query secret is
/// checked instead. With neither, the request is rejected.
pub fn authenticate(
    payload: &[u8],
    signature_header: Option<&str>,
    query_secret: Option<&str>,
    secret: &[u8],
) -> bool {
    match (signature_header, query_secret) {
        (Some(header), _) => verify_signature(payload, header, secret),
        (None, Some(provided)) => verify_query_secret(provided, secret),
        (None, None) => false,
    }
}
