//! Webhook signature verification, compatible with the svix scheme the
//! identity provider uses: HMAC-SHA256 over `{id}.{timestamp}.{body}`
//! with a base64 shared secret, signatures base64-encoded and prefixed
//! `v1,` in a space-separated header.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Maximum allowed clock skew between the event timestamp and now.
const TOLERANCE_SECS: i64 = 300;

fn secret_bytes(secret: &str) -> Vec<u8> {
    let trimmed = secret.strip_prefix("whsec_").unwrap_or(secret);
    BASE64
        .decode(trimmed)
        .unwrap_or_else(|_| trimmed.as_bytes().to_vec())
}

fn compute(secret: &str, msg_id: &str, timestamp: &str, payload: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(&secret_bytes(secret))
        .expect("HMAC accepts any key length");
    mac.update(msg_id.as_bytes());
    mac.update(b".");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Produce the `v1,<base64>` signature for an event. Used by tests and
/// local tooling to forge valid deliveries.
pub fn sign(secret: &str, msg_id: &str, timestamp: &str, payload: &[u8]) -> String {
    format!("v1,{}", BASE64.encode(compute(secret, msg_id, timestamp, payload)))
}

/// Verify a signature header against the payload. The header may list
/// several space-separated signatures (key rotation); any valid `v1`
/// entry accepts. Comparison is constant time.
pub fn verify(
    secret: &str,
    msg_id: &str,
    timestamp: &str,
    payload: &[u8],
    signature_header: &str,
) -> bool {
    let Ok(ts) = timestamp.parse::<i64>() else {
        return false;
    };
    let now = chrono::Utc::now().timestamp();
    if (now - ts).abs() > TOLERANCE_SECS {
        return false;
    }

    let expected = compute(secret, msg_id, timestamp, payload);

    signature_header
        .split(' ')
        .filter_map(|entry| entry.strip_prefix("v1,"))
        .filter_map(|sig| BASE64.decode(sig).ok())
        .any(|candidate| candidate.ct_eq(&expected).into())
}
