//! Payment webhook signature verification.
//!
//! The front end forwards payment events signed with a shared secret:
//! `x-webhook-signature: hex(HMAC-SHA256(secret, raw body))`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute HMAC-SHA256 over `body` and return it hex-encoded (64 characters).
#[must_use]
pub fn sign_payload(secret: &str, body: &[u8]) -> String {
    // INVARIANT: HMAC accepts keys of any size (RFC 2104), so
    // `new_from_slice` cannot fail for SHA-256.
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC-SHA256 accepts any key size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Check a hex signature against the expected HMAC of `body`.
///
/// Comparison runs in constant time over the decoded bytes; malformed hex
/// is rejected.
#[must_use]
pub fn verify_signature(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let Ok(provided) = hex::decode(signature_hex.trim()) else {
        return false;
    };

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC-SHA256 accepts any key size");
    mac.update(body);
    mac.verify_slice(&provided).is_ok()
}
