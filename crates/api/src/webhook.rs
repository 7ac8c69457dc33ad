//! HMAC-SHA256 signature verification for webhook payloads.
//!
//! Both webhook providers sign the raw request body; signatures arrive as
//! hex digests, optionally prefixed with `sha256=`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verify a hex-encoded HMAC-SHA256 signature over `payload`.
///
/// Comparison happens inside the MAC verification, so it is constant-time.
/// Any malformed input (bad hex, wrong length) simply fails verification.
pub fn verify_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    let signature = signature.trim();
    let signature = signature.strip_prefix("sha256=").unwrap_or(signature);

    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

/// Produce the hex HMAC-SHA256 signature for `payload`.
///
/// Counterpart of [`verify_signature`]; used by delivery tooling and tests.
pub fn sign_payload(secret: &str, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}
