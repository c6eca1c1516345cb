//! Gateway request signing and notification hash validation.
//!
//! Outbound requests are signed by sorting all fields alphabetically,
//! concatenating them as `key=value&...`, appending the shared secret, and
//! hashing with SHA-256 (hex). Inbound notifications carry a validation hash
//! over `basket_id|secret|merchant_id|err_code`; a mismatch means the
//! notification must be discarded before any state mutation.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Computes the outbound request signature.
///
/// Fields are sorted by key; the secret is appended after the final pair.
pub fn sign_request(fields: &[(&str, &str)], secret: &str) -> String {
    let mut sorted: Vec<&(&str, &str)> = fields.iter().collect();
    sorted.sort_by_key(|(k, _)| *k);

    let concatenated: String = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(concatenated.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Computes the expected inbound-notification hash.
pub fn notification_hash(basket_id: &str, secret: &str, merchant_id: &str, err_code: &str) -> String {
    let payload = format!("{}|{}|{}|{}", basket_id, secret, merchant_id, err_code);
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    hex::encode(hasher.finalize())
}

/// Verifies a received validation hash against the locally computed one.
///
/// Comparison is case-insensitive (gateways disagree on hex casing) and
/// constant-time over the normalized digests.
pub fn verify_notification_hash(
    received: &str,
    basket_id: &str,
    secret: &str,
    merchant_id: &str,
    err_code: &str,
) -> bool {
    let expected = notification_hash(basket_id, secret, merchant_id, err_code);
    let received = received.to_ascii_lowercase();
    if expected.len() != received.len() {
        return false;
    }
    expected.as_bytes().ct_eq(received.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "shared-secret-123";
    const MERCHANT: &str = "MERCHANT01";

    #[test]
    fn sign_request_sorts_fields_alphabetically() {
        let unsorted = sign_request(
            &[("token", "T"), ("amount", "5000.00"), ("basket_id", "SUB-1")],
            SECRET,
        );
        let sorted = sign_request(
            &[("amount", "5000.00"), ("basket_id", "SUB-1"), ("token", "T")],
            SECRET,
        );
        assert_eq!(unsorted, sorted);
    }

    #[test]
    fn sign_request_is_hex_sha256() {
        let sig = sign_request(&[("a", "1")], SECRET);
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn signature_changes_with_secret() {
        let a = sign_request(&[("a", "1")], "secret-a");
        let b = sign_request(&[("a", "1")], "secret-b");
        assert_ne!(a, b);
    }

    #[test]
    fn notification_hash_round_trips() {
        let hash = notification_hash("SUB-1", SECRET, MERCHANT, "000");
        assert!(verify_notification_hash(&hash, "SUB-1", SECRET, MERCHANT, "000"));
    }

    #[test]
    fn verification_is_case_insensitive() {
        let hash = notification_hash("SUB-1", SECRET, MERCHANT, "000").to_ascii_uppercase();
        assert!(verify_notification_hash(&hash, "SUB-1", SECRET, MERCHANT, "000"));
    }

    #[test]
    fn tampered_err_code_fails_verification() {
        let hash = notification_hash("SUB-1", SECRET, MERCHANT, "000");
        assert!(!verify_notification_hash(&hash, "SUB-1", SECRET, MERCHANT, "002"));
    }

    #[test]
    fn wrong_secret_fails_verification() {
        let hash = notification_hash("SUB-1", "other-secret", MERCHANT, "000");
        assert!(!verify_notification_hash(&hash, "SUB-1", SECRET, MERCHANT, "000"));
    }

    #[test]
    fn truncated_hash_fails_verification() {
        let hash = notification_hash("SUB-1", SECRET, MERCHANT, "000");
        assert!(!verify_notification_hash(&hash[..32], "SUB-1", SECRET, MERCHANT, "000"));
    }
}
