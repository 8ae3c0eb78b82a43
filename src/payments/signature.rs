//! Gateway payment signatures.
//!
//! After checkout the gateway signs `order_id|payment_id` with the merchant
//! key secret (HMAC-SHA256, lowercase hex). A submission is genuine only if
//! the signature it carries matches ours byte for byte.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC-SHA256 of `order_id|payment_id` under `secret`
pub fn expected_signature(secret: &str, order_id: &str, payment_id: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time comparison of the submitted signature against ours.
/// An empty secret never verifies anything.
pub fn verify_signature(secret: &str, order_id: &str, payment_id: &str, signature: &str) -> bool {
    if secret.is_empty() {
        return false;
    }
    let expected = match expected_signature(secret, order_id, payment_id) {
        Some(s) => s,
        None => return false,
    };

    if expected.len() != signature.len() {
        return false;
    }
    expected.as_bytes().ct_eq(signature.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        let sig = expected_signature("secret", "order_1", "pay_1").unwrap();
        assert_eq!(
            sig,
            "52115a0d3400de9e86aade1f1b6eba9e8974604f4e267a9e9a16633a4c8dd2cb"
        );
    }

    #[test]
    fn test_verify() {
        let sig = expected_signature("secret", "order_1", "pay_1").unwrap();
        assert!(verify_signature("secret", "order_1", "pay_1", &sig));

        // Any change to the inputs or the signature fails
        assert!(!verify_signature("secret", "order_1", "pay_2", &sig));
        assert!(!verify_signature("other", "order_1", "pay_1", &sig));
        assert!(!verify_signature("secret", "order_1", "pay_1", &sig.to_uppercase()));
        assert!(!verify_signature("secret", "order_1", "pay_1", &sig[..63]));
        assert!(!verify_signature("secret", "order_1", "pay_1", ""));
    }

    #[test]
    fn test_empty_secret_never_verifies() {
        let sig = expected_signature("", "order_1", "pay_1").unwrap();
        assert!(!verify_signature("", "order_1", "pay_1", &sig));
    }
}
