//! HMAC-SHA256 signing of token payloads.

use crate::error::TokenError;
use crate::secret::SecretKey;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Signs and verifies payload strings with a keyed HMAC.
///
/// The MAC is keyed once at construction and cloned per operation.
#[derive(Clone)]
pub struct Signer {
    mac: HmacSha256,
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Signer(HMAC-SHA256)")
    }
}

impl Signer {
    pub fn new(secret: &SecretKey) -> Result<Self, TokenError> {
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| TokenError::InvalidSecret(e.to_string()))?;
        Ok(Self { mac })
    }

    /// Compute the base64url (unpadded) signature over the exact payload text.
    pub fn sign(&self, payload: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    /// Verify a signature received alongside `payload`.
    pub fn verify(&self, payload: &str, signature: &str) -> Result<(), TokenError> {
        URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|e| TokenError::Malformed(format!("signature is not base64url: {e}")))?;

        let expected = self.sign(payload);
        if constant_time_eq(&expected, signature) {
            Ok(())
        } else {
            Err(TokenError::SignatureMismatch)
        }
    }
}

/// Compare two strings without exiting at the first differing byte.
///
/// Lengths are compared first; equal-length inputs are always scanned in full.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();
    if a_bytes.len() != b_bytes.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a_bytes.iter().zip(b_bytes.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Short, non-reversible token identifier for log lines.
pub fn fingerprint(bearer: &str) -> String {
    Sha256::digest(bearer.as_bytes())
        .iter()
        .take(6)
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer(secret: &str) -> Signer {
        Signer::new(&SecretKey::from_string(secret).unwrap()).unwrap()
    }

    #[test]
    fn test_sign_is_deterministic_and_unpadded() {
        let s = signer("secret");
        let sig = s.sign("payload");
        assert_eq!(sig, s.sign("payload"));
        // 32-byte MAC -> 43 unpadded characters
        assert_eq!(sig.len(), 43);
        assert!(!sig.contains('='));
    }

    #[test]
    fn test_known_hmac_vector() {
        // RFC 4231 test case 2
        let s = signer("Jefe");
        let sig = s.sign("what do ya want for nothing?");
        let raw = URL_SAFE_NO_PAD.decode(sig).unwrap();
        let hex: String = raw.iter().map(|b| format!("{b:02x}")).collect();
        assert_eq!(
            hex,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_verify_rejects_other_secret() {
        let sig = signer("a").sign("payload");
        assert!(signer("a").verify("payload", &sig).is_ok());
        assert!(matches!(
            signer("b").verify("payload", &sig),
            Err(TokenError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_verify_rejects_non_base64_signature() {
        assert!(matches!(
            signer("a").verify("payload", "not*base64!"),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
        assert!(constant_time_eq("", ""));
    }

    #[test]
    fn test_fingerprint_is_short_hex() {
        let fp = fingerprint("a.b");
        assert_eq!(fp.len(), 12);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
