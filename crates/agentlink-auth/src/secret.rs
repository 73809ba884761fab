//! Shared signing secrets.

use crate::error::TokenError;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use std::fmt;
use std::path::Path;

/// Number of random bytes in a generated secret.
const GENERATED_SECRET_BYTES: usize = 32;

/// An opaque shared secret used to sign and verify agent tokens.
///
/// Two authorities accept each other's tokens only when they hold the same
/// secret. The value is never transmitted and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey {
    inner: String,
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey").field("len", &self.inner.len()).finish()
    }
}

impl SecretKey {
    /// Generate a new random secret.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let mut bytes = [0u8; GENERATED_SECRET_BYTES];
        rng.fill_bytes(&mut bytes);

        Self {
            inner: URL_SAFE_NO_PAD.encode(bytes),
        }
    }

    /// Create a secret from an existing string.
    pub fn from_string(secret: impl Into<String>) -> Result<Self, TokenError> {
        let inner = secret.into();
        if inner.is_empty() {
            return Err(TokenError::InvalidSecret("secret must not be empty".to_string()));
        }
        Ok(Self { inner })
    }

    /// Load a secret from a file, trimming surrounding whitespace.
    pub fn load_from_file(path: &Path) -> Result<Self, TokenError> {
        let secret = std::fs::read_to_string(path)?;
        Self::from_string(secret.trim())
    }

    /// Save the secret to a file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), TokenError> {
        std::fs::write(path, &self.inner)?;
        Ok(())
    }

    /// Raw secret bytes used as the HMAC key.
    pub fn as_bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }

    /// Expose the secret text (for writing it somewhere safe).
    pub fn expose(&self) -> &str {
        &self.inner
    }
}
