//! Credential model and payload encoding.

use crate::error::TokenError;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator between the payload and signature segments of a bearer string.
pub const SEGMENT_SEPARATOR: char = '.';

/// Privilege label attached to a credential.
///
/// Variants are ordered by increasing privilege, but scopes are compared by
/// exact match only: `admin` does not satisfy a `read` requirement.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Read,
    Write,
    Admin,
}

impl Scope {
    pub const ALL: [Scope; 3] = [Scope::Read, Scope::Write, Scope::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown scope label.
#[derive(Debug, thiserror::Error)]
#[error("unknown scope '{0}' (expected read, write or admin)")]
pub struct ParseScopeError(String);

impl FromStr for Scope {
    type Err = ParseScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            "admin" => Ok(Self::Admin),
            other => Err(ParseScopeError(other.to_string())),
        }
    }
}

/// The signed fields of a token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenPayload {
    /// Subject the token speaks for.
    pub agent_id: String,

    pub scope: Scope,

    /// Unix milliseconds.
    pub issued_at: i64,

    /// Unix milliseconds, inclusive upper bound of the validity window.
    pub expires_at: i64,
}

impl TokenPayload {
    /// Serialize to JSON and base64url-encode without padding.
    pub fn encode(&self) -> String {
        // Serializing a struct of strings, an enum and integers cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Decode a base64url payload segment.
    pub fn decode(payload: &str) -> Result<Self, TokenError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| TokenError::MalformedPayload(format!("invalid base64url: {e}")))?;

        let fields: Self = serde_json::from_slice(&bytes)
            .map_err(|e| TokenError::MalformedPayload(format!("invalid JSON: {e}")))?;

        if fields.issued_at >= fields.expires_at {
            return Err(TokenError::MalformedPayload(
                "issuedAt must precede expiresAt".to_string(),
            ));
        }

        Ok(fields)
    }

    /// Check `now` against `[issued_at, expires_at]`.
    pub fn check_window(&self, now: i64) -> Result<(), TokenError> {
        if now < self.issued_at {
            return Err(TokenError::NotYetValid {
                issued_at: self.issued_at,
            });
        }
        if now > self.expires_at {
            return Err(TokenError::Expired {
                expires_at: self.expires_at,
            });
        }
        Ok(())
    }
}

/// One grant: who, at which scope, for how long, plus the bearer string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub agent_id: String,
    pub scope: Scope,
    pub issued_at: i64,
    pub expires_at: i64,

    /// Canonical bearer string `<payload>.<signature>`.
    pub token: String,

    /// Free-form metadata. Carried locally, never signed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Credential {
    pub(crate) fn from_payload(payload: TokenPayload, token: String) -> Self {
        Self {
            agent_id: payload.agent_id,
            scope: payload.scope,
            issued_at: payload.issued_at,
            expires_at: payload.expires_at,
            token,
            metadata: None,
        }
    }

    /// The signed fields of this credential.
    pub fn payload(&self) -> TokenPayload {
        TokenPayload {
            agent_id: self.agent_id.clone(),
            scope: self.scope,
            issued_at: self.issued_at,
            expires_at: self.expires_at,
        }
    }

    /// Whether `now` falls inside the validity window.
    pub fn is_active_at(&self, now: i64) -> bool {
        now >= self.issued_at && now <= self.expires_at
    }

    /// Get time until expiration; negative once expired.
    pub fn time_until_expiration(&self, now: i64) -> chrono::Duration {
        chrono::Duration::milliseconds(self.expires_at - now)
    }

    /// Value for an `Authorization` header.
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Split a bearer string into its payload and signature segments.
pub(crate) fn split_bearer(bearer: &str) -> Result<(&str, &str), TokenError> {
    let mut parts = bearer.split(SEGMENT_SEPARATOR);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(payload), Some(signature), None) => Ok((payload, signature)),
        _ => Err(TokenError::Malformed(
            "expected exactly two '.'-separated segments".to_string(),
        )),
    }
}

/// Decode a token's payload without checking its signature or expiry (for debugging).
pub fn inspect_unverified(bearer: &str) -> Result<TokenPayload, TokenError> {
    let (payload, _) = split_bearer(bearer.trim())?;
    TokenPayload::decode(payload)
}

/// Extract the bearer string from an `Authorization` header value.
pub fn parse_bearer_header(value: &str) -> Option<&str> {
    let value = value.trim();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
