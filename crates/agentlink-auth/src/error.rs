//! Error types for token operations.

use crate::credential::Scope;
use thiserror::Error;

/// Errors that can occur during token operations.
///
/// Verification failures are only surfaced through [`crate::TokenAuthority::check`]
/// and [`crate::TokenAuthority::authorize`]; `validate` maps all of them to `None`.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Bearer string does not have the `<payload>.<signature>` shape.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// Payload is not valid base64url JSON with the required fields.
    #[error("malformed token payload: {0}")]
    MalformedPayload(String),

    /// Recomputed signature does not match the supplied one.
    #[error("token signature mismatch")]
    SignatureMismatch,

    /// Token validity window has passed.
    #[error("token has expired at {expires_at}")]
    Expired { expires_at: i64 },

    /// Token validity window has not started yet.
    #[error("token is not valid before {issued_at}")]
    NotYetValid { issued_at: i64 },

    /// Token string is in the revocation set.
    #[error("token has been revoked")]
    Revoked,

    /// Token scope differs from the scope the caller requires.
    #[error("token scope {actual} does not match required scope {required}")]
    ScopeMismatch { required: Scope, actual: Scope },

    /// Token subject is not on the allow-list.
    #[error("agent {agent_id} is not allowed")]
    AgentNotAllowed { agent_id: String },

    /// Secret key is unusable.
    #[error("invalid secret key: {0}")]
    InvalidSecret(String),

    /// Authority options are unusable.
    #[error("invalid authority options: {0}")]
    InvalidOptions(String),

    /// IO error (reading/writing secrets).
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl TokenError {
    /// Short machine-readable code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed",
            Self::MalformedPayload(_) => "malformed_payload",
            Self::SignatureMismatch => "signature_mismatch",
            Self::Expired { .. } => "expired",
            Self::NotYetValid { .. } => "not_yet_valid",
            Self::Revoked => "revoked",
            Self::ScopeMismatch { .. } => "scope_mismatch",
            Self::AgentNotAllowed { .. } => "agent_not_allowed",
            Self::InvalidSecret(_) => "invalid_secret",
            Self::InvalidOptions(_) => "invalid_options",
            Self::IoError(_) => "io",
        }
    }
}
