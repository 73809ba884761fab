//! # agentlink-auth
//!
//! Agent token authentication for AgentLink.
//!
//! This crate provides functionality for:
//! - Issuing short-lived bearer tokens bound to an agent identity and scope
//! - Verifying tokens minted locally or by another process sharing the secret
//! - Revoking individual tokens and sweeping expired ones
//! - Checking presented agents against an allow-list
//!
//! ## Bearer Format
//!
//! ```text
//! base64url(JSON{agentId,scope,issuedAt,expiresAt}) "." base64url(HMAC-SHA256(secret, payload))
//! ```
//!
//! Both segments are unpadded. Timestamps are Unix milliseconds.
//!
//! ## Verification Order
//!
//! | Step | Check | Rejection |
//! |------|-------|-----------|
//! | 1 | Revocation set | `Revoked` |
//! | 2 | Local issued cache + validity window | `Expired` / `NotYetValid` |
//! | 3 | Structure, signature, payload, validity window | `Malformed` / `SignatureMismatch` / ... |
//!
//! [`TokenAuthority::validate`] collapses every rejection into `None`;
//! [`TokenAuthority::check`] keeps the reason for diagnostics.

pub mod authority;
pub mod clock;
pub mod credential;
pub mod error;
pub mod secret;
pub mod signing;

pub use agentlink_core::{AgentIdentity, AgentKind};
pub use authority::{AuthorityOptions, AuthorityStats, TokenAuthority};
pub use clock::{Clock, ManualClock, SystemClock};
pub use credential::{
    Credential, Scope, TokenPayload, inspect_unverified, parse_bearer_header,
};
pub use error::TokenError;
pub use secret::SecretKey;
