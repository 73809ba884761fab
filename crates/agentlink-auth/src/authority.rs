//! Token issuance, verification and revocation.

use crate::clock::{Clock, SystemClock};
use crate::credential::{Credential, Scope, TokenPayload, split_bearer};
use crate::error::TokenError;
use crate::secret::SecretKey;
use crate::signing::{Signer, fingerprint};
use agentlink_core::config::WILDCARD_AGENT;
use agentlink_core::{AgentIdentity, AgentLinkConfig};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Default token lifetime in seconds.
pub const DEFAULT_TOKEN_EXPIRY_SECONDS: u64 = 3600;

/// Construction options for a [`TokenAuthority`].
#[derive(Debug, Clone)]
pub struct AuthorityOptions {
    /// Signing secret. A fresh random secret is generated when absent.
    pub secret_key: Option<SecretKey>,

    /// Lifetime of issued tokens, in seconds.
    pub token_expiry_seconds: u64,

    /// Agent IDs admitted by [`TokenAuthority::is_agent_allowed`]. Empty means no restriction.
    pub allowed_agents: BTreeSet<String>,
}

impl Default for AuthorityOptions {
    fn default() -> Self {
        Self {
            secret_key: None,
            token_expiry_seconds: DEFAULT_TOKEN_EXPIRY_SECONDS,
            allowed_agents: BTreeSet::new(),
        }
    }
}

impl AuthorityOptions {
    pub fn with_secret(mut self, secret: SecretKey) -> Self {
        self.secret_key = Some(secret);
        self
    }

    pub fn with_expiry_seconds(mut self, seconds: u64) -> Self {
        self.token_expiry_seconds = seconds;
        self
    }

    pub fn allow_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.allowed_agents.insert(agent_id.into());
        self
    }
}

/// Counts of locally tracked tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuthorityStats {
    pub issued: usize,
    pub revoked: usize,
}

#[derive(Debug, Default)]
struct AuthorityState {
    /// Locally minted tokens keyed by bearer string.
    issued: HashMap<String, Credential>,
    /// Revoked bearer strings. Never shrinks.
    revoked: HashSet<String>,
    /// `(scope, issued_at)` slots already used. With the subject and lifetime
    /// fixed, a slot determines the bearer string.
    minted: HashSet<(Scope, i64)>,
}

/// Mints and checks agent tokens for one agent identity.
///
/// All mutable state sits behind a single mutex; every operation is
/// synchronous and performs no I/O. Caches are local to this instance, so a
/// token minted elsewhere is only accepted through signature verification
/// with a shared secret.
#[derive(Debug)]
pub struct TokenAuthority {
    identity: AgentIdentity,
    signer: Signer,
    token_expiry_millis: i64,
    allowed_agents: BTreeSet<String>,
    clock: Arc<dyn Clock>,
    state: Mutex<AuthorityState>,
}

impl TokenAuthority {
    /// Create an authority bound to `identity`.
    pub fn new(identity: AgentIdentity, options: AuthorityOptions) -> Result<Self, TokenError> {
        let secret = match options.secret_key {
            Some(secret) => secret,
            None => {
                warn!(
                    agent_id = %identity.id,
                    "no secret key configured; generated a random one, \
                     tokens will not verify elsewhere"
                );
                SecretKey::generate()
            }
        };

        let token_expiry_millis = i64::try_from(options.token_expiry_seconds)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000);
        if token_expiry_millis <= 0 {
            return Err(TokenError::InvalidOptions(
                "token expiry must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            identity,
            signer: Signer::new(&secret)?,
            token_expiry_millis,
            allowed_agents: options.allowed_agents,
            clock: Arc::new(SystemClock),
            state: Mutex::new(AuthorityState::default()),
        })
    }

    /// Create an authority from a loaded configuration file.
    pub fn from_config(config: &AgentLinkConfig) -> Result<Self, TokenError> {
        let secret_key = config
            .auth
            .resolve_secret_key()?
            .map(SecretKey::from_string)
            .transpose()?;

        Self::new(
            config.identity.clone(),
            AuthorityOptions {
                secret_key,
                token_expiry_seconds: config.auth.token_expiry_seconds,
                allowed_agents: config.auth.allowed_agents.clone(),
            },
        )
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn identity(&self) -> &AgentIdentity {
        &self.identity
    }

    fn lock_state(&self) -> MutexGuard<'_, AuthorityState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Mint a token for this authority's agent at `scope`.
    pub fn issue(&self, scope: Scope) -> Credential {
        self.issue_inner(scope, None)
    }

    /// Mint a token carrying unsigned local metadata.
    pub fn issue_with_metadata(
        &self,
        scope: Scope,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Credential {
        self.issue_inner(scope, Some(metadata))
    }

    fn issue_inner(
        &self,
        scope: Scope,
        metadata: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Credential {
        let mut state = self.lock_state();
        let now = self.clock.now_millis();

        let (payload, token) = loop {
            let issued_at = self.next_free_slot(&state, scope, now);
            state.minted.insert((scope, issued_at));

            let payload = TokenPayload {
                agent_id: self.identity.id.clone(),
                scope,
                issued_at,
                expires_at: issued_at.saturating_add(self.token_expiry_millis),
            };
            let token = self.sign(&payload);

            // A string revoked before it was ever minted here still occupies the slot.
            if !state.revoked.contains(&token) && !state.issued.contains_key(&token) {
                break (payload, token);
            }
        };

        let mut credential = Credential::from_payload(payload, token.clone());
        credential.metadata = metadata;
        state.issued.insert(token, credential.clone());

        debug!(
            agent_id = %credential.agent_id,
            scope = %credential.scope,
            expires_at = credential.expires_at,
            token = %fingerprint(&credential.token),
            "issued agent token"
        );

        credential
    }

    /// Pick the issuance timestamp for a new token at `scope`.
    ///
    /// Uses `now` when free, otherwise the latest unused earlier millisecond
    /// whose window still covers `now`. Only when that whole window is used
    /// does issuance move past `now`.
    fn next_free_slot(&self, state: &AuthorityState, scope: Scope, now: i64) -> i64 {
        let earliest = now.saturating_sub(self.token_expiry_millis);

        let mut candidate = now;
        while candidate >= earliest && state.minted.contains(&(scope, candidate)) {
            candidate -= 1;
        }
        if candidate >= earliest {
            return candidate;
        }

        let mut candidate = now.saturating_add(1);
        while state.minted.contains(&(scope, candidate)) {
            candidate += 1;
        }
        candidate
    }

    fn sign(&self, payload: &TokenPayload) -> String {
        let encoded = payload.encode();
        let signature = self.signer.sign(&encoded);
        format!("{encoded}.{signature}")
    }

    /// Validate a presented bearer string.
    ///
    /// Every rejection yields `None`; use [`Self::check`] to learn why.
    pub fn validate(&self, bearer: &str) -> Option<Credential> {
        match self.check(bearer) {
            Ok(credential) => Some(credential),
            Err(e) => {
                debug!(
                    reason = e.code(),
                    token = %fingerprint(bearer),
                    "rejected agent token"
                );
                None
            }
        }
    }

    /// Validate a bearer string, reporting the rejection reason.
    pub fn check(&self, bearer: &str) -> Result<Credential, TokenError> {
        let now = self.clock.now_millis();

        {
            let state = self.lock_state();

            if state.revoked.contains(bearer) {
                return Err(TokenError::Revoked);
            }

            if let Some(credential) = state.issued.get(bearer) {
                credential.payload().check_window(now)?;
                return Ok(credential.clone());
            }
        }

        let (payload, signature) = split_bearer(bearer)?;
        self.signer.verify(payload, signature)?;
        let fields = TokenPayload::decode(payload)?;
        fields.check_window(now)?;

        Ok(Credential::from_payload(fields, bearer.to_string()))
    }

    /// Validate a bearer string and require an exact scope and an allowed subject.
    pub fn authorize(&self, bearer: &str, required: Scope) -> Result<Credential, TokenError> {
        let credential = self.check(bearer)?;

        if credential.scope != required {
            return Err(TokenError::ScopeMismatch {
                required,
                actual: credential.scope,
            });
        }

        if !self.is_agent_allowed(&credential.agent_id) {
            return Err(TokenError::AgentNotAllowed {
                agent_id: credential.agent_id,
            });
        }

        Ok(credential)
    }

    /// Revoke a bearer string. Idempotent; unknown strings are revoked too.
    pub fn revoke(&self, bearer: &str) -> bool {
        let mut state = self.lock_state();
        state.issued.remove(bearer);
        state.revoked.insert(bearer.to_string());

        debug!(token = %fingerprint(bearer), "revoked agent token");
        true
    }

    pub fn is_revoked(&self, bearer: &str) -> bool {
        self.lock_state().revoked.contains(bearer)
    }

    /// Check an agent ID against the allow-list.
    pub fn is_agent_allowed(&self, agent_id: &str) -> bool {
        self.allowed_agents.is_empty()
            || self.allowed_agents.contains(agent_id)
            || self.allowed_agents.contains(WILDCARD_AGENT)
    }

    /// Evict expired entries from the issued cache. Revocations are kept.
    ///
    /// Returns the number of evicted tokens.
    pub fn cleanup_expired_tokens(&self) -> usize {
        let now = self.clock.now_millis();
        let mut state = self.lock_state();

        let before = state.issued.len();
        state.issued.retain(|_, credential| credential.expires_at >= now);
        let evicted = before - state.issued.len();

        // Slots older than one lifetime can no longer be chosen by `next_free_slot`.
        let expiry = self.token_expiry_millis;
        state
            .minted
            .retain(|(_, issued_at)| issued_at.saturating_add(expiry) >= now);

        if evicted > 0 {
            debug!(evicted, remaining = state.issued.len(), "swept expired agent tokens");
        }
        evicted
    }

    pub fn stats(&self) -> AuthorityStats {
        let state = self.lock_state();
        AuthorityStats {
            issued: state.issued.len(),
            revoked: state.revoked.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn authority(clock: &ManualClock) -> TokenAuthority {
        TokenAuthority::new(
            AgentIdentity::new("agent-1", "Worker"),
            AuthorityOptions::default().with_secret(SecretKey::from_string("shared").unwrap()),
        )
        .unwrap()
        .with_clock(Arc::new(clock.clone()))
    }

    #[test]
    fn test_issue_and_validate() {
        let clock = ManualClock::new(10_000);
        let authority = authority(&clock);

        let credential = authority.issue(Scope::Write);
        assert_eq!(credential.agent_id, "agent-1");
        assert_eq!(credential.issued_at, 10_000);
        assert_eq!(credential.expires_at, 10_000 + 3_600_000);

        let validated = authority.validate(&credential.token).unwrap();
        assert_eq!(validated, credential);
    }

    #[test]
    fn test_same_millisecond_issues_are_distinct() {
        let clock = ManualClock::new(10_000);
        let authority = authority(&clock);

        let a = authority.issue(Scope::Read);
        let b = authority.issue(Scope::Read);
        assert_ne!(a.token, b.token);
        assert_eq!(authority.stats().issued, 2);
        assert!(authority.validate(&a.token).is_some());
        assert!(authority.validate(&b.token).is_some());

        for credential in [&a, &b] {
            assert_eq!(credential.expires_at - credential.issued_at, 3_600_000);
            assert!(credential.issued_at <= 10_000);
        }
    }

    #[test]
    fn test_frozen_millisecond_fills_whole_window() {
        let clock = ManualClock::new(0);
        let authority = TokenAuthority::new(
            AgentIdentity::new("agent-1", "Worker"),
            AuthorityOptions::default()
                .with_secret(SecretKey::from_string("shared").unwrap())
                .with_expiry_seconds(1),
        )
        .unwrap()
        .with_clock(Arc::new(clock.clone()));

        let credentials: Vec<Credential> =
            (0..1_001).map(|_| authority.issue(Scope::Read)).collect();

        let distinct: HashSet<&str> = credentials.iter().map(|c| c.token.as_str()).collect();
        assert_eq!(distinct.len(), 1_001);
        assert_eq!(authority.stats().issued, 1_001);
        for credential in &credentials {
            assert_eq!(credential.expires_at - credential.issued_at, 1_000);
            assert!(authority.validate(&credential.token).is_some());
        }

        // Window exhausted: the next token is distinct and becomes valid shortly.
        let overflow = authority.issue(Scope::Read);
        assert!(!distinct.contains(overflow.token.as_str()));
        assert_eq!(overflow.issued_at, 1);
        assert_eq!(overflow.expires_at - overflow.issued_at, 1_000);

        // Other scopes have their own slots.
        assert_eq!(authority.issue(Scope::Write).issued_at, 0);
    }

    #[test]
    fn test_slot_taken_by_pre_revoked_string_is_skipped() {
        let clock = ManualClock::new(500);
        let minter = authority(&clock);
        let other = authority(&clock);

        // Same secret and agent: `other` mints the exact string `minter` would.
        let predicted = other.issue(Scope::Admin);
        minter.revoke(&predicted.token);

        let credential = minter.issue(Scope::Admin);
        assert_ne!(credential.token, predicted.token);
        assert_eq!(credential.issued_at, 499);
        assert!(minter.validate(&credential.token).is_some());
    }

    #[test]
    fn test_check_reports_reason() {
        let clock = ManualClock::new(0);
        let authority = authority(&clock);

        assert!(matches!(authority.check("nodot"), Err(TokenError::Malformed(_))));

        let credential = authority.issue(Scope::Read);
        authority.revoke(&credential.token);
        assert!(matches!(authority.check(&credential.token), Err(TokenError::Revoked)));
    }

    #[test]
    fn test_metadata_is_kept_locally_only() {
        let clock = ManualClock::new(0);
        let local = authority(&clock);

        let mut metadata = serde_json::Map::new();
        metadata.insert("task".to_string(), serde_json::json!("t-42"));
        let credential = local.issue_with_metadata(Scope::Read, metadata.clone());

        assert_eq!(
            local.validate(&credential.token).unwrap().metadata,
            Some(metadata)
        );

        let other = authority(&clock);
        assert!(other.validate(&credential.token).unwrap().metadata.is_none());
    }

    #[test]
    fn test_authorize_exact_scope_and_allow_list() {
        let clock = ManualClock::new(0);
        let authority = TokenAuthority::new(
            AgentIdentity::new("agent-1", "Worker"),
            AuthorityOptions::default().allow_agent("agent-2"),
        )
        .unwrap()
        .with_clock(Arc::new(clock.clone()));

        let admin = authority.issue(Scope::Admin);
        assert!(matches!(
            authority.authorize(&admin.token, Scope::Read),
            Err(TokenError::ScopeMismatch { .. })
        ));
        assert!(matches!(
            authority.authorize(&admin.token, Scope::Admin),
            Err(TokenError::AgentNotAllowed { .. })
        ));
        // validate never consults the allow-list
        assert!(authority.validate(&admin.token).is_some());
    }

    #[test]
    fn test_zero_expiry_rejected() {
        let result = TokenAuthority::new(
            AgentIdentity::new("agent-1", "Worker"),
            AuthorityOptions::default().with_expiry_seconds(0),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_from_config() {
        let config = AgentLinkConfig::from_yaml(
            r#"
identity:
  id: agent-9
  name: Nine
auth:
  token_expiry_seconds: 60
  allowed_agents: ["agent-3"]
"#,
        )
        .unwrap();

        let clock = ManualClock::new(0);
        let authority = TokenAuthority::from_config(&config)
            .unwrap()
            .with_clock(Arc::new(clock.clone()));

        let credential = authority.issue(Scope::Read);
        assert_eq!(credential.agent_id, "agent-9");
        assert_eq!(credential.expires_at, 60_000);
        assert!(authority.is_agent_allowed("agent-3"));
        assert!(!authority.is_agent_allowed("agent-4"));
    }
}
