//! Token authority configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Wildcard entry in `allowed_agents` that admits every agent.
pub const WILDCARD_AGENT: &str = "*";

/// Configuration for agent token issuance and verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Environment variable containing the shared signing secret.
    #[serde(default)]
    pub secret_key_env: Option<String>,

    /// Path to a file containing the shared signing secret.
    #[serde(default)]
    pub secret_key_file: Option<PathBuf>,

    /// Lifetime of newly issued tokens, in seconds.
    #[serde(default = "default_token_expiry_seconds")]
    pub token_expiry_seconds: u64,

    /// Agent IDs admitted by the allow-list. Empty means no restriction.
    #[serde(default)]
    pub allowed_agents: BTreeSet<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key_env: None,
            secret_key_file: None,
            token_expiry_seconds: default_token_expiry_seconds(),
            allowed_agents: BTreeSet::new(),
        }
    }
}

impl AuthConfig {
    /// Resolve the signing secret from environment or file.
    ///
    /// Returns `Ok(None)` when neither source yields a value; callers then fall
    /// back to a freshly generated secret.
    pub fn resolve_secret_key(&self) -> Result<Option<String>, std::io::Error> {
        // Try environment variable first
        if let Some(env_var) = &self.secret_key_env {
            if let Ok(secret) = std::env::var(env_var) {
                if !secret.trim().is_empty() {
                    return Ok(Some(secret.trim().to_string()));
                }
            }
        }

        // Try file path
        if let Some(path) = &self.secret_key_file {
            if path.exists() {
                let secret = std::fs::read_to_string(path)?;
                return Ok(Some(secret.trim().to_string()));
            }
        }

        Ok(None)
    }
}

fn default_token_expiry_seconds() -> u64 {
    3600
}
