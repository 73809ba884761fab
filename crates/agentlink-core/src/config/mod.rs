//! Configuration types for AgentLink.
//!
//! Configuration is loaded from a single YAML file (`agentlink.yaml`) that
//! declares the identity the process runs as and how its tokens are signed.
//!
//! ```yaml
//! identity:
//!   id: agent-planner-01
//!   name: Planner
//!   type: coordinator
//! auth:
//!   secret_key_env: AGENTLINK_SECRET_KEY
//!   secret_key_file: secrets/agentlink.key
//!   token_expiry_seconds: 900
//!   allowed_agents: ["agent-worker-01", "agent-worker-02"]
//! ```

pub mod auth;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use auth::{AuthConfig, WILDCARD_AGENT};

use crate::identity::AgentIdentity;

/// Complete AgentLink configuration loaded from a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentLinkConfig {
    /// Project name.
    #[serde(default)]
    pub project: Option<String>,

    /// Identity this process authenticates as.
    pub identity: AgentIdentity,

    /// Token configuration.
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AgentLinkConfig {
    /// Create a configuration for an identity with default token settings.
    pub fn new(identity: AgentIdentity) -> Self {
        Self {
            project: None,
            identity,
            auth: AuthConfig::default(),
        }
    }

    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration and resolve relative paths against the file's directory.
    pub fn load_with_context(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = Self::from_file(path)?;

        let base_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        if let Some(secret_file) = &config.auth.secret_key_file {
            if !secret_file.is_absolute() {
                config.auth.secret_key_file = Some(base_dir.join(secret_file));
            }
        }

        Ok(config)
    }

    /// Check invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identity.id.trim().is_empty() {
            return Err(ConfigError::Config("identity.id must not be empty".to_string()));
        }
        if self.auth.token_expiry_seconds == 0 {
            return Err(ConfigError::Config(
                "auth.token_expiry_seconds must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::AgentKind;

    #[test]
    fn test_parse_full_config() {
        let config = AgentLinkConfig::from_yaml(
            r#"
project: swarm
identity:
  id: agent-planner-01
  name: Planner
  type: coordinator
  capabilities: [plan]
auth:
  secret_key_env: PLANNER_SECRET
  token_expiry_seconds: 900
  allowed_agents: ["agent-worker-01", "*"]
"#,
        )
        .unwrap();

        assert_eq!(config.project.as_deref(), Some("swarm"));
        assert_eq!(config.identity.kind, AgentKind::Coordinator);
        assert_eq!(config.auth.token_expiry_seconds, 900);
        assert!(config.auth.allowed_agents.contains("agent-worker-01"));
        assert!(config.auth.allowed_agents.contains(WILDCARD_AGENT));
    }

    #[test]
    fn test_auth_section_defaults() {
        let config = AgentLinkConfig::from_yaml(
            r#"
identity:
  id: a1
  name: Worker
"#,
        )
        .unwrap();

        assert_eq!(config.auth.token_expiry_seconds, 3600);
        assert!(config.auth.secret_key_env.is_none());
    }

    #[test]
    fn test_rejects_zero_expiry() {
        let err = AgentLinkConfig::from_yaml(
            r#"
identity:
  id: a1
  name: Worker
auth:
  token_expiry_seconds: 0
"#,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::Config(_)));
    }

    #[test]
    fn test_rejects_empty_identity() {
        let err = AgentLinkConfig::from_yaml(
            r#"
identity:
  id: "  "
  name: Nobody
"#,
        )
        .unwrap_err();

        assert!(err.to_string().contains("identity.id"));
    }

    #[test]
    fn test_load_with_context_resolves_secret_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("agentlink.yaml");
        fs::write(
            &config_path,
            r#"
identity:
  id: a1
  name: Worker
auth:
  secret_key_file: secrets/agent.key
"#,
        )
        .unwrap();

        let config = AgentLinkConfig::load_with_context(&config_path).unwrap();
        assert_eq!(
            config.auth.secret_key_file,
            Some(dir.path().join("secrets/agent.key"))
        );
    }
}
