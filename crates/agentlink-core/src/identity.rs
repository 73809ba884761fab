//! Agent identity.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// The role an agent process plays in a deployment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    #[default]
    Agent,
    Coordinator,
    Monitor,
}

impl AgentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Coordinator => "coordinator",
            Self::Monitor => "monitor",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable description of an agent process.
///
/// A token authority is bound to exactly one identity and only ever mints
/// credentials whose subject is `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentIdentity {
    /// Stable unique identifier (e.g., "agent-planner-01").
    pub id: String,

    /// Human-readable name.
    pub name: String,

    /// Role of the agent in the deployment.
    #[serde(rename = "type", default)]
    pub kind: AgentKind,

    /// Agent software version.
    #[serde(default = "default_version")]
    pub version: String,

    /// Advertised capabilities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<BTreeSet<String>>,
}

impl AgentIdentity {
    /// Create an identity of kind `agent` with no capabilities.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: AgentKind::Agent,
            version: default_version(),
            capabilities: None,
        }
    }

    pub fn with_kind(mut self, kind: AgentKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Add a capability to the advertised set.
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities
            .get_or_insert_with(BTreeSet::new)
            .insert(capability.into());
        self
    }

    /// Check if the agent advertises a capability.
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities
            .as_ref()
            .is_some_and(|caps| caps.contains(capability))
    }
}

fn default_version() -> String {
    "0.1.0".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_builder() {
        let identity = AgentIdentity::new("agent-1", "Planner")
            .with_kind(AgentKind::Coordinator)
            .with_version("2.0.0")
            .with_capability("plan")
            .with_capability("delegate");

        assert_eq!(identity.kind, AgentKind::Coordinator);
        assert_eq!(identity.version, "2.0.0");
        assert!(identity.has_capability("plan"));
        assert!(!identity.has_capability("execute"));
    }

    #[test]
    fn test_identity_yaml_uses_type_key() {
        let identity: AgentIdentity = serde_yaml::from_str(
            r#"
id: monitor-7
name: Watcher
type: monitor
"#,
        )
        .unwrap();

        assert_eq!(identity.kind, AgentKind::Monitor);
        assert_eq!(identity.version, "0.1.0");
        assert!(identity.capabilities.is_none());
    }
}
