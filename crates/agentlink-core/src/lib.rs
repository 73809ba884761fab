//! # agentlink-core
//!
//! Types shared by every AgentLink crate: the identity an agent process runs
//! as, and the YAML configuration (`agentlink.yaml`) that binds an identity to
//! its token settings.

// Configuration types shared across all AgentLink crates
pub mod config;
pub mod identity;

pub use config::{AgentLinkConfig, AuthConfig, ConfigError};
pub use identity::{AgentIdentity, AgentKind};
