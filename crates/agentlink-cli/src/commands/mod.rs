//! CLI command implementations for AgentLink.

pub mod secret;
pub mod token;
