//! Token management commands.
//!
//! `agentlink token issue` - Issue a token for an agent.
//! `agentlink token verify` - Verify a token is valid.
//! `agentlink token inspect` - Inspect a token's payload.

use agentlink_auth::{
    AgentIdentity, AuthorityOptions, Credential, Scope, SecretKey, TokenAuthority,
    inspect_unverified,
};
use agentlink_core::{AgentLinkConfig, AuthConfig};
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

/// Identity used when verifying tokens from the command line.
const CLI_AGENT_ID: &str = "agentlink-cli";

/// Resolve a secret from either a file path or a literal string.
///
/// The secret string can be:
/// - A path to a file containing the secret
/// - The secret itself (e.g., from the AGENTLINK_SECRET_KEY env var)
fn resolve_secret(secret: Option<String>) -> anyhow::Result<SecretKey> {
    let secret_str = secret.context(
        "Secret not provided. \
         Either pass --secret <path|value> or set AGENTLINK_SECRET_KEY env var",
    )?;

    // If it looks like a file path and the file exists, load from file
    let path = Path::new(&secret_str);
    if path.exists() {
        return SecretKey::load_from_file(path)
            .with_context(|| format!("Failed to load secret from file: {}", path.display()));
    }

    SecretKey::from_string(secret_str.trim()).context("Failed to parse secret")
}

/// Read a token from a file if the argument is an existing path.
fn read_token(token: String) -> anyhow::Result<String> {
    if Path::new(&token).exists() {
        Ok(fs::read_to_string(&token)?.trim().to_string())
    } else {
        Ok(token.trim().to_string())
    }
}

/// Parse a duration string like "24h", "7d", "30m" into chrono::Duration.
fn parse_duration(s: &str) -> anyhow::Result<chrono::Duration> {
    let s = s.trim().to_lowercase();

    if let Some(hours) = s.strip_suffix('h') {
        let h: i64 = hours.parse()?;
        return Ok(chrono::Duration::hours(h));
    }
    if let Some(days) = s.strip_suffix('d') {
        let d: i64 = days.parse()?;
        return Ok(chrono::Duration::days(d));
    }
    if let Some(minutes) = s.strip_suffix('m') {
        let m: i64 = minutes.parse()?;
        return Ok(chrono::Duration::minutes(m));
    }
    if let Some(seconds) = s.strip_suffix('s') {
        let sec: i64 = seconds.parse()?;
        return Ok(chrono::Duration::seconds(sec));
    }

    // Try parsing as seconds if no suffix
    let sec: i64 = s.parse()?;
    Ok(chrono::Duration::seconds(sec))
}

fn parse_scope(scope: &str) -> anyhow::Result<Scope> {
    Ok(scope.parse::<Scope>()?)
}

fn format_millis(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| millis.to_string())
}

fn print_details(credential: &Credential) {
    println!("  Agent: {}", credential.agent_id);
    println!("  Scope: {}", credential.scope);
    println!("  Issued: {}", format_millis(credential.issued_at));
    println!("  Expires: {}", format_millis(credential.expires_at));
}

/// Build an authority for issuing, from a config file or from flags.
fn issuing_authority(
    config: Option<PathBuf>,
    agent_id: Option<String>,
    secret: Option<String>,
    expires: Option<String>,
) -> anyhow::Result<TokenAuthority> {
    let (identity, auth) = match config {
        Some(path) => {
            let config = AgentLinkConfig::load_with_context(&path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?;
            (config.identity, config.auth)
        }
        None => {
            let agent_id = agent_id.context("Either --config or --agent-id is required")?;
            (AgentIdentity::new(agent_id.clone(), agent_id), AuthConfig::default())
        }
    };

    let secret_key = match auth.resolve_secret_key()? {
        Some(secret) => SecretKey::from_string(secret)?,
        None => resolve_secret(secret)?,
    };

    let token_expiry_seconds = match expires {
        Some(e) => {
            let seconds = parse_duration(&e)?.num_seconds();
            anyhow::ensure!(seconds > 0, "--expires must be a positive duration");
            seconds as u64
        }
        None => auth.token_expiry_seconds,
    };

    Ok(TokenAuthority::new(
        identity,
        AuthorityOptions {
            secret_key: Some(secret_key),
            token_expiry_seconds,
            allowed_agents: auth.allowed_agents,
        },
    )?)
}

/// Issue a new token.
pub fn issue(
    config: Option<PathBuf>,
    agent_id: Option<String>,
    secret: Option<String>,
    scope: &str,
    expires: Option<String>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let scope = parse_scope(scope)?;
    let authority = issuing_authority(config, agent_id, secret, expires)?;
    let credential = authority.issue(scope);
    tracing::info!(
        agent_id = %credential.agent_id,
        scope = %credential.scope,
        "issued agent token"
    );

    if let Some(output_path) = output {
        fs::write(&output_path, &credential.token)?;
        println!("✔ Token written to: {}", output_path.display());
        print_details(&credential);
    } else {
        println!("{}", credential.token);
    }

    Ok(())
}

/// Verify a token's signature and validity window.
pub fn verify(secret: Option<String>, scope: Option<&str>, token: String) -> anyhow::Result<()> {
    let secret_key = resolve_secret(secret)?;
    let authority = TokenAuthority::new(
        AgentIdentity::new(CLI_AGENT_ID, CLI_AGENT_ID),
        AuthorityOptions::default().with_secret(secret_key),
    )?;

    let token_str = read_token(token)?;

    let result = match scope {
        Some(required) => authority.authorize(&token_str, parse_scope(required)?),
        None => authority.check(&token_str),
    };

    match result {
        Ok(credential) => {
            println!("✔ Token is valid");
            println!();
            println!("Token Details:");
            print_details(&credential);
            Ok(())
        }
        Err(e) => {
            println!("✖ Token verification failed: {}", e);
            anyhow::bail!("token rejected ({})", e.code())
        }
    }
}

/// Inspect a token without verification.
pub fn inspect(token: String) -> anyhow::Result<()> {
    let token_str = read_token(token)?;
    let payload = inspect_unverified(&token_str)?;

    println!("Token Information (unverified):");
    println!("  Agent: {}", payload.agent_id);
    println!("  Scope: {}", payload.scope);
    println!("  Issued: {}", format_millis(payload.issued_at));
    println!("  Expires: {}", format_millis(payload.expires_at));
    println!();
    println!("{}", serde_json::to_string_pretty(&payload)?);

    Ok(())
}
