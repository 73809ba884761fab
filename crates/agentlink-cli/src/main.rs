use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "agentlink", version, about = "AgentLink CLI")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Shared signing secret management
    Secret {
        #[command(subcommand)]
        cmd: SecretCommand,
    },

    /// Agent token management (issue/verify/inspect)
    Token {
        #[command(subcommand)]
        cmd: TokenCommand,
    },
}

#[derive(Subcommand, Debug)]
enum SecretCommand {
    /// Generate a new random signing secret
    Generate {
        /// File to write the secret to. Prints to stdout when omitted.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum TokenCommand {
    /// Issue a token for an agent
    Issue {
        /// agentlink.yaml providing identity, secret and expiry
        #[arg(long)]
        config: Option<PathBuf>,

        /// Agent ID to issue the token for (without --config)
        #[arg(long = "agent-id")]
        agent_id: Option<String>,

        /// Secret or path to a secret file (used when the config resolves none)
        #[arg(long, env = "AGENTLINK_SECRET_KEY", hide_env_values = true)]
        secret: Option<String>,

        /// Token scope: read, write or admin
        #[arg(long, default_value = "read")]
        scope: String,

        /// Token lifetime, e.g. "15m", "1h", "7d"
        #[arg(long)]
        expires: Option<String>,

        /// File to write the token to. Prints to stdout when omitted.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Verify a token's signature and validity window
    Verify {
        /// Secret or path to a secret file
        #[arg(long, env = "AGENTLINK_SECRET_KEY", hide_env_values = true)]
        secret: Option<String>,

        /// Require this exact scope
        #[arg(long)]
        scope: Option<String>,

        /// Token string or path to a token file
        token: String,
    },

    /// Decode a token without verifying it
    Inspect {
        /// Token string or path to a token file
        token: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Secret { cmd } => match cmd {
            SecretCommand::Generate { output } => commands::secret::generate(output)?,
        },

        Command::Token { cmd } => match cmd {
            TokenCommand::Issue {
                config,
                agent_id,
                secret,
                scope,
                expires,
                output,
            } => commands::token::issue(config, agent_id, secret, &scope, expires, output)?,
            TokenCommand::Verify {
                secret,
                scope,
                token,
            } => commands::token::verify(secret, scope.as_deref(), token)?,
            TokenCommand::Inspect { token } => commands::token::inspect(token)?,
        },
    }

    Ok(())
}
