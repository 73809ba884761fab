//! Secret management commands.
//!
//! `agentlink secret generate` - Generate a new shared signing secret.

use agentlink_auth::SecretKey;
use std::fs;
use std::path::PathBuf;

/// Generate a new signing secret.
pub fn generate(output: Option<PathBuf>) -> anyhow::Result<()> {
    let secret = SecretKey::generate();

    if let Some(output_path) = output {
        // Create parent directory if it doesn't exist
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        secret.save_to_file(&output_path)?;

        println!("✔ Generated signing secret: {}", output_path.display());
        println!();
        println!("⚠️  Keep this secret private! Every agent holding it can mint tokens.");
        println!();
        println!("Set as environment variable:");
        println!(
            "  export AGENTLINK_SECRET_KEY=$(cat {})",
            output_path.display()
        );
    } else {
        println!("{}", secret.expose());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_generate_secret_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("secrets").join("agent.key");
        generate(Some(path.clone())).unwrap();

        let secret = fs::read_to_string(&path).unwrap();
        // 32 random bytes, unpadded base64url
        assert_eq!(secret.len(), 43);
        assert!(SecretKey::load_from_file(&path).is_ok());
    }
}
