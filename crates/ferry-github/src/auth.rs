//! Authentication handling for GitHub API.

use std::path::PathBuf;
use std::process::Command;

use secrecy::SecretString;

use crate::error::{Error, Result};

/// Authentication method for GitHub API.
#[derive(Debug, Clone)]
pub enum Auth {
    /// Use token from gh CLI.
    GhCli,

    /// Use token from environment variable.
    EnvVar(String),

    /// Read the token from a file, as mounted secrets are.
    File(PathBuf),

    /// Use a specific token.
    Token(SecretString),
}

impl Auth {
    /// Create auth from the first available method.
    ///
    /// Tries in order: `token_path`, `GITHUB_TOKEN` env var, gh CLI.
    #[must_use]
    pub fn auto(token_path: Option<PathBuf>) -> Self {
        if let Some(path) = token_path {
            Self::File(path)
        } else if std::env::var("GITHUB_TOKEN").is_ok() {
            Self::EnvVar("GITHUB_TOKEN".into())
        } else {
            Self::GhCli
        }
    }

    /// Resolve the authentication to a token.
    ///
    /// # Errors
    /// Returns error if token cannot be obtained.
    pub fn resolve(&self) -> Result<SecretString> {
        match self {
            Self::GhCli => get_gh_token(),
            Self::EnvVar(var) => std::env::var(var)
                .map(SecretString::from)
                .map_err(|_| Error::NoToken),
            Self::File(path) => non_empty(&std::fs::read_to_string(path)?),
            Self::Token(t) => Ok(t.clone()),
        }
    }
}

impl Default for Auth {
    fn default() -> Self {
        Self::auto(None)
    }
}

/// Get GitHub token from gh CLI.
fn get_gh_token() -> Result<SecretString> {
    let output = Command::new("gh").args(["auth", "token"]).output()?;

    if !output.status.success() {
        return Err(Error::NoToken);
    }

    non_empty(&String::from_utf8_lossy(&output.stdout))
}

fn non_empty(raw: &str) -> Result<SecretString> {
    let token = raw.trim();
    if token.is_empty() {
        return Err(Error::NoToken);
    }
    Ok(SecretString::from(token.to_string()))
}
