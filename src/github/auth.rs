use anyhow::{Result, bail};
use std::fmt;
use tracing::debug;

/// Bearer token presented on every request.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Resolve the GitHub token from the process environment:
/// 1. `GITHUB_TOKEN`
/// 2. `GH_TOKEN`
pub fn resolve_token() -> Result<Credential> {
    resolve_token_with(|name| std::env::var(name).ok())
}

/// Same as [`resolve_token`], reading variables through `lookup`.
pub fn resolve_token_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Credential> {
    for var in ["GITHUB_TOKEN", "GH_TOKEN"] {
        if let Some(token) = lookup(var) {
            let token = token.trim();
            if !token.is_empty() {
                debug!(var, "Token resolved from environment");
                return Ok(Credential::new(token));
            }
        }
    }

    bail!(
        "Could not resolve GitHub token. Please either:\n\
         - Set the GITHUB_TOKEN environment variable\n\
         - Set the GH_TOKEN environment variable"
    )
}
