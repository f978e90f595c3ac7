//! API key lookup and presence checks.
//!
//! Keys come only from the process environment (`OPENAI_API_KEY`,
//! `ANTHROPIC_API_KEY`). Environment access is abstracted behind
//! [`EnvLookup`] so configuration and client construction can be exercised
//! without mutating the real environment.

use std::collections::HashMap;
use std::sync::Arc;

use secrecy::SecretString;

use crate::config::Provider;
use crate::error::{CoverMeError, Result};

/// Read-only view of environment variables
pub trait EnvLookup: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvLookup for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

pub type SharedEnv = Arc<dyn EnvLookup>;

/// Validates that the credential for a provider is available
#[derive(Clone)]
pub struct CredentialGuard {
    env: SharedEnv,
}

impl CredentialGuard {
    pub fn new(env: SharedEnv) -> Self {
        Self { env }
    }

    /// The key for `provider`, if set to something other than whitespace
    pub fn lookup(&self, provider: Provider) -> Option<SecretString> {
        self.env
            .var(provider.api_key_var())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(SecretString::from)
    }

    pub fn is_present(&self, provider: Provider) -> bool {
        self.lookup(provider).is_some()
    }

    /// Return the key or a configuration error explaining how to set it
    pub fn require(&self, provider: Provider) -> Result<SecretString> {
        self.lookup(provider).ok_or_else(|| {
            CoverMeError::Config(format!(
                "{} API key not found.\n\n{}",
                provider.display_name(),
                remediation(provider)
            ))
        })
    }
}

/// Shell instructions for exporting the provider's key
pub fn remediation(provider: Provider) -> String {
    let var = provider.api_key_var();
    format!(
        "To fix this, set your {name} API key as an environment variable:\n\n\
         \x20 # For bash/zsh (add to ~/.bashrc or ~/.zshrc):\n\
         \x20 export {var}='your-api-key-here'\n\n\
         \x20 # For fish shell (add to ~/.config/fish/config.fish):\n\
         \x20 set -x {var} 'your-api-key-here'\n\n\
         \x20 # Or put it in a .env file in the directory you run cover-me from:\n\
         \x20 {var}=your-api-key-here\n\n\
         Get your API key from: {url}",
        name = provider.display_name(),
        var = var,
        url = provider.key_url(),
    )
}
