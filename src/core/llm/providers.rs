use tracing::debug;

use crate::config::{LlmConfig, Provider};
use crate::credentials::CredentialGuard;
use crate::error::{CoverMeError, Result};
use super::anthropic::{self, AnthropicClient};
use super::client::{ClientSettings, CoverLetterClient};
use super::openai::{self, OpenAiClient};

/// Factory function to create the client for the configured provider.
///
/// This is the only place a provider value is turned into a backend; the
/// match over [`Provider`] stays exhaustive.
pub fn create_client(
    config: &LlmConfig,
    credentials: &CredentialGuard,
) -> Result<Box<dyn CoverLetterClient>> {
    let provider: Provider = config
        .provider
        .as_deref()
        .ok_or_else(|| CoverMeError::Config("LLM provider not specified".to_string()))?
        .parse()?;

    let api_key = credentials.require(provider)?;

    let client: Box<dyn CoverLetterClient> = match provider {
        Provider::OpenAi => Box::new(OpenAiClient::new(
            ClientSettings::from_config(config, provider, openai::DEFAULT_BASE_URL),
            api_key,
        )),
        Provider::Anthropic => Box::new(AnthropicClient::new(
            ClientSettings::from_config(config, provider, anthropic::DEFAULT_BASE_URL),
            api_key,
        )),
    };

    debug!("Created {} client", provider.display_name());
    Ok(client)
}
