use async_trait::async_trait;
use serde::Deserialize;

use crate::config::{LlmConfig, Provider};
use crate::error::Result;

pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Prompt and token budget for the connectivity probe
pub const PROBE_PROMPT: &str = "Test";
pub const PROBE_MAX_TOKENS: u32 = 5;

const MASK_PLACEHOLDER: &str = "****";

/// The three texts a cover letter is generated from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub professional_info: String,
    pub job_description: String,
}

impl GenerationRequest {
    pub fn new(
        system_prompt: impl Into<String>,
        professional_info: impl Into<String>,
        job_description: impl Into<String>,
    ) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            professional_info: professional_info.into(),
            job_description: job_description.into(),
        }
    }

    /// User turn shared by every provider
    pub fn user_message(&self) -> String {
        format!(
            "Please generate a cover letter based on the following information:\n\n\
             **Job Description:**\n{}\n\n\
             **Professional Information:**\n{}\n\n\
             Generate a professional cover letter that highlights the most relevant \
             experience and skills for this position.\n",
            self.job_description, self.professional_info
        )
    }
}

/// Diagnostic summary of a client; never carries the raw key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInfo {
    pub provider: Provider,
    pub model: String,
    pub masked_api_key: String,
}

/// Resolved request parameters for one backend
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub base_url: String,
}

impl ClientSettings {
    pub fn from_config(config: &LlmConfig, provider: Provider, default_base_url: &str) -> Self {
        Self {
            model: config
                .model
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| provider.default_model().to_string()),
            max_tokens: config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: config.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| default_base_url.to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Uniform capability over LLM backends
#[async_trait]
pub trait CoverLetterClient: Send + Sync {
    /// Generate a letter and return its trimmed text
    async fn generate_cover_letter(&self, request: &GenerationRequest) -> Result<String>;

    /// Minimal request against the backend; any failure is `false`
    async fn validate_api_key(&self) -> bool;

    fn provider_info(&self) -> ProviderInfo;
}

/// Show only the first and last four characters of a key
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() < 8 {
        return MASK_PLACEHOLDER.to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Turn a non-success response into a readable message
pub(crate) async fn describe_failure(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => format!("{} ({})", envelope.error.message, status),
        Err(_) if body.trim().is_empty() => format!("request failed with status {}", status),
        Err(_) => format!("request failed with status {}: {}", status, body.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_short_keys_use_placeholder() {
        assert_eq!(mask_api_key(""), "****");
        assert_eq!(mask_api_key("abc"), "****");
        assert_eq!(mask_api_key("1234567"), "****");
    }

    #[test]
    fn test_mask_shows_boundaries() {
        assert_eq!(mask_api_key("sk-abcdef0123453f9b"), "sk-a...3f9b");
        assert_eq!(mask_api_key("12345678"), "1234...5678");
    }

    #[test]
    fn test_mask_never_contains_full_key() {
        for key in ["12345678", "sk-proj-0123456789abcdef", "ant-ÄÖÜ-key-with-unicode"] {
            let masked = mask_api_key(key);
            assert!(!masked.contains(key));
            assert_eq!(masked.chars().count(), 11);
        }
    }

    #[test]
    fn test_user_message_embeds_both_inputs() {
        let request = GenerationRequest::new("Be concise", "Rust developer", "Senior backend engineer");
        let message = request.user_message();
        let job_at = message.find("Senior backend engineer").unwrap();
        let info_at = message.find("Rust developer").unwrap();
        assert!(job_at < info_at);
        assert!(!message.contains("Be concise"));
    }

    #[test]
    fn test_settings_fall_back_to_defaults() {
        let settings = ClientSettings::from_config(
            &LlmConfig::default(),
            Provider::Anthropic,
            "https://api.anthropic.com/v1/",
        );
        assert_eq!(settings.model, "claude-3-5-sonnet-20241022");
        assert_eq!(settings.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(settings.endpoint("/messages"), "https://api.anthropic.com/v1/messages");
    }
}
