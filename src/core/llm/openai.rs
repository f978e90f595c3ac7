use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::Provider;
use crate::error::{CoverMeError, Result};
use super::client::{
    describe_failure, mask_api_key, ClientSettings, CoverLetterClient, GenerationRequest,
    ProviderInfo, PROBE_MAX_TOKENS, PROBE_PROMPT,
};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat-completions backend: system prompt travels as the first message
pub struct OpenAiClient {
    settings: ClientSettings,
    api_key: SecretString,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(settings: ClientSettings, api_key: SecretString) -> Self {
        Self {
            settings,
            api_key,
            http: reqwest::Client::new(),
        }
    }

    async fn send(&self, payload: &Value) -> Result<ChatCompletion> {
        let response = self
            .http
            .post(self.settings.endpoint("chat/completions"))
            .bearer_auth(self.api_key.expose_secret())
            .json(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CoverMeError::Api(describe_failure(response).await));
        }

        Ok(response.json().await?)
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<String> {
        let payload = json!({
            "model": self.settings.model,
            "messages": [
                { "role": "system", "content": request.system_prompt },
                { "role": "user", "content": request.user_message() }
            ],
            "max_tokens": self.settings.max_tokens,
            "temperature": self.settings.temperature
        });

        let completion = self.send(&payload).await?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| CoverMeError::Api("No response received from OpenAI API".to_string()))
    }
}

#[async_trait]
impl CoverLetterClient for OpenAiClient {
    async fn generate_cover_letter(&self, request: &GenerationRequest) -> Result<String> {
        debug!("Requesting cover letter from OpenAI model {}", self.settings.model);
        self.complete(request)
            .await
            .map_err(|e| CoverMeError::Api(format!("OpenAI API error: {}", e)))
    }

    async fn validate_api_key(&self) -> bool {
        let payload = json!({
            "model": self.settings.model,
            "messages": [{ "role": "user", "content": PROBE_PROMPT }],
            "max_tokens": PROBE_MAX_TOKENS
        });

        match self.send(&payload).await {
            Ok(_) => true,
            Err(e) => {
                debug!("OpenAI key probe failed: {}", e);
                false
            }
        }
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo {
            provider: Provider::OpenAi,
            model: self.settings.model.clone(),
            masked_api_key: mask_api_key(self.api_key.expose_secret()),
        }
    }
}
