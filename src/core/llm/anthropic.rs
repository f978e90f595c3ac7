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

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";

/// Messages backend: separate `system` field, reply split into content blocks
pub struct AnthropicClient {
    settings: ClientSettings,
    api_key: SecretString,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicClient {
    pub fn new(settings: ClientSettings, api_key: SecretString) -> Self {
        Self {
            settings,
            api_key,
            http: reqwest::Client::new(),
        }
    }

    async fn send(&self, payload: &Value) -> Result<MessageResponse> {
        let response = self
            .http
            .post(self.settings.endpoint("messages"))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
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
            "max_tokens": self.settings.max_tokens,
            "temperature": self.settings.temperature,
            "system": request.system_prompt,
            "messages": [{ "role": "user", "content": request.user_message() }]
        });

        let response = self.send(&payload).await?;

        let text: String = response
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        let text = text.trim();
        if text.is_empty() {
            return Err(CoverMeError::Api("No response received from Anthropic API".to_string()));
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl CoverLetterClient for AnthropicClient {
    async fn generate_cover_letter(&self, request: &GenerationRequest) -> Result<String> {
        debug!("Requesting cover letter from Anthropic model {}", self.settings.model);
        self.complete(request)
            .await
            .map_err(|e| CoverMeError::Api(format!("Anthropic API error: {}", e)))
    }

    async fn validate_api_key(&self) -> bool {
        let payload = json!({
            "model": self.settings.model,
            "max_tokens": PROBE_MAX_TOKENS,
            "messages": [{ "role": "user", "content": PROBE_PROMPT }]
        });

        match self.send(&payload).await {
            Ok(_) => true,
            Err(e) => {
                debug!("Anthropic key probe failed: {}", e);
                false
            }
        }
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo {
            provider: Provider::Anthropic,
            model: self.settings.model.clone(),
            masked_api_key: mask_api_key(self.api_key.expose_secret()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> AnthropicClient {
        let settings = ClientSettings {
            model: "claude-haiku-4-5-20251001".to_string(),
            max_tokens: 800,
            temperature: 0.5,
            base_url: server.uri(),
        };
        AnthropicClient::new(settings, SecretString::from("sk-ant-test-987654"))
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new("Write warmly.", "Platform engineer", "Staff SRE role")
    }

    #[tokio::test]
    async fn test_generate_uses_system_field_and_joins_blocks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "sk-ant-test-987654"))
            .and(header("anthropic-version", API_VERSION))
            .and(body_partial_json(json!({
                "system": "Write warmly.",
                "max_tokens": 800,
                "messages": [{ "role": "user" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_01",
                "type": "message",
                "role": "assistant",
                "content": [
                    { "type": "text", "text": "Dear hiring manager,\n\n" },
                    { "type": "text", "text": "I am excited to apply.\n" }
                ],
                "stop_reason": "end_turn"
            })))
            .mount(&server)
            .await;

        let letter = client(&server).generate_cover_letter(&request()).await.unwrap();
        assert_eq!(letter, "Dear hiring manager,\n\nI am excited to apply.");
    }

    #[tokio::test]
    async fn test_empty_content_is_an_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "content": [] })))
            .mount(&server)
            .await;

        let err = client(&server).generate_cover_letter(&request()).await.unwrap_err();
        assert!(err.to_string().contains("Anthropic API error: No response received"));
    }

    #[tokio::test]
    async fn test_backend_error_is_wrapped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "type": "error",
                "error": { "type": "authentication_error", "message": "invalid x-api-key" }
            })))
            .mount(&server)
            .await;

        let err = client(&server).generate_cover_letter(&request()).await.unwrap_err();
        assert!(matches!(err, CoverMeError::Api(_)));
        assert!(err.to_string().contains("invalid x-api-key"));
        assert!(!client(&server).validate_api_key().await);
    }

    #[tokio::test]
    async fn test_valid_key_passes_check() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "sk-ant-test-987654"))
            .and(body_partial_json(json!({
                "model": "claude-haiku-4-5-20251001",
                "max_tokens": PROBE_MAX_TOKENS,
                "messages": [{ "role": "user", "content": PROBE_PROMPT }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{ "type": "text", "text": "Hi" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        assert!(client(&server).validate_api_key().await);
    }

    #[test]
    fn test_provider_info_masks_key() {
        let settings = ClientSettings {
            model: "claude".to_string(),
            max_tokens: 10,
            temperature: 0.0,
            base_url: DEFAULT_BASE_URL.to_string(),
        };
        let info = AnthropicClient::new(settings, SecretString::from("short")).provider_info();
        assert_eq!(info.provider, Provider::Anthropic);
        assert_eq!(info.masked_api_key, "****");
    }
}
