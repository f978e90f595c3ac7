use tracing::{debug, info};

use crate::error::{CoverMeError, Result};
use super::llm::{CoverLetterClient, GenerationRequest};

/// Produces cover letter text from a job description
pub struct CoverLetterGenerator {
    client: Box<dyn CoverLetterClient>,
    system_prompt: String,
    professional_info: String,
}

impl CoverLetterGenerator {
    pub fn new(
        client: Box<dyn CoverLetterClient>,
        system_prompt: impl Into<String>,
        professional_info: impl Into<String>,
    ) -> Self {
        Self {
            client,
            system_prompt: system_prompt.into(),
            professional_info: professional_info.into(),
        }
    }

    pub fn client(&self) -> &dyn CoverLetterClient {
        self.client.as_ref()
    }

    /// Re-probe the key, then generate. Blank input never reaches the client.
    pub async fn generate(&self, job_description: &str) -> Result<String> {
        if job_description.trim().is_empty() {
            return Err(CoverMeError::Validation("Job description cannot be empty".to_string()));
        }

        self.run(job_description)
            .await
            .map_err(|e| CoverMeError::Generation(format!("Failed to generate cover letter: {}", e)))
    }

    async fn run(&self, job_description: &str) -> Result<String> {
        let info = self.client.provider_info();
        debug!("Validating {} API key", info.provider.display_name());
        if !self.client.validate_api_key().await {
            return Err(CoverMeError::Api("Invalid API key or connection failed".to_string()));
        }

        let request = GenerationRequest::new(
            self.system_prompt.as_str(),
            self.professional_info.as_str(),
            job_description,
        );
        info!("Generating cover letter with {} ({})", info.provider, info.model);
        self.client.generate_cover_letter(&request).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::Provider;
    use crate::core::llm::ProviderInfo;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Scripted client that records what it was asked
    #[derive(Clone)]
    pub(crate) struct FakeClient {
        pub key_valid: bool,
        pub reply: std::result::Result<String, String>,
        pub probes: Arc<AtomicUsize>,
        pub requests: Arc<Mutex<Vec<GenerationRequest>>>,
    }

    impl FakeClient {
        pub(crate) fn replying(text: &str) -> Self {
            Self {
                key_valid: true,
                reply: Ok(text.to_string()),
                probes: Arc::new(AtomicUsize::new(0)),
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl CoverLetterClient for FakeClient {
        async fn generate_cover_letter(&self, request: &GenerationRequest) -> Result<String> {
            self.requests.lock().unwrap().push(request.clone());
            self.reply.clone().map_err(CoverMeError::Api)
        }

        async fn validate_api_key(&self) -> bool {
            self.probes.fetch_add(1, Ordering::SeqCst);
            self.key_valid
        }

        fn provider_info(&self) -> ProviderInfo {
            ProviderInfo {
                provider: Provider::OpenAi,
                model: "fake-model".to_string(),
                masked_api_key: "****".to_string(),
            }
        }
    }

    fn generator(client: &FakeClient) -> CoverLetterGenerator {
        CoverLetterGenerator::new(Box::new(client.clone()), "Be brief.", "Ten years of Rust.")
    }

    #[tokio::test]
    async fn test_blank_job_description_never_reaches_client() {
        let client = FakeClient::replying("letter");
        let err = generator(&client).generate(" \n\t").await.unwrap_err();

        assert!(matches!(err, CoverMeError::Validation(_)));
        assert_eq!(client.probes.load(Ordering::SeqCst), 0);
        assert!(client.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generate_probes_then_requests() {
        let client = FakeClient::replying("Dear team,");
        let letter = generator(&client).generate("Senior backend engineer").await.unwrap();

        assert_eq!(letter, "Dear team,");
        assert_eq!(client.probes.load(Ordering::SeqCst), 1);
        let requests = client.requests.lock().unwrap();
        assert_eq!(requests[0].system_prompt, "Be brief.");
        assert_eq!(requests[0].professional_info, "Ten years of Rust.");
        assert_eq!(requests[0].job_description, "Senior backend engineer");
    }

    #[tokio::test]
    async fn test_failed_probe_is_generation_error() {
        let client = FakeClient {
            key_valid: false,
            ..FakeClient::replying("unused")
        };
        let err = generator(&client).generate("A job").await.unwrap_err();

        assert!(matches!(err, CoverMeError::Generation(_)));
        assert!(err.to_string().contains("Invalid API key or connection failed"));
        assert!(client.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_carries_cause() {
        let client = FakeClient {
            reply: Err("OpenAI API error: timeout".to_string()),
            ..FakeClient::replying("unused")
        };
        let err = generator(&client).generate("A job").await.unwrap_err();

        assert!(matches!(err, CoverMeError::Generation(_)));
        assert_eq!(
            err.to_string(),
            "Failed to generate cover letter: OpenAI API error: timeout"
        );
    }
}
