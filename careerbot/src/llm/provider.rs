use std::sync::Arc;

use crate::config::{parse_llm_provider_model, LlmConfig};
use crate::error::{CareerError, Result};
use crate::llm::api::LlmApiClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmBackend {
    OpenAI,
    OpenRouter,
    Ollama,
    LmStudio,
    OpenAICompatible { base_url: String },
    Unavailable { reason: String },
}

#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionOptions {
    /// Temperature 0, used for every career prompt.
    pub fn deterministic() -> Self {
        Self {
            temperature: Some(0.0),
            ..Default::default()
        }
    }
}

/// Hosted language model selected from configuration. Without a usable
/// configuration every call fails with [`CareerError::ProviderUnavailable`].
#[derive(Clone)]
pub struct LlmProvider {
    backend: LlmBackend,
    config: Option<Arc<LlmConfig>>,
    client: Option<LlmApiClient>,
}

impl LlmProvider {
    pub fn new(config: Option<&LlmConfig>) -> Self {
        let Some(config) = config else {
            return Self::unavailable("No LLM configuration provided");
        };

        let (provider, _model) = parse_llm_provider_model(&config.model);

        let backend = match provider.to_lowercase().as_str() {
            "openai" => LlmBackend::OpenAI,
            "openrouter" => LlmBackend::OpenRouter,
            "ollama" => LlmBackend::Ollama,
            "lmstudio" => LlmBackend::LmStudio,
            _ => match &config.base_url {
                Some(base_url) => LlmBackend::OpenAICompatible {
                    base_url: base_url.clone(),
                },
                None => {
                    return Self::unavailable(&format!(
                        "Unknown provider in model: {}",
                        config.model
                    ))
                }
            },
        };

        let client = match LlmApiClient::new(config) {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(model = %config.model, error = %e, "LLM client unavailable");
                return Self::unavailable(&e.to_string());
            }
        };

        tracing::info!(model = %config.model, base_url = %client.base_url(), "LLM provider ready");

        Self {
            backend,
            config: Some(Arc::new(config.clone())),
            client: Some(client),
        }
    }

    pub fn unavailable(reason: &str) -> Self {
        Self {
            backend: LlmBackend::Unavailable {
                reason: reason.to_string(),
            },
            config: None,
            client: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.client.is_some()
    }

    pub fn backend(&self) -> &LlmBackend {
        &self.backend
    }

    pub fn config(&self) -> Option<&LlmConfig> {
        self.config.as_deref()
    }

    pub fn base_url(&self) -> Option<&str> {
        self.client.as_ref().map(LlmApiClient::base_url)
    }

    pub async fn complete(
        &self,
        prompt: &str,
        options: Option<&CompletionOptions>,
    ) -> Result<String> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| CareerError::ProviderUnavailable(self.unavailable_reason()))?;

        client.complete(prompt, None, options).await
    }

    fn unavailable_reason(&self) -> String {
        match &self.backend {
            LlmBackend::Unavailable { reason } => reason.clone(),
            _ => "LLM client is not initialised".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(model: &str, api_key: Option<&str>, base_url: Option<&str>) -> LlmConfig {
        LlmConfig {
            model: model.to_string(),
            api_key: api_key.map(str::to_string),
            base_url: base_url.map(str::to_string),
            timeout_secs: 5,
            max_retries: 0,
        }
    }

    #[test]
    fn test_unknown_provider_without_base_url_is_unavailable() {
        let provider = LlmProvider::new(Some(&config("gpt-4o", Some("k"), None)));
        assert!(!provider.is_available());
        assert!(matches!(provider.backend(), LlmBackend::Unavailable { .. }));
    }

    #[test]
    fn test_unknown_provider_with_base_url_is_compatible() {
        let provider = LlmProvider::new(Some(&config(
            "my-model",
            None,
            Some("http://localhost:9000/v1"),
        )));
        assert!(provider.is_available());
        assert_eq!(
            provider.backend(),
            &LlmBackend::OpenAICompatible {
                base_url: "http://localhost:9000/v1".to_string()
            }
        );
    }

    #[test]
    fn test_missing_api_key_is_unavailable() {
        let provider = LlmProvider::new(Some(&config("openai/gpt-4o-mini", None, None)));
        assert!(!provider.is_available());
    }

    #[tokio::test]
    async fn test_unavailable_provider_reports_provider_unavailable() {
        let provider = LlmProvider::new(None);
        let result = provider.complete("hello", None).await;
        assert!(matches!(result, Err(CareerError::ProviderUnavailable(_))));
    }

    #[test]
    fn test_deterministic_options() {
        assert_eq!(CompletionOptions::deterministic().temperature, Some(0.0));
    }
}
