mod common;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use common::{api_error_body, completion_body};

use careerbot::config::LlmConfig;
use careerbot::error::CareerError;
use careerbot::llm::{CompletionOptions, LlmApiClient, LlmBackend, LlmProvider};

fn llm_config(model: &str) -> LlmConfig {
    LlmConfig {
        model: model.to_string(),
        api_key: Some("test-key".to_string()),
        base_url: None,
        timeout_secs: 30,
        max_retries: 3,
    }
}

fn llm_config_with_base_url(model: &str, base_url: String, max_retries: u32) -> LlmConfig {
    LlmConfig {
        model: model.to_string(),
        api_key: Some("test-key".to_string()),
        base_url: Some(base_url),
        timeout_secs: 5,
        max_retries,
    }
}

async fn provider_for(server: &MockServer, max_retries: u32) -> LlmProvider {
    let config =
        llm_config_with_base_url("openai/gpt-4o-mini", format!("{}/v1", server.uri()), max_retries);
    LlmProvider::new(Some(&config))
}

#[test]
fn test_openai_provider_detection() {
    let config = llm_config("openai/gpt-4o");
    let provider = LlmProvider::new(Some(&config));

    assert!(matches!(provider.backend(), LlmBackend::OpenAI));
    assert_eq!(provider.base_url(), Some("https://api.openai.com/v1"));
}

#[test]
fn test_openrouter_provider_detection() {
    let config = llm_config("openrouter/openai/gpt-4o");
    let provider = LlmProvider::new(Some(&config));

    assert!(matches!(provider.backend(), LlmBackend::OpenRouter));
    assert_eq!(provider.base_url(), Some("https://openrouter.ai/api/v1"));
}

#[test]
fn test_ollama_provider_detection() {
    let config = llm_config("ollama/llama3.2");
    let provider = LlmProvider::new(Some(&config));

    assert!(matches!(provider.backend(), LlmBackend::Ollama));
    assert_eq!(provider.base_url(), Some("http://localhost:11434/v1"));
}

#[test]
fn test_unconfigured_provider_is_unavailable() {
    let provider = LlmProvider::new(None);

    assert!(matches!(provider.backend(), LlmBackend::Unavailable { .. }));
    assert!(!provider.is_available());
    assert!(provider.base_url().is_none());
}

#[test]
fn test_provider_clone() {
    let config = llm_config("openrouter/openai/gpt-4o-mini");
    let provider = LlmProvider::new(Some(&config));
    let cloned = provider.clone();

    assert!(matches!(cloned.backend(), LlmBackend::OpenRouter));
    assert!(cloned.is_available());
    assert_eq!(
        cloned.config().map(|c| c.model.as_str()),
        Some(config.model.as_str())
    );
}

#[test]
fn test_api_client_strips_provider_prefix() {
    let config = llm_config("openrouter/openai/gpt-4o-mini");
    let client = LlmApiClient::new(&config).expect("client");

    assert_eq!(client.base_url(), "https://openrouter.ai/api/v1");
    assert_eq!(client.model(), "openai/gpt-4o-mini");
}

#[tokio::test]
async fn test_complete_returns_response_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Hello from mock")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server, 1).await;

    let result = provider.complete("Hello", None).await;

    match result {
        Ok(value) => assert_eq!(value, "Hello from mock"),
        Err(error) => panic!("Expected completion to succeed, got: {error}"),
    }
}

#[tokio::test]
async fn test_deterministic_options_send_zero_temperature() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("\"temperature\":0.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Steady")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server, 0).await;

    let result = provider
        .complete("Summarize my résumé", Some(&CompletionOptions::deterministic()))
        .await;

    assert_eq!(result.expect("completion"), "Steady");
}

#[tokio::test]
async fn test_retry_on_server_error() {
    let server = MockServer::start().await;
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_for_mock = Arc::clone(&attempts);

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(move |_request: &Request| {
            if attempts_for_mock.fetch_add(1, Ordering::SeqCst) == 0 {
                ResponseTemplate::new(500).set_body_json(serde_json::json!({
                    "error": {
                        "message": "upstream temporary failure",
                        "type": null,
                        "param": null,
                        "code": null
                    }
                }))
            } else {
                ResponseTemplate::new(200).set_body_json(completion_body("Recovered response"))
            }
        })
        .mount(&server)
        .await;

    let provider = provider_for(&server, 2).await;

    let result = provider.complete("Retry test", None).await;

    match result {
        Ok(value) => assert_eq!(value, "Recovered response"),
        Err(error) => panic!("Expected retry completion to succeed, got: {error}"),
    }
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(api_error_body(
            "The model does not exist",
            "invalid_request_error",
            "model_not_found",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server, 2).await;

    let result = provider.complete("No retry", None).await;

    assert!(matches!(result, Err(CareerError::Llm(_))), "got: {result:?}");
}

#[tokio::test]
async fn test_rate_limit_handling() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "7")
                .set_body_json(api_error_body(
                    "Rate limit exceeded",
                    "insufficient_quota",
                    "insufficient_quota",
                )),
        )
        .mount(&server)
        .await;

    let provider = provider_for(&server, 1).await;

    let result = provider.complete("Rate limit test", None).await;

    assert!(matches!(
        result,
        Err(CareerError::ApiRateLimit { retry_after: None })
    ));
}

#[tokio::test]
async fn test_auth_error_is_reported_as_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(api_error_body(
            "Invalid API key",
            "invalid_request_error",
            "invalid_api_key",
        )))
        .mount(&server)
        .await;

    let provider = provider_for(&server, 1).await;

    let result = provider.complete("Auth test", None).await;

    match result {
        Err(CareerError::ApiAuth(message)) => {
            assert!(message.to_lowercase().contains("authentication failed"));
        }
        other => panic!("Expected auth error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_content_is_an_llm_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("   ")))
        .mount(&server)
        .await;

    let provider = provider_for(&server, 0).await;

    let result = provider.complete("Say nothing", None).await;

    assert!(matches!(result, Err(CareerError::Llm(_))), "got: {result:?}");
}

#[tokio::test]
async fn test_unreachable_server_is_provider_unavailable() {
    let config = llm_config_with_base_url("openai/gpt-4o-mini", "http://127.0.0.1:9/v1".into(), 0);
    let provider = LlmProvider::new(Some(&config));

    let result = provider.complete("Anyone there?", None).await;

    assert!(
        matches!(result, Err(CareerError::ProviderUnavailable(_))),
        "got: {result:?}"
    );
}

#[tokio::test]
async fn test_empty_prompt_validation() {
    let config = llm_config("openai/gpt-4o-mini");
    let provider = LlmProvider::new(Some(&config));

    let result = provider.complete("   ", None).await;

    match result {
        Err(CareerError::Validation(message)) => {
            assert!(message.contains("Prompt cannot be empty"));
        }
        other => panic!("Expected Validation error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_unavailable_provider_fails_fast() {
    let provider = LlmProvider::new(None);

    let result = provider.complete("Hello", None).await;

    assert!(matches!(result, Err(CareerError::ProviderUnavailable(_))));
}

#[tokio::test]
async fn test_missing_api_key_for_hosted_provider() {
    let mut config = llm_config("openai/gpt-4o");
    config.api_key = None;
    let provider = LlmProvider::new(Some(&config));

    assert!(!provider.is_available());
    let result = provider.complete("Hello", None).await;
    assert!(matches!(result, Err(CareerError::ProviderUnavailable(_))));
}
