//! Tests for the OpenAI-compatible embedding client and the provider
//! contract (batching, ordering, validation).

use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use crate::config::EmbeddingsConfig;
use crate::embeddings::api::{ApiConfig, EmbeddingApiClient};
use crate::embeddings::EmbeddingProvider;
use crate::error::CareerError;

fn test_config(base_url: &str) -> ApiConfig {
    ApiConfig {
        base_url: base_url.to_string(),
        api_key: Some("test-api-key".to_string()),
        model: "text-embedding-3-small".to_string(),
        timeout_secs: 10,
        max_retries: 2,
    }
}

fn provider_config(base_url: &str, dimensions: usize, batch_size: usize) -> EmbeddingsConfig {
    EmbeddingsConfig {
        model: "openai/text-embedding-3-small".to_string(),
        dimensions,
        batch_size,
        api_key: Some("test-api-key".to_string()),
        base_url: Some(base_url.to_string()),
        timeout_secs: 10,
        max_retries: 0,
    }
}

fn embedding_response(embeddings: Vec<Vec<f32>>) -> serde_json::Value {
    json!({
        "data": embeddings.into_iter().map(|e| json!({ "embedding": e })).collect::<Vec<_>>()
    })
}

fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Answers every request with `[input length, batch position, 1.0]` vectors
/// and counts calls.
struct LengthEmbedder {
    calls: Arc<AtomicUsize>,
}

impl Respond for LengthEmbedder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        let inputs = body["input"].as_array().cloned().unwrap_or_default();
        let data: Vec<_> = inputs
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let len = text.as_str().unwrap_or_default().chars().count() as f32;
                json!({ "index": i, "embedding": [len, i as f32, 1.0] })
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({ "data": data }))
    }
}

#[tokio::test]
async fn test_api_client_request_format() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(header("authorization", "Bearer test-api-key"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "model": "text-embedding-3-small",
            "input": ["Senior Rust engineer"]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(embedding_response(vec![vec![0.1, 0.2, 0.3]])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = EmbeddingApiClient::new(test_config(&mock_server.uri())).unwrap();
    let embeddings = client.embed(&texts(&["Senior Rust engineer"])).await.unwrap();
    assert_eq!(embeddings, vec![vec![0.1, 0.2, 0.3]]);
}

#[tokio::test]
async fn test_api_client_no_api_key_omits_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(move |req: &Request| {
            assert!(req.headers.get("authorization").is_none());
            ResponseTemplate::new(200).set_body_json(embedding_response(vec![vec![1.0]]))
        })
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = test_config(&mock_server.uri());
    config.api_key = None;
    let client = EmbeddingApiClient::new(config).unwrap();
    assert!(client.embed(&texts(&["x"])).await.is_ok());
}

#[tokio::test]
async fn test_api_client_orders_by_index() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "index": 1, "embedding": [2.0] },
                { "index": 0, "embedding": [1.0] }
            ]
        })))
        .mount(&mock_server)
        .await;

    let client = EmbeddingApiClient::new(test_config(&mock_server.uri())).unwrap();
    let embeddings = client.embed(&texts(&["a", "b"])).await.unwrap();
    assert_eq!(embeddings, vec![vec![1.0], vec![2.0]]);
}

#[tokio::test]
async fn test_api_client_server_error_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(embedding_response(vec![vec![0.5, 0.5]])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = EmbeddingApiClient::new(test_config(&mock_server.uri())).unwrap();
    let embeddings = client.embed(&texts(&["retry me"])).await.unwrap();
    assert_eq!(embeddings, vec![vec![0.5, 0.5]]);
}

#[tokio::test]
async fn test_api_client_rate_limit_exhausts_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = EmbeddingApiClient::new(test_config(&mock_server.uri())).unwrap();
    let result = client.embed(&texts(&["busy"])).await;
    assert!(matches!(
        result,
        Err(CareerError::ApiRateLimit {
            retry_after: Some(7)
        })
    ));
}

#[tokio::test]
async fn test_api_client_auth_error_no_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = EmbeddingApiClient::new(test_config(&mock_server.uri())).unwrap();
    let result = client.embed(&texts(&["secret"])).await;
    match result {
        Err(CareerError::ApiAuth(body)) => assert_eq!(body, "invalid key"),
        other => panic!("expected ApiAuth, got {other:?}"),
    }
}

#[tokio::test]
async fn test_api_client_400_no_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad input"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = EmbeddingApiClient::new(test_config(&mock_server.uri())).unwrap();
    let result = client.embed(&texts(&["x"])).await;
    assert!(matches!(result, Err(CareerError::ProviderUnavailable(_))));
}

#[tokio::test]
async fn test_api_client_malformed_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let client = EmbeddingApiClient::new(test_config(&mock_server.uri())).unwrap();
    let result = client.embed(&texts(&["x"])).await;
    assert!(matches!(result, Err(CareerError::ProviderUnavailable(_))));
}

#[tokio::test]
async fn test_provider_embed_batch_preserves_order_across_batches() {
    let mock_server = MockServer::start().await;
    let calls = Arc::new(AtomicUsize::new(0));

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(LengthEmbedder {
            calls: Arc::clone(&calls),
        })
        .mount(&mock_server)
        .await;

    let provider = EmbeddingProvider::new(&provider_config(&mock_server.uri(), 3, 2)).unwrap();
    let inputs = texts(&["a", "bb", "ccc", "dddd", "eeeee"]);
    let vectors = provider.embed_batch(&inputs).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    let lengths: Vec<f32> = vectors.iter().map(|v| v[0]).collect();
    assert_eq!(lengths, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
}

#[tokio::test]
async fn test_provider_embed_single() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(LengthEmbedder {
            calls: Arc::new(AtomicUsize::new(0)),
        })
        .mount(&mock_server)
        .await;

    let provider = EmbeddingProvider::new(&provider_config(&mock_server.uri(), 3, 64)).unwrap();
    assert_eq!(provider.dimensions(), 3);
    assert_eq!(provider.embed("four").await.unwrap(), vec![4.0, 0.0, 1.0]);
    assert!(provider.embed_batch(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_provider_rejects_wrong_dimensions() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(LengthEmbedder {
            calls: Arc::new(AtomicUsize::new(0)),
        })
        .mount(&mock_server)
        .await;

    let provider = EmbeddingProvider::new(&provider_config(&mock_server.uri(), 384, 64)).unwrap();
    let result = provider.embed("résumé").await;
    assert!(matches!(result, Err(CareerError::ProviderUnavailable(_))));
}

#[tokio::test]
async fn test_provider_rejects_missing_vectors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&mock_server)
        .await;

    let provider = EmbeddingProvider::new(&provider_config(&mock_server.uri(), 3, 64)).unwrap();
    let result = provider.embed_batch(&texts(&["a", "b"])).await;
    assert!(matches!(result, Err(CareerError::ProviderUnavailable(_))));
}

#[tokio::test]
async fn test_provider_unreachable_is_provider_failure() {
    let provider = EmbeddingProvider::new(&provider_config("http://127.0.0.1:9", 3, 64)).unwrap();
    let err = provider.embed("anything").await.unwrap_err();
    assert!(err.is_provider_failure());
}
