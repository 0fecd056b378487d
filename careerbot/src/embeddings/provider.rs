use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::api::{default_base_url, ApiConfig, EmbeddingApiClient};
use crate::config::{parse_provider_model, EmbeddingsConfig};
use crate::error::{CareerError, Result};

enum EmbeddingBackend {
    Local { model: Arc<Mutex<TextEmbedding>> },
    Api { client: EmbeddingApiClient },
}

/// Turns text into fixed-length vectors.
///
/// Every call is bounded by the configured timeout and returns exactly one
/// vector of [`dimensions`](Self::dimensions) floats per input, in input
/// order. Anything else is reported as `ProviderUnavailable`.
#[derive(Clone)]
pub struct EmbeddingProvider {
    backend: Arc<EmbeddingBackend>,
    dimensions: usize,
    batch_size: usize,
    timeout: Duration,
}

impl EmbeddingProvider {
    pub fn new(config: &EmbeddingsConfig) -> Result<Self> {
        let (provider, model_name) = parse_provider_model(&config.model);

        let backend = if provider == "local" {
            let embedding_model = resolve_embedding_model(model_name);
            EmbeddingBackend::Local {
                model: Arc::new(Mutex::new(build_model(embedding_model)?)),
            }
        } else {
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| default_base_url(provider).to_string());
            let client = EmbeddingApiClient::new(ApiConfig {
                base_url,
                api_key: config.api_key.clone(),
                model: model_name.to_string(),
                timeout_secs: config.timeout_secs,
                max_retries: config.max_retries,
            })?;
            EmbeddingBackend::Api { client }
        };

        tracing::info!(
            provider,
            model = model_name,
            dimensions = config.dimensions,
            "Embedding provider ready"
        );

        Ok(Self {
            backend: Arc::new(backend),
            dimensions: config.dimensions,
            batch_size: config.batch_size.max(1),
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CareerError::ProviderUnavailable("No embedding generated".to_string()))
    }

    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let embedded = tokio::time::timeout(self.timeout, self.embed_chunk(batch))
                .await
                .map_err(|_| {
                    CareerError::ProviderUnavailable(format!(
                        "Embedding request timed out after {}s",
                        self.timeout.as_secs()
                    ))
                })??;
            self.validate(batch.len(), &embedded)?;
            vectors.extend(embedded);
        }

        Ok(vectors)
    }

    async fn embed_chunk(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        match self.backend.as_ref() {
            EmbeddingBackend::Local { model } => {
                let model = Arc::clone(model);
                let texts = batch.to_vec();
                let batch_size = self.batch_size;
                tokio::task::spawn_blocking(move || {
                    let mut model = model.lock().map_err(|e| {
                        CareerError::ProviderUnavailable(format!(
                            "Embedding model lock poisoned: {e}"
                        ))
                    })?;
                    model
                        .embed(texts, Some(batch_size))
                        .map_err(|e| CareerError::ProviderUnavailable(e.to_string()))
                })
                .await
                .map_err(|e| {
                    CareerError::ProviderUnavailable(format!("Embedding worker failed: {e}"))
                })?
            }
            EmbeddingBackend::Api { client } => client.embed(batch).await,
        }
    }

    fn validate(&self, expected: usize, vectors: &[Vec<f32>]) -> Result<()> {
        if vectors.len() != expected {
            return Err(CareerError::ProviderUnavailable(format!(
                "Expected {expected} embeddings, provider returned {}",
                vectors.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimensions) {
            return Err(CareerError::ProviderUnavailable(format!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.dimensions,
                bad.len()
            )));
        }
        Ok(())
    }
}

fn resolve_embedding_model(model_name: &str) -> EmbeddingModel {
    match model_name {
        "BAAI/bge-small-en-v1.5" | "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
        "BAAI/bge-base-en-v1.5" | "bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
        "BAAI/bge-large-en-v1.5" | "bge-large-en-v1.5" => EmbeddingModel::BGELargeENV15,
        "all-MiniLM-L6-v2" | "sentence-transformers/all-MiniLM-L6-v2" => {
            EmbeddingModel::AllMiniLML6V2
        }
        "all-MiniLM-L12-v2" | "sentence-transformers/all-MiniLM-L12-v2" => {
            EmbeddingModel::AllMiniLML12V2
        }
        other => {
            tracing::warn!(model = other, "Unknown local embedding model, using bge-small-en-v1.5");
            EmbeddingModel::BGESmallENV15
        }
    }
}

fn build_model(embedding_model: EmbeddingModel) -> Result<TextEmbedding> {
    TextEmbedding::try_new(InitOptions::new(embedding_model).with_show_download_progress(true))
        .map_err(|e| CareerError::ProviderUnavailable(e.to_string()))
}
