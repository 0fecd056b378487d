//! Per-owner vector index over derived passages.
//!
//! The relational store owns canonical text; everything here can be rebuilt
//! from it. Similarity is cosine for every backend and scores are
//! `1 - cosine distance`, higher is better.

mod libsql;
mod memory;
mod remote;


use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{Config, KnowledgeBackendKind};
use crate::db::Database;
use crate::error::{CareerError, Result};
use crate::models::{
    CollectionHandle, KnowledgeRecord, MetadataFilter, ScoredRecord, META_CATEGORY, META_JOB_ID,
    META_QUESTION_ID,
};

pub use self::libsql::LibSqlKnowledgeStore;
pub use memory::InMemoryKnowledgeStore;
pub use remote::{RemoteKnowledgeConfig, RemoteKnowledgeStore};

#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Idempotent; every other operation also creates the collection lazily.
    async fn ensure_collection(&self, owner_id: &str) -> Result<CollectionHandle>;

    /// Insert or replace records by id.
    async fn upsert(&self, owner_id: &str, records: &[KnowledgeRecord]) -> Result<()>;

    /// Returns the number of records removed.
    async fn delete_where(&self, owner_id: &str, filter: &MetadataFilter) -> Result<usize>;

    async fn delete_by_id(&self, owner_id: &str, ids: &[String]) -> Result<()>;

    /// Up to `top_k` matching records, best first. No matches is an empty
    /// list, never an error.
    async fn query(
        &self,
        owner_id: &str,
        vector: &[f32],
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<ScoredRecord>>;

    /// Every matching record, vectors included.
    async fn get_where(&self, owner_id: &str, filter: &MetadataFilter)
        -> Result<Vec<KnowledgeRecord>>;

    /// Swap the records matching `filter` for `records` and return the
    /// displaced ones so a caller can put them back with [`restore`].
    ///
    /// If the new records cannot be written the displaced ones are restored
    /// before the error is returned; if that fails too the result is
    /// `PartialWriteRisk`.
    ///
    /// [`restore`]: KnowledgeStore::restore
    async fn replace_where(
        &self,
        owner_id: &str,
        filter: &MetadataFilter,
        records: &[KnowledgeRecord],
    ) -> Result<Vec<KnowledgeRecord>> {
        let displaced = self.get_where(owner_id, filter).await?;
        self.delete_where(owner_id, filter).await?;

        if let Err(e) = self.upsert(owner_id, records).await {
            tracing::warn!(owner_id, error = %e, "Knowledge upsert failed, restoring previous records");
            self.restore(owner_id, filter, &displaced).await?;
            return Err(e);
        }

        Ok(displaced)
    }

    /// Put back records displaced by [`replace_where`](KnowledgeStore::replace_where).
    async fn restore(
        &self,
        owner_id: &str,
        filter: &MetadataFilter,
        displaced: &[KnowledgeRecord],
    ) -> Result<()> {
        let restored = async {
            self.delete_where(owner_id, filter).await?;
            self.upsert(owner_id, displaced).await
        }
        .await;

        restored.map_err(|e| {
            CareerError::PartialWriteRisk(format!(
                "knowledge for owner {owner_id} could not be restored ({e}); rebuild required"
            ))
        })
    }
}

/// Build the configured backend. The libsql backend shares the relational
/// database file.
pub async fn build_knowledge_store(
    config: &Config,
    db: &Database,
) -> Result<Arc<dyn KnowledgeStore>> {
    let dimensions = config.embeddings.dimensions;

    let store: Arc<dyn KnowledgeStore> = match config.knowledge.backend {
        KnowledgeBackendKind::LibSql => {
            Arc::new(LibSqlKnowledgeStore::new(db.clone(), dimensions).await?)
        }
        KnowledgeBackendKind::Remote => {
            let base_url = config.knowledge.remote_url.clone().ok_or_else(|| {
                CareerError::Validation(
                    "KNOWLEDGE_REMOTE_URL is required for the remote knowledge backend".to_string(),
                )
            })?;
            Arc::new(RemoteKnowledgeStore::new(RemoteKnowledgeConfig {
                base_url,
                api_key: config.knowledge.remote_api_key.clone(),
                timeout_secs: config.knowledge.remote_timeout_secs,
                dimensions,
            })?)
        }
        KnowledgeBackendKind::Memory => Arc::new(InMemoryKnowledgeStore::new()),
    };

    tracing::info!(backend = ?config.knowledge.backend, dimensions, "Knowledge store ready");
    Ok(store)
}

/// Id of the `n`th résumé chunk.
pub fn resume_record_id(n: usize) -> String {
    format!("resume:{n}")
}

pub fn job_record_id(job_id: &str, section: &str, n: usize) -> String {
    format!("job:{job_id}:{section}:{n}")
}

pub fn qa_record_id(question_id: &str, n: usize) -> String {
    format!("qa:{question_id}:{n}")
}

/// Id prefix shared by every record `filter` can match. Empty when the
/// filter does not pin a category.
pub(crate) fn record_id_prefix(filter: &MetadataFilter) -> String {
    let text = |key: &str| {
        filter
            .clauses()
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_text())
    };
    match text(META_CATEGORY) {
        Some("resume") => "resume:".to_string(),
        Some("jobs") => match text(META_JOB_ID) {
            Some(job_id) => format!("job:{job_id}:"),
            None => "job:".to_string(),
        },
        Some("questions") => match text(META_QUESTION_ID) {
            Some(question_id) => format!("qa:{question_id}:"),
            None => "qa:".to_string(),
        },
        _ => String::new(),
    }
}

/// Cosine similarity; zero vectors score 0.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0_f32, 0.0_f32, 0.0_f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

pub(crate) fn check_dimensions(expected: usize, vector: &[f32]) -> Result<()> {
    if vector.len() != expected {
        return Err(CareerError::Validation(format!(
            "Vector has {} dimensions, knowledge store expects {expected}",
            vector.len()
        )));
    }
    Ok(())
}
