use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use super::{cosine_similarity, KnowledgeStore};
use crate::error::{CareerError, Result};
use crate::models::{CollectionHandle, KnowledgeRecord, MetadataFilter, ScoredRecord};

type Collections = HashMap<String, HashMap<String, KnowledgeRecord>>;

/// Process-local store. Every batch is applied under one write lock, so
/// readers never observe a partial batch.
#[derive(Default)]
pub struct InMemoryKnowledgeStore {
    collections: RwLock<Collections>,
}

impl InMemoryKnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>> {
        self.collections
            .read()
            .map_err(|e| CareerError::KnowledgeStore(format!("knowledge lock poisoned: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>> {
        self.collections
            .write()
            .map_err(|e| CareerError::KnowledgeStore(format!("knowledge lock poisoned: {e}")))
    }
}

fn remove_matching(
    collection: &mut HashMap<String, KnowledgeRecord>,
    filter: &MetadataFilter,
) -> Vec<KnowledgeRecord> {
    let ids: Vec<String> = collection
        .values()
        .filter(|r| filter.matches(&r.metadata))
        .map(|r| r.id.clone())
        .collect();
    ids.iter().filter_map(|id| collection.remove(id)).collect()
}

#[async_trait]
impl KnowledgeStore for InMemoryKnowledgeStore {
    async fn ensure_collection(&self, owner_id: &str) -> Result<CollectionHandle> {
        let mut collections = self.write()?;
        let created = !collections.contains_key(owner_id);
        collections.entry(owner_id.to_string()).or_default();
        Ok(CollectionHandle {
            owner_id: owner_id.to_string(),
            created,
        })
    }

    async fn upsert(&self, owner_id: &str, records: &[KnowledgeRecord]) -> Result<()> {
        let mut collections = self.write()?;
        let collection = collections.entry(owner_id.to_string()).or_default();
        for record in records {
            collection.insert(record.id.clone(), record.clone());
        }
        Ok(())
    }

    async fn delete_where(&self, owner_id: &str, filter: &MetadataFilter) -> Result<usize> {
        filter.validate()?;
        let mut collections = self.write()?;
        let collection = collections.entry(owner_id.to_string()).or_default();
        Ok(remove_matching(collection, filter).len())
    }

    async fn delete_by_id(&self, owner_id: &str, ids: &[String]) -> Result<()> {
        let mut collections = self.write()?;
        let collection = collections.entry(owner_id.to_string()).or_default();
        for id in ids {
            collection.remove(id);
        }
        Ok(())
    }

    async fn query(
        &self,
        owner_id: &str,
        vector: &[f32],
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<ScoredRecord>> {
        filter.validate()?;
        let collections = self.read()?;
        let Some(collection) = collections.get(owner_id) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<ScoredRecord> = collection
            .values()
            .filter(|r| filter.matches(&r.metadata))
            .map(|r| ScoredRecord {
                score: cosine_similarity(vector, &r.vector),
                record: r.clone(),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.record.id.cmp(&b.record.id))
        });
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn get_where(
        &self,
        owner_id: &str,
        filter: &MetadataFilter,
    ) -> Result<Vec<KnowledgeRecord>> {
        filter.validate()?;
        let collections = self.read()?;
        let mut records: Vec<KnowledgeRecord> = collections
            .get(owner_id)
            .map(|c| {
                c.values()
                    .filter(|r| filter.matches(&r.metadata))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    async fn replace_where(
        &self,
        owner_id: &str,
        filter: &MetadataFilter,
        records: &[KnowledgeRecord],
    ) -> Result<Vec<KnowledgeRecord>> {
        filter.validate()?;
        let mut collections = self.write()?;
        let collection = collections.entry(owner_id.to_string()).or_default();
        let displaced = remove_matching(collection, filter);
        for record in records {
            collection.insert(record.id.clone(), record.clone());
        }
        Ok(displaced)
    }
}
