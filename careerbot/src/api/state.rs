use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::db::DatabaseBackend;
use crate::embeddings::EmbeddingProvider;
use crate::error::Result;
use crate::knowledge::KnowledgeStore;
use crate::llm::LlmProvider;
use crate::processing::DocumentExtractor;
use crate::services::{
    CareerService, ContextAssembler, GenerationOrchestrator, IngestionService, KnowledgeIndexer,
    KnowledgeRebuilder, SessionRegistry,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<dyn DatabaseBackend>,
    pub knowledge: Arc<dyn KnowledgeStore>,
    pub embeddings: EmbeddingProvider,
    pub llm: LlmProvider,
    pub ingestion: Arc<IngestionService>,
    pub career: Arc<CareerService>,
    pub rebuilder: Arc<KnowledgeRebuilder>,
}

impl AppState {
    pub fn new(
        config: Config,
        db: Arc<dyn DatabaseBackend>,
        knowledge: Arc<dyn KnowledgeStore>,
        embeddings: EmbeddingProvider,
        llm: LlmProvider,
    ) -> Result<Self> {
        let config = Arc::new(config);

        let indexer = Arc::new(KnowledgeIndexer::new(
            embeddings.clone(),
            &config.processing,
        )?);
        let generation = Arc::new(GenerationOrchestrator::from_config(llm.clone(), &config));
        let sessions = Arc::new(SessionRegistry::new(Duration::from_secs(
            config.sessions.idle_ttl_secs,
        )));
        let context = ContextAssembler::new(
            embeddings.clone(),
            knowledge.clone(),
            config.retrieval.max_context_chars,
        );

        let ingestion = IngestionService::new(
            db.clone(),
            knowledge.clone(),
            indexer.clone(),
            generation.clone(),
            DocumentExtractor::new(&config.processing),
        );
        let career = CareerService::new(
            db.clone(),
            context,
            generation,
            sessions,
            config.retrieval.clone(),
        );
        let rebuilder = KnowledgeRebuilder::new(db.clone(), knowledge.clone(), indexer);

        Ok(Self {
            config,
            db,
            knowledge,
            embeddings,
            llm,
            ingestion: Arc::new(ingestion),
            career: Arc::new(career),
            rebuilder: Arc::new(rebuilder),
        })
    }
}
