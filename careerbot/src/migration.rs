use std::io::{self, Write};
use std::sync::Arc;

use crate::config::{Config, KnowledgeBackendKind};
use crate::db::{Database, DatabaseBackend};
use crate::error::Result;
use crate::knowledge::{build_knowledge_store, KnowledgeStore, LibSqlKnowledgeStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDecision {
    NotNeeded,
    Approved,
    Rejected,
}

/// Compare the embedding dimension the knowledge store was built with to
/// the current provider's.
///
/// On a mismatch either `force_rebuild` approves the migration or the
/// operator is asked on stdin.
pub async fn check_dimension_compatibility(
    db: &dyn DatabaseBackend,
    model_dimensions: usize,
    force_rebuild: bool,
) -> Result<MigrationDecision> {
    let stored_dimensions = db.get_embedding_dimensions().await?;

    match stored_dimensions {
        None => {
            tracing::info!(
                "Fresh database, storing embedding dimensions: {}",
                model_dimensions
            );
            db.set_embedding_dimensions(model_dimensions).await?;
            Ok(MigrationDecision::NotNeeded)
        }
        Some(db_dims) if db_dims == model_dimensions => {
            tracing::info!("Embedding dimensions match: {}", model_dimensions);
            Ok(MigrationDecision::NotNeeded)
        }
        Some(db_dims) => {
            tracing::warn!(
                "Dimension mismatch: knowledge store has {} dimensions, model produces {}",
                db_dims,
                model_dimensions
            );

            if force_rebuild {
                tracing::info!("Rebuild flag set, proceeding with migration");
                return Ok(MigrationDecision::Approved);
            }

            print!(
                "\nEmbedding dimension mismatch detected!\n\
                 Knowledge store: {db_dims} dimensions\n\
                 Model: {model_dimensions} dimensions\n\n\
                 This requires re-embedding every résumé, job posting and saved answer.\n\
                 Proceed with migration? [y/N]: "
            );
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            let answer = input.trim().to_lowercase();
            if answer == "y" || answer == "yes" {
                Ok(MigrationDecision::Approved)
            } else {
                Ok(MigrationDecision::Rejected)
            }
        }
    }
}

/// Open the configured knowledge store. After an approved migration the
/// libsql backend drops its records and recreates its vector table with the
/// new dimension; other backends are cleared by the rebuild that follows.
pub async fn open_knowledge_store(
    config: &Config,
    db: &Database,
    decision: MigrationDecision,
) -> Result<Arc<dyn KnowledgeStore>> {
    if decision == MigrationDecision::Approved
        && config.knowledge.backend == KnowledgeBackendKind::LibSql
    {
        let store = LibSqlKnowledgeStore::recreate(db.clone(), config.embeddings.dimensions).await?;
        return Ok(Arc::new(store));
    }
    build_knowledge_store(config, db).await
}

/// Record the new dimension once the knowledge has been rebuilt.
pub async fn complete_migration(db: &dyn DatabaseBackend, new_dimensions: usize) -> Result<()> {
    db.set_embedding_dimensions(new_dimensions).await?;
    tracing::info!(
        "Migration complete: knowledge store now uses {} dimensions",
        new_dimensions
    );
    Ok(())
}
