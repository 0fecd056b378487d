use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::db::DatabaseBackend;
use crate::error::Result;
use crate::knowledge::KnowledgeStore;
use crate::models::{Category, MetadataFilter};
use crate::services::indexing::KnowledgeIndexer;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RebuildReport {
    pub owners: usize,
    pub resume_records: usize,
    pub job_records: usize,
    pub question_records: usize,
    pub failed_owners: Vec<String>,
}

impl RebuildReport {
    fn absorb(&mut self, other: RebuildReport) {
        self.owners += other.owners;
        self.resume_records += other.resume_records;
        self.job_records += other.job_records;
        self.question_records += other.question_records;
        self.failed_owners.extend(other.failed_owners);
    }
}

/// Repair path: re-derives an owner's knowledge from the relational copy.
pub struct KnowledgeRebuilder {
    db: Arc<dyn DatabaseBackend>,
    knowledge: Arc<dyn KnowledgeStore>,
    indexer: Arc<KnowledgeIndexer>,
}

impl KnowledgeRebuilder {
    pub fn new(
        db: Arc<dyn DatabaseBackend>,
        knowledge: Arc<dyn KnowledgeStore>,
        indexer: Arc<KnowledgeIndexer>,
    ) -> Self {
        Self {
            db,
            knowledge,
            indexer,
        }
    }

    /// Replace every category of the owner's collection. Categories with no
    /// canonical text end up empty.
    pub async fn rebuild_owner(&self, owner_id: &str) -> Result<RebuildReport> {
        self.knowledge.ensure_collection(owner_id).await?;

        let resume_records = match self.db.get_resume(owner_id).await? {
            Some(resume) => match resume.full_text {
                Some(full_text) => self.indexer.resume_records(owner_id, &full_text).await?,
                None => Vec::new(),
            },
            None => Vec::new(),
        };

        let mut job_records = Vec::new();
        for job in self.db.list_jobs(owner_id).await? {
            let sections = self.db.get_job_sections(&job.id).await?;
            job_records.extend(self.indexer.job_records(owner_id, &job.id, &sections).await?);
        }

        let mut question_records = Vec::new();
        for question in self.db.list_answered_questions(owner_id).await? {
            question_records.extend(self.indexer.qa_records(owner_id, &question).await?);
        }

        for (category, records) in [
            (Category::Resume, &resume_records),
            (Category::Jobs, &job_records),
            (Category::Questions, &question_records),
        ] {
            self.knowledge
                .replace_where(owner_id, &MetadataFilter::category(category), records)
                .await?;
        }

        info!(
            owner_id,
            resume = resume_records.len(),
            jobs = job_records.len(),
            questions = question_records.len(),
            "Knowledge rebuilt"
        );

        Ok(RebuildReport {
            owners: 1,
            resume_records: resume_records.len(),
            job_records: job_records.len(),
            question_records: question_records.len(),
            failed_owners: Vec::new(),
        })
    }

    /// Rebuild every owner known to the relational store. A failing owner is
    /// reported and skipped.
    pub async fn rebuild_all(&self) -> Result<RebuildReport> {
        let owners = self.db.list_owners().await?;
        info!(owners = owners.len(), "Rebuilding knowledge for all owners");

        let mut report = RebuildReport::default();
        for owner_id in owners {
            match self.rebuild_owner(&owner_id).await {
                Ok(owner_report) => report.absorb(owner_report),
                Err(e) => {
                    warn!(owner_id = %owner_id, error = %e, "Knowledge rebuild failed for owner");
                    report.failed_owners.push(owner_id);
                }
            }
        }
        Ok(report)
    }
}
