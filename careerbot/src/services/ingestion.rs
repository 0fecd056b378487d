use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use crate::db::DatabaseBackend;
use crate::error::{CareerError, Result};
use crate::knowledge::KnowledgeStore;
use crate::llm::prompts;
use crate::models::{
    Category, InterviewQuestion, JobDetails, JobPosting, JobSection, JobSectionKind,
    KnowledgeRecord, MetadataFilter, NewJobPosting, ResumeIngestReport, META_JOB_ID,
    META_QUESTION_ID,
};
use crate::processing::{DocumentExtractor, SectionSplitter};
use crate::services::generation::{GenerationOrchestrator, PromptInput};
use crate::services::indexing::KnowledgeIndexer;

const DEFAULT_JOB_STATUS: &str = "saved";

/// Write paths that keep canonical text and derived knowledge in step.
///
/// Every operation embeds first, then swaps the knowledge records, then
/// writes the relational rows. If the relational write fails the displaced
/// knowledge is put back; if that fails too the error is `PartialWriteRisk`
/// and the owner needs a rebuild.
pub struct IngestionService {
    db: Arc<dyn DatabaseBackend>,
    knowledge: Arc<dyn KnowledgeStore>,
    indexer: Arc<KnowledgeIndexer>,
    generation: Arc<GenerationOrchestrator>,
    extractor: DocumentExtractor,
    splitter: SectionSplitter,
}

impl IngestionService {
    pub fn new(
        db: Arc<dyn DatabaseBackend>,
        knowledge: Arc<dyn KnowledgeStore>,
        indexer: Arc<KnowledgeIndexer>,
        generation: Arc<GenerationOrchestrator>,
        extractor: DocumentExtractor,
    ) -> Self {
        Self {
            db,
            knowledge,
            indexer,
            generation,
            extractor,
            splitter: SectionSplitter::new(),
        }
    }

    pub async fn ingest_resume(
        &self,
        owner_id: &str,
        bytes: Vec<u8>,
        media_type: Option<&str>,
    ) -> Result<ResumeIngestReport> {
        require_owner(owner_id)?;

        let extractor = self.extractor.clone();
        let media_type = media_type.map(str::to_string);
        let extracted =
            tokio::task::spawn_blocking(move || extractor.extract(&bytes, media_type.as_deref()))
                .await
                .map_err(|e| CareerError::Internal(format!("Extraction task failed: {e}")))??;

        let full_text = extracted.text;
        if full_text.is_empty() {
            return Err(CareerError::Extraction(
                "No text could be extracted from the document".to_string(),
            ));
        }

        let sections = self.splitter.split(&full_text);
        let records = self.indexer.resume_records(owner_id, &full_text).await?;

        let filter = MetadataFilter::category(Category::Resume);
        let displaced = self
            .knowledge
            .replace_where(owner_id, &filter, &records)
            .await?;

        if let Err(e) = self.db.replace_resume(owner_id, &full_text, &sections).await {
            return Err(self.roll_back(owner_id, &filter, &displaced, e).await);
        }

        info!(
            owner_id,
            kind = %extracted.kind,
            sections = sections.len(),
            chunks = records.len(),
            "Résumé ingested"
        );

        Ok(ResumeIngestReport {
            owner_id: owner_id.to_string(),
            sections: sections.into_iter().map(|s| s.header).collect(),
            chunks: records.len(),
            characters: full_text.chars().count(),
        })
    }

    pub async fn create_job(&self, owner_id: &str, new_job: NewJobPosting) -> Result<JobDetails> {
        require_owner(owner_id)?;
        for (field, value) in [
            ("title", &new_job.title),
            ("company", &new_job.company),
            ("description", &new_job.description),
        ] {
            if value.trim().is_empty() {
                return Err(CareerError::Validation(format!("Job {field} is required")));
            }
        }

        let sections = self.split_job_description(&new_job.description).await?;

        let now = Utc::now();
        let job = JobPosting {
            id: nanoid::nanoid!(),
            owner_id: owner_id.to_string(),
            title: new_job.title.trim().to_string(),
            company: new_job.company.trim().to_string(),
            description: new_job.description,
            status: new_job
                .status
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_JOB_STATUS.to_string()),
            post_url: new_job.post_url,
            created_at: now,
            updated_at: now,
        };

        let records = self.indexer.job_records(owner_id, &job.id, &sections).await?;

        let filter = job_filter(&job.id);
        let displaced = self
            .knowledge
            .replace_where(owner_id, &filter, &records)
            .await?;

        if let Err(e) = self.db.create_job(&job, &sections).await {
            return Err(self.roll_back(owner_id, &filter, &displaced, e).await);
        }

        info!(owner_id, job_id = %job.id, sections = sections.len(), chunks = records.len(), "Job posting saved");
        Ok(JobDetails { job, sections })
    }

    pub async fn delete_job(&self, owner_id: &str, job_id: &str) -> Result<()> {
        if self.db.get_job(owner_id, job_id).await?.is_none() {
            return Err(CareerError::NotFound(format!("Job {job_id} not found")));
        }

        let filter = job_filter(job_id);
        let displaced = self.knowledge.replace_where(owner_id, &filter, &[]).await?;

        match self.db.delete_job(owner_id, job_id).await {
            Ok(true) => {
                info!(owner_id, job_id, records = displaced.len(), "Job posting deleted");
                Ok(())
            }
            Ok(false) => Err(self
                .roll_back(
                    owner_id,
                    &filter,
                    &displaced,
                    CareerError::NotFound(format!("Job {job_id} not found")),
                )
                .await),
            Err(e) => Err(self.roll_back(owner_id, &filter, &displaced, e).await),
        }
    }

    /// Save (or clear, when blank) the answer and re-index the Q&A pair with
    /// a full delete and reinsert for the question id.
    pub async fn save_answer(
        &self,
        owner_id: &str,
        question_id: &str,
        answer: &str,
    ) -> Result<InterviewQuestion> {
        let mut question = self
            .db
            .get_question(owner_id, question_id)
            .await?
            .ok_or_else(|| CareerError::NotFound(format!("Question {question_id} not found")))?;

        let answer = Some(answer.trim()).filter(|a| !a.is_empty());
        question.answer = answer.map(str::to_string);
        question.updated_at = Utc::now();

        let records = self.indexer.qa_records(owner_id, &question).await?;

        let filter = question_filter(question_id);
        let displaced = self
            .knowledge
            .replace_where(owner_id, &filter, &records)
            .await?;

        match self.db.update_answer(owner_id, question_id, answer).await {
            Ok(true) => {
                info!(owner_id, question_id, chunks = records.len(), "Answer saved");
                Ok(question)
            }
            Ok(false) => Err(self
                .roll_back(
                    owner_id,
                    &filter,
                    &displaced,
                    CareerError::NotFound(format!("Question {question_id} not found")),
                )
                .await),
            Err(e) => Err(self.roll_back(owner_id, &filter, &displaced, e).await),
        }
    }

    pub async fn delete_question(&self, owner_id: &str, question_id: &str) -> Result<()> {
        let question = self
            .db
            .get_question(owner_id, question_id)
            .await?
            .ok_or_else(|| CareerError::NotFound(format!("Question {question_id} not found")))?;

        let filter = question_filter(question_id);
        let snapshot = self.knowledge.get_where(owner_id, &filter).await?;

        let ids = self.indexer.qa_record_ids(&question);
        self.knowledge.delete_by_id(owner_id, &ids).await?;

        match self.db.delete_question(owner_id, question_id).await {
            Ok(_) => {
                info!(owner_id, question_id, records = ids.len(), "Question deleted");
                Ok(())
            }
            Err(e) => Err(self.roll_back(owner_id, &filter, &snapshot, e).await),
        }
    }

    /// Ask the model to split a description into the known sections. Without
    /// a model the whole description becomes the job description section.
    async fn split_job_description(&self, description: &str) -> Result<Vec<JobSection>> {
        let whole = || {
            vec![JobSection {
                kind: JobSectionKind::JobDescription,
                content: description.trim().to_string(),
            }]
        };

        if !self.generation.is_available() {
            return Ok(whole());
        }

        let value = self
            .generation
            .generate_json(&prompts::JOB_SECTIONS, &PromptInput::new("", description))
            .await?;
        let sections = parse_job_sections(&value)?;

        if sections.is_empty() {
            warn!("Model returned no job sections, storing the description whole");
            return Ok(whole());
        }
        Ok(sections)
    }

    async fn roll_back(
        &self,
        owner_id: &str,
        filter: &MetadataFilter,
        displaced: &[KnowledgeRecord],
        cause: CareerError,
    ) -> CareerError {
        warn!(owner_id, error = %cause, "Relational write failed, restoring knowledge records");
        match self.knowledge.restore(owner_id, filter, displaced).await {
            Ok(()) => cause,
            Err(restore_error) => {
                tracing::error!(owner_id, error = %restore_error, "Knowledge restore failed");
                restore_error
            }
        }
    }
}

fn require_owner(owner_id: &str) -> Result<()> {
    if owner_id.trim().is_empty() {
        return Err(CareerError::Validation("ownerId is required".to_string()));
    }
    Ok(())
}

fn job_filter(job_id: &str) -> MetadataFilter {
    MetadataFilter::category(Category::Jobs).eq(META_JOB_ID, job_id)
}

fn question_filter(question_id: &str) -> MetadataFilter {
    MetadataFilter::category(Category::Questions).eq(META_QUESTION_ID, question_id)
}

/// Sections from the model's JSON object, in canonical order. Missing,
/// null and blank entries are skipped; lists of strings are joined by line.
pub fn parse_job_sections(value: &Value) -> Result<Vec<JobSection>> {
    let object = value.as_object().ok_or_else(|| {
        CareerError::MalformedModelOutput("job sections must be a JSON object".to_string())
    })?;

    let mut sections = Vec::new();
    for kind in JobSectionKind::ALL {
        let content = match object.get(kind.key()) {
            None | Some(Value::Null) => continue,
            Some(Value::String(text)) => text.trim().to_string(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::trim).ok_or_else(|| {
                        CareerError::MalformedModelOutput(format!(
                            "job section '{}' contains a non-text item",
                            kind.key()
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?
                .join("\n"),
            Some(other) => {
                return Err(CareerError::MalformedModelOutput(format!(
                    "job section '{}' has unexpected value {other}",
                    kind.key()
                )))
            }
        };
        if !content.is_empty() {
            sections.push(JobSection { kind, content });
        }
    }
    Ok(sections)
}
