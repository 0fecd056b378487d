use crate::config::ProcessingConfig;
use crate::embeddings::EmbeddingProvider;
use crate::error::Result;
use crate::knowledge::{job_record_id, qa_record_id, resume_record_id};
use crate::models::{
    Category, InterviewQuestion, JobSection, KnowledgeRecord, Metadata, MetadataValue,
    META_CATEGORY, META_CHUNK_INDEX, META_JOB_ID, META_OWNER, META_QUESTION_ID, META_SECTION,
};
use crate::processing::{LocatedSection, SectionSplitter, TextChunker};

/// A chunk waiting for its embedding.
struct PendingRecord {
    id: String,
    text: String,
    metadata: Metadata,
}

/// Turns canonical text into embedded knowledge records.
///
/// Every chunk is embedded before any record is returned, so a provider
/// failure surfaces before the caller writes anything.
pub struct KnowledgeIndexer {
    embeddings: EmbeddingProvider,
    chunker: TextChunker,
    qa_chunker: TextChunker,
    splitter: SectionSplitter,
}

impl KnowledgeIndexer {
    pub fn new(embeddings: EmbeddingProvider, config: &ProcessingConfig) -> Result<Self> {
        Ok(Self {
            embeddings,
            chunker: TextChunker::from_config(config)?,
            qa_chunker: TextChunker::for_qa(config)?,
            splitter: SectionSplitter::new(),
        })
    }

    pub fn embeddings(&self) -> &EmbeddingProvider {
        &self.embeddings
    }

    /// Chunks are tagged with the section header they start under.
    pub async fn resume_records(
        &self,
        owner_id: &str,
        full_text: &str,
    ) -> Result<Vec<KnowledgeRecord>> {
        let sections = self.splitter.split_located(full_text);
        let starts = section_starts(full_text, &sections);

        let pending = self
            .chunker
            .chunk(full_text)
            .into_iter()
            .map(|chunk| {
                let mut metadata = base_metadata(owner_id, Category::Resume, chunk.index);
                if let Some(header) = section_at(&starts, chunk.start) {
                    metadata.insert(META_SECTION.to_string(), header.into());
                }
                PendingRecord {
                    id: resume_record_id(chunk.index),
                    text: chunk.content,
                    metadata,
                }
            })
            .collect();

        self.embed(pending).await
    }

    pub async fn job_records(
        &self,
        owner_id: &str,
        job_id: &str,
        sections: &[JobSection],
    ) -> Result<Vec<KnowledgeRecord>> {
        let mut pending = Vec::new();
        for section in sections.iter().filter(|s| !s.content.trim().is_empty()) {
            for chunk in self.chunker.chunk(&section.composite_text()) {
                let mut metadata = base_metadata(owner_id, Category::Jobs, chunk.index);
                metadata.insert(META_JOB_ID.to_string(), job_id.into());
                metadata.insert(META_SECTION.to_string(), section.kind.key().into());
                pending.push(PendingRecord {
                    id: job_record_id(job_id, section.kind.key(), chunk.index),
                    text: chunk.content,
                    metadata,
                });
            }
        }

        self.embed(pending).await
    }

    /// Records for a saved Q&A pair; none when the question is unanswered.
    pub async fn qa_records(
        &self,
        owner_id: &str,
        question: &InterviewQuestion,
    ) -> Result<Vec<KnowledgeRecord>> {
        let Some(text) = question.qa_text() else {
            return Ok(Vec::new());
        };

        let pending = self
            .qa_chunker
            .chunk(&text)
            .into_iter()
            .map(|chunk| {
                let mut metadata = base_metadata(owner_id, Category::Questions, chunk.index);
                metadata.insert(META_QUESTION_ID.to_string(), question.id.as_str().into());
                if let Some(job_id) = &question.job_id {
                    metadata.insert(META_JOB_ID.to_string(), job_id.as_str().into());
                }
                PendingRecord {
                    id: qa_record_id(&question.id, chunk.index),
                    text: chunk.content,
                    metadata,
                }
            })
            .collect();

        self.embed(pending).await
    }

    /// Ids the stored answer of `question` was indexed under.
    pub fn qa_record_ids(&self, question: &InterviewQuestion) -> Vec<String> {
        let count = question
            .qa_text()
            .map(|text| self.qa_chunker.count(&text))
            .unwrap_or(0);
        (0..count).map(|n| qa_record_id(&question.id, n)).collect()
    }

    async fn embed(&self, pending: Vec<PendingRecord>) -> Result<Vec<KnowledgeRecord>> {
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = pending.iter().map(|p| p.text.clone()).collect();
        let vectors = self.embeddings.embed_batch(&texts).await?;

        Ok(pending
            .into_iter()
            .zip(vectors)
            .map(|(p, vector)| KnowledgeRecord {
                id: p.id,
                vector,
                text: p.text,
                metadata: p.metadata,
            })
            .collect())
    }
}

fn base_metadata(owner_id: &str, category: Category, chunk_index: usize) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert(META_CATEGORY.to_string(), category.into());
    metadata.insert(META_OWNER.to_string(), owner_id.into());
    metadata.insert(META_CHUNK_INDEX.to_string(), MetadataValue::from(chunk_index));
    metadata
}

/// Character offset of each section header in `full_text`, in order.
fn section_starts<'a>(full_text: &str, sections: &'a [LocatedSection]) -> Vec<(usize, &'a str)> {
    sections
        .iter()
        .filter_map(|located| {
            let prefix = full_text.get(..located.offset)?;
            Some((prefix.chars().count(), located.section.header.as_str()))
        })
        .collect()
}

fn section_at<'a>(starts: &[(usize, &'a str)], char_offset: usize) -> Option<&'a str> {
    starts
        .iter()
        .take_while(|(start, _)| *start <= char_offset)
        .last()
        .map(|(_, header)| *header)
}
