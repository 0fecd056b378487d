use std::sync::Arc;

use crate::embeddings::EmbeddingProvider;
use crate::knowledge::KnowledgeStore;
use crate::models::{Category, MetadataFilter, META_JOB_ID};

pub const RESUME_LABEL: &str = "Information from the user's résumé:";
pub const JOB_LABEL: &str = "Information from the job posting:";
pub const ANSWERS_LABEL: &str = "Previously saved interview answers:";

/// One retrieval category, in priority order within a request.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextCategory {
    pub category: Category,
    pub label: String,
    pub top_k: usize,
    pub job_id: Option<String>,
}

impl ContextCategory {
    pub fn resume(top_k: usize) -> Self {
        Self {
            category: Category::Resume,
            label: RESUME_LABEL.to_string(),
            top_k,
            job_id: None,
        }
    }

    pub fn job(top_k: usize, job_id: Option<&str>) -> Self {
        Self {
            category: Category::Jobs,
            label: JOB_LABEL.to_string(),
            top_k,
            job_id: job_id.map(str::to_string),
        }
    }

    pub fn answers(top_k: usize) -> Self {
        Self {
            category: Category::Questions,
            label: ANSWERS_LABEL.to_string(),
            top_k,
            job_id: None,
        }
    }

    pub fn filter(&self) -> MetadataFilter {
        let filter = MetadataFilter::category(self.category);
        match &self.job_id {
            Some(job_id) => filter.eq(META_JOB_ID, job_id.as_str()),
            None => filter,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextBlock {
    pub category: Category,
    pub label: String,
    pub passages: Vec<String>,
}

impl ContextBlock {
    fn render(&self) -> String {
        format!("{}\n{}", self.label, self.passages.join("\n\n"))
    }
}

/// Retrieved passages grouped by category, highest priority first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssembledContext {
    blocks: Vec<ContextBlock>,
}

impl AssembledContext {
    pub fn new(blocks: Vec<ContextBlock>) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> &[ContextBlock] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn render(&self) -> String {
        self.blocks
            .iter()
            .map(ContextBlock::render)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn char_len(&self) -> usize {
        self.render().chars().count()
    }

    /// Shrink the rendered context to at most `max_chars`, trimming from the
    /// lowest-priority block. A block left without text loses its header too.
    pub fn truncate(&mut self, max_chars: usize) {
        loop {
            let len = self.char_len();
            if len <= max_chars {
                return;
            }
            let excess = len - max_chars;

            let Some(block) = self.blocks.last_mut() else {
                return;
            };
            let Some(passage) = block.passages.last_mut() else {
                self.blocks.pop();
                continue;
            };

            let passage_len = passage.chars().count();
            if passage_len <= excess {
                block.passages.pop();
                if block.passages.is_empty() {
                    self.blocks.pop();
                }
            } else {
                *passage = passage.chars().take(passage_len - excess).collect();
            }
        }
    }
}

/// Builds bounded prompt context from an owner's knowledge.
///
/// Failures on this read path never propagate: a failed embedding yields an
/// empty context and a failed category query drops that block.
#[derive(Clone)]
pub struct ContextAssembler {
    embeddings: EmbeddingProvider,
    knowledge: Arc<dyn KnowledgeStore>,
    max_chars: usize,
}

impl ContextAssembler {
    pub fn new(
        embeddings: EmbeddingProvider,
        knowledge: Arc<dyn KnowledgeStore>,
        max_chars: usize,
    ) -> Self {
        Self {
            embeddings,
            knowledge,
            max_chars,
        }
    }

    pub async fn assemble(
        &self,
        owner_id: &str,
        query: &str,
        categories: &[ContextCategory],
    ) -> AssembledContext {
        if categories.iter().all(|c| c.top_k == 0) {
            return AssembledContext::default();
        }

        let vector = match self.embeddings.embed(query).await {
            Ok(vector) => vector,
            Err(e) => {
                tracing::warn!(owner_id, error = %e, "Query embedding failed, continuing without context");
                return AssembledContext::default();
            }
        };

        let mut blocks = Vec::new();
        for category in categories.iter().filter(|c| c.top_k > 0) {
            match self
                .knowledge
                .query(owner_id, &vector, category.top_k, &category.filter())
                .await
            {
                Ok(results) if results.is_empty() => {
                    tracing::debug!(owner_id, category = %category.category, "No matching passages");
                }
                Ok(results) => blocks.push(ContextBlock {
                    category: category.category,
                    label: category.label.clone(),
                    passages: results.into_iter().map(|r| r.record.text).collect(),
                }),
                Err(e) => {
                    tracing::warn!(
                        owner_id,
                        category = %category.category,
                        error = %e,
                        "Context query failed, omitting category"
                    );
                }
            }
        }

        let mut context = AssembledContext::new(blocks);
        context.truncate(self.max_chars);
        context
    }

    /// [`assemble`](Self::assemble) rendered to prompt text.
    pub async fn assemble_context(
        &self,
        owner_id: &str,
        query: &str,
        categories: &[ContextCategory],
    ) -> String {
        self.assemble(owner_id, query, categories).await.render()
    }
}
