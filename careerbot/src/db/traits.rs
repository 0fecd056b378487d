use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    ArtifactKind, Chat, ChatMessage, GeneratedArtifact, InterviewQuestion, JobPosting, JobSection,
    Section, StoredResume,
};

// ---------------------------------------------------------------------------
// Individual store traits
// ---------------------------------------------------------------------------

/// Canonical résumé text and sections, one version per owner.
#[async_trait]
pub trait ResumeStore: Send + Sync {
    /// Atomically replace the owner's full text and sections.
    async fn replace_resume(&self, owner_id: &str, full_text: &str, sections: &[Section])
        -> Result<()>;
    async fn get_resume(&self, owner_id: &str) -> Result<Option<StoredResume>>;
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a posting with its sections in one transaction.
    async fn create_job(&self, job: &JobPosting, sections: &[JobSection]) -> Result<()>;
    async fn get_job(&self, owner_id: &str, job_id: &str) -> Result<Option<JobPosting>>;
    async fn list_jobs(&self, owner_id: &str) -> Result<Vec<JobPosting>>;
    async fn get_job_sections(&self, job_id: &str) -> Result<Vec<JobSection>>;
    async fn delete_job(&self, owner_id: &str, job_id: &str) -> Result<bool>;
}

#[async_trait]
pub trait QuestionStore: Send + Sync {
    async fn create_questions(&self, questions: &[InterviewQuestion]) -> Result<()>;
    async fn get_question(&self, owner_id: &str, question_id: &str)
        -> Result<Option<InterviewQuestion>>;
    async fn list_questions(&self, owner_id: &str, job_id: Option<&str>)
        -> Result<Vec<InterviewQuestion>>;
    async fn list_answered_questions(&self, owner_id: &str) -> Result<Vec<InterviewQuestion>>;
    async fn update_answer(&self, owner_id: &str, question_id: &str, answer: Option<&str>)
        -> Result<bool>;
    async fn set_recommendation(
        &self,
        owner_id: &str,
        question_id: &str,
        recommendation: &str,
    ) -> Result<bool>;
    async fn delete_question(&self, owner_id: &str, question_id: &str) -> Result<bool>;
}

/// Persisted mirror of chat sessions.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn create_chat(&self, chat: &Chat) -> Result<()>;
    async fn get_chat(&self, owner_id: &str, chat_id: &str) -> Result<Option<Chat>>;
    async fn append_message(&self, message: &ChatMessage) -> Result<()>;
    async fn list_messages(&self, owner_id: &str, chat_id: &str) -> Result<Vec<ChatMessage>>;
}

/// Cover letters and résumé recommendations.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn save_artifact(&self, artifact: &GeneratedArtifact) -> Result<()>;
    async fn list_artifacts(
        &self,
        owner_id: &str,
        job_id: &str,
        kind: ArtifactKind,
    ) -> Result<Vec<GeneratedArtifact>>;
}

/// Key-value metadata store (e.g. embedding dimensions).
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get_embedding_dimensions(&self) -> Result<Option<usize>>;
    async fn set_embedding_dimensions(&self, dims: usize) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Unified backend supertrait
// ---------------------------------------------------------------------------

/// The relational collaborator: every store trait plus lifecycle operations.
#[async_trait]
pub trait DatabaseBackend:
    ResumeStore + JobStore + QuestionStore + ConversationStore + ArtifactStore + MetadataStore
{
    /// Sync with remote (e.g. Turso replication). No-op for local-only backends.
    async fn sync(&self) -> Result<()>;

    /// Owners that have any canonical content.
    async fn list_owners(&self) -> Result<Vec<String>>;
}
