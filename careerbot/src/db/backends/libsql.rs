use crate::db::connection::Database;
use crate::db::repository::{
    ArtifactRepository, ConversationRepository, JobRepository, QuestionRepository,
    ResumeRepository,
};
use crate::db::traits::{
    ArtifactStore, ConversationStore, DatabaseBackend, JobStore, MetadataStore, QuestionStore,
    ResumeStore,
};
use crate::db::MetadataRepository;
use crate::error::Result;
use crate::models::{
    ArtifactKind, Chat, ChatMessage, GeneratedArtifact, InterviewQuestion, JobPosting, JobSection,
    Section, StoredResume,
};
use async_trait::async_trait;

pub struct LibSqlBackend {
    db: Database,
}

impl LibSqlBackend {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ResumeStore for LibSqlBackend {
    async fn replace_resume(
        &self,
        owner_id: &str,
        full_text: &str,
        sections: &[Section],
    ) -> Result<()> {
        let conn = self.db.connect()?;
        ResumeRepository::replace(&conn, owner_id, full_text, sections).await
    }
    async fn get_resume(&self, owner_id: &str) -> Result<Option<StoredResume>> {
        let conn = self.db.connect()?;
        ResumeRepository::get(&conn, owner_id).await
    }
}

#[async_trait]
impl JobStore for LibSqlBackend {
    async fn create_job(&self, job: &JobPosting, sections: &[JobSection]) -> Result<()> {
        let conn = self.db.connect()?;
        JobRepository::create(&conn, job, sections).await
    }
    async fn get_job(&self, owner_id: &str, job_id: &str) -> Result<Option<JobPosting>> {
        let conn = self.db.connect()?;
        JobRepository::get(&conn, owner_id, job_id).await
    }
    async fn list_jobs(&self, owner_id: &str) -> Result<Vec<JobPosting>> {
        let conn = self.db.connect()?;
        JobRepository::list(&conn, owner_id).await
    }
    async fn get_job_sections(&self, job_id: &str) -> Result<Vec<JobSection>> {
        let conn = self.db.connect()?;
        JobRepository::sections(&conn, job_id).await
    }
    async fn delete_job(&self, owner_id: &str, job_id: &str) -> Result<bool> {
        let conn = self.db.connect()?;
        JobRepository::delete(&conn, owner_id, job_id).await
    }
}

#[async_trait]
impl QuestionStore for LibSqlBackend {
    async fn create_questions(&self, questions: &[InterviewQuestion]) -> Result<()> {
        let conn = self.db.connect()?;
        QuestionRepository::create_batch(&conn, questions).await
    }
    async fn get_question(
        &self,
        owner_id: &str,
        question_id: &str,
    ) -> Result<Option<InterviewQuestion>> {
        let conn = self.db.connect()?;
        QuestionRepository::get(&conn, owner_id, question_id).await
    }
    async fn list_questions(
        &self,
        owner_id: &str,
        job_id: Option<&str>,
    ) -> Result<Vec<InterviewQuestion>> {
        let conn = self.db.connect()?;
        QuestionRepository::list_for_job(&conn, owner_id, job_id).await
    }
    async fn list_answered_questions(&self, owner_id: &str) -> Result<Vec<InterviewQuestion>> {
        let conn = self.db.connect()?;
        QuestionRepository::list_answered(&conn, owner_id).await
    }
    async fn update_answer(
        &self,
        owner_id: &str,
        question_id: &str,
        answer: Option<&str>,
    ) -> Result<bool> {
        let conn = self.db.connect()?;
        QuestionRepository::update_answer(&conn, owner_id, question_id, answer).await
    }
    async fn set_recommendation(
        &self,
        owner_id: &str,
        question_id: &str,
        recommendation: &str,
    ) -> Result<bool> {
        let conn = self.db.connect()?;
        QuestionRepository::set_recommendation(&conn, owner_id, question_id, recommendation).await
    }
    async fn delete_question(&self, owner_id: &str, question_id: &str) -> Result<bool> {
        let conn = self.db.connect()?;
        QuestionRepository::delete(&conn, owner_id, question_id).await
    }
}

#[async_trait]
impl ConversationStore for LibSqlBackend {
    async fn create_chat(&self, chat: &Chat) -> Result<()> {
        let conn = self.db.connect()?;
        ConversationRepository::create_chat(&conn, chat).await
    }
    async fn get_chat(&self, owner_id: &str, chat_id: &str) -> Result<Option<Chat>> {
        let conn = self.db.connect()?;
        ConversationRepository::get_chat(&conn, owner_id, chat_id).await
    }
    async fn append_message(&self, message: &ChatMessage) -> Result<()> {
        let conn = self.db.connect()?;
        ConversationRepository::append_message(&conn, message).await
    }
    async fn list_messages(&self, owner_id: &str, chat_id: &str) -> Result<Vec<ChatMessage>> {
        let conn = self.db.connect()?;
        ConversationRepository::list_messages(&conn, owner_id, chat_id).await
    }
}

#[async_trait]
impl ArtifactStore for LibSqlBackend {
    async fn save_artifact(&self, artifact: &GeneratedArtifact) -> Result<()> {
        let conn = self.db.connect()?;
        ArtifactRepository::save(&conn, artifact).await
    }
    async fn list_artifacts(
        &self,
        owner_id: &str,
        job_id: &str,
        kind: ArtifactKind,
    ) -> Result<Vec<GeneratedArtifact>> {
        let conn = self.db.connect()?;
        ArtifactRepository::list(&conn, owner_id, job_id, kind).await
    }
}

#[async_trait]
impl MetadataStore for LibSqlBackend {
    async fn get_embedding_dimensions(&self) -> Result<Option<usize>> {
        let conn = self.db.connect()?;
        MetadataRepository::get_embedding_dimensions(&conn).await
    }
    async fn set_embedding_dimensions(&self, dims: usize) -> Result<()> {
        let conn = self.db.connect()?;
        MetadataRepository::set_embedding_dimensions(&conn, dims).await
    }
}

#[async_trait]
impl DatabaseBackend for LibSqlBackend {
    async fn sync(&self) -> Result<()> {
        self.db.sync().await
    }

    async fn list_owners(&self) -> Result<Vec<String>> {
        let conn = self.db.connect()?;
        ResumeRepository::list_owners(&conn).await
    }
}
