use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::config::RetrievalConfig;
use crate::db::DatabaseBackend;
use crate::error::{CareerError, Result};
use crate::llm::prompts::{self, exclusion_clause};
use crate::models::{
    AnswerHelp, AnswerHelpStage, AnswerRecommendation, ArtifactKind, Chat, ChatMessage,
    ChatReply, ChatRequest, GeneratedArtifact, InterviewQuestion, JobPosting, MessageRole,
    QuestionKind, Turn,
};
use crate::services::context::{ContextAssembler, ContextCategory};
use crate::services::generation::{parse_string_list, GenerationOrchestrator, PromptInput};
use crate::services::sessions::{SessionHandle, SessionRegistry};

const DEFAULT_QUESTION_COUNT: usize = 3;
const MAX_QUESTION_COUNT: usize = 10;
const CHAT_NAME_CHARS: usize = 60;
const DEFAULT_FIRST_NAME: &str = "the user";

/// Generation flows: chat, answer help, interview questions, cover letters
/// and résumé recommendations.
pub struct CareerService {
    db: Arc<dyn DatabaseBackend>,
    context: ContextAssembler,
    generation: Arc<GenerationOrchestrator>,
    sessions: Arc<SessionRegistry>,
    retrieval: RetrievalConfig,
}

impl CareerService {
    pub fn new(
        db: Arc<dyn DatabaseBackend>,
        context: ContextAssembler,
        generation: Arc<GenerationOrchestrator>,
        sessions: Arc<SessionRegistry>,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            db,
            context,
            generation,
            sessions,
            retrieval,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// One chat turn. The session's lock is held from retrieval until the
    /// turn is appended, so turns of one session never interleave.
    pub async fn chat(&self, owner_id: &str, request: ChatRequest) -> Result<ChatReply> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(CareerError::Validation("message is required".to_string()));
        }

        let handle = self
            .resolve_session(owner_id, request.session_id.as_deref())
            .await;
        let mut state = handle.lock().await;

        let mut categories = vec![ContextCategory::resume(self.retrieval.resume_top_k)];
        if let Some(job_id) = request.job_id.as_deref() {
            categories.push(ContextCategory::job(self.retrieval.job_top_k, Some(job_id)));
        }
        categories.push(ContextCategory::answers(self.retrieval.answer_top_k));

        let context = self
            .context
            .assemble_context(owner_id, message, &categories)
            .await;

        let first_name = request
            .first_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_FIRST_NAME);

        let reply = self
            .generation
            .generate_text(
                &prompts::CHAT,
                &PromptInput::new(&context, message)
                    .with_history(&state.turns)
                    .var("first_name", first_name),
            )
            .await?;

        let chat_id = match &state.chat_id {
            Some(chat_id) => chat_id.clone(),
            None => {
                let chat = Chat {
                    id: nanoid::nanoid!(),
                    owner_id: owner_id.to_string(),
                    name: message.chars().take(CHAT_NAME_CHARS).collect(),
                    created_at: Utc::now(),
                };
                self.db.create_chat(&chat).await?;
                state.chat_id = Some(chat.id.clone());
                chat.id
            }
        };

        self.db
            .append_message(&ChatMessage::new(&chat_id, owner_id, MessageRole::User, message))
            .await?;
        self.db
            .append_message(&ChatMessage::new(
                &chat_id,
                owner_id,
                MessageRole::Assistant,
                &reply,
            ))
            .await?;

        state.push_turn(Turn {
            user: message.to_string(),
            assistant: reply.clone(),
        });

        debug!(owner_id, session_id = handle.id(), turns = state.turns.len(), "Chat turn complete");

        Ok(ChatReply {
            session_id: handle.id().to_string(),
            chat_id,
            reply,
        })
    }

    pub async fn chat_messages(&self, owner_id: &str, chat_id: &str) -> Result<Vec<ChatMessage>> {
        if self.db.get_chat(owner_id, chat_id).await?.is_none() {
            return Err(CareerError::NotFound(format!("Chat {chat_id} not found")));
        }
        self.db.list_messages(owner_id, chat_id).await
    }

    pub fn expire_session(&self, session_id: &str) -> bool {
        self.sessions.expire_session(session_id)
    }

    /// Draft an answer, or refine `existing_answer` when one is given, and
    /// store the model's recommendation. Nothing is written unless the
    /// model's output parses.
    pub async fn answer_help(
        &self,
        owner_id: &str,
        question_id: &str,
        existing_answer: Option<&str>,
    ) -> Result<AnswerHelp> {
        let question = self.require_question(owner_id, question_id).await?;

        let stage = AnswerHelpStage::for_existing_answer(existing_answer);
        let template = match stage {
            AnswerHelpStage::Drafted => &prompts::ANSWER_DRAFT,
            AnswerHelpStage::Refined => &prompts::ANSWER_REFINE,
        };

        let mut categories = vec![ContextCategory::resume(self.retrieval.resume_top_k)];
        if let Some(job_id) = question.job_id.as_deref() {
            categories.push(ContextCategory::job(self.retrieval.job_top_k, Some(job_id)));
        }
        categories.push(ContextCategory::answers(self.retrieval.answer_top_k));

        let context = self
            .context
            .assemble_context(owner_id, &question.question, &categories)
            .await;

        let existing = existing_answer.map(str::trim).unwrap_or_default();
        let output: AnswerRecommendation = self
            .generation
            .generate_structured(
                template,
                &PromptInput::new(&context, &question.question).var("answer", existing),
            )
            .await?;

        if !self
            .db
            .set_recommendation(owner_id, question_id, &output.recommendation)
            .await?
        {
            return Err(CareerError::NotFound(format!(
                "Question {question_id} not found"
            )));
        }

        info!(owner_id, question_id, stage = ?stage, "Answer help generated");

        Ok(AnswerHelp {
            question_id: question_id.to_string(),
            stage,
            answer: output.answer,
            recommendation: output.recommendation,
        })
    }

    /// Generate and store new interview questions, avoiding ones the owner
    /// already has for the same job.
    pub async fn generate_questions(
        &self,
        owner_id: &str,
        job_id: Option<&str>,
        kind: QuestionKind,
        count: Option<usize>,
    ) -> Result<Vec<InterviewQuestion>> {
        let count = count
            .unwrap_or(DEFAULT_QUESTION_COUNT)
            .clamp(1, MAX_QUESTION_COUNT)
            .to_string();

        let existing: Vec<String> = self
            .db
            .list_questions(owner_id, job_id)
            .await?
            .into_iter()
            .map(|q| q.question)
            .collect();
        let exclusions = exclusion_clause(&existing);

        let raw = match kind {
            QuestionKind::WorkExperience => {
                let full_text = self
                    .db
                    .get_resume(owner_id)
                    .await?
                    .and_then(|r| r.full_text)
                    .ok_or_else(|| {
                        CareerError::NotFound(format!("No résumé uploaded for {owner_id}"))
                    })?;
                let context: String = full_text
                    .chars()
                    .take(self.retrieval.max_context_chars)
                    .collect();

                self.generation
                    .generate_text(
                        &prompts::QUESTIONS_WORK_EXPERIENCE,
                        &PromptInput::new(&context, "")
                            .var("count", &count)
                            .var("exclusions", &exclusions),
                    )
                    .await?
            }
            QuestionKind::Role => {
                let job_id = job_id.ok_or_else(|| {
                    CareerError::Validation("jobId is required for role questions".to_string())
                })?;
                let job = self.require_job(owner_id, job_id).await?;

                let categories = [
                    ContextCategory::job(self.retrieval.job_top_k, Some(job_id)),
                    ContextCategory::resume(self.retrieval.resume_top_k),
                ];
                let context = self
                    .context
                    .assemble_context(owner_id, &job_query(&job), &categories)
                    .await;

                self.generation
                    .generate_text(
                        &prompts::QUESTIONS_ROLE,
                        &PromptInput::new(&context, "")
                            .var("job_title", &job.title)
                            .var("company", &job.company)
                            .var("count", &count)
                            .var("exclusions", &exclusions),
                    )
                    .await?
            }
        };

        let mut seen: Vec<String> = existing.iter().map(|q| q.to_lowercase()).collect();
        let mut questions = Vec::new();
        for text in parse_string_list(&raw)? {
            let key = text.to_lowercase();
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);
            questions.push(InterviewQuestion::new(owner_id, job_id, text));
        }

        self.db.create_questions(&questions).await?;
        info!(owner_id, kind = ?kind, created = questions.len(), "Interview questions generated");
        Ok(questions)
    }

    pub async fn generate_cover_letter(
        &self,
        owner_id: &str,
        job_id: &str,
    ) -> Result<GeneratedArtifact> {
        self.generate_artifact(owner_id, job_id, ArtifactKind::CoverLetter)
            .await
    }

    pub async fn generate_recommendations(
        &self,
        owner_id: &str,
        job_id: &str,
    ) -> Result<GeneratedArtifact> {
        self.generate_artifact(owner_id, job_id, ArtifactKind::ResumeRecommendation)
            .await
    }

    async fn generate_artifact(
        &self,
        owner_id: &str,
        job_id: &str,
        kind: ArtifactKind,
    ) -> Result<GeneratedArtifact> {
        let job = self.require_job(owner_id, job_id).await?;

        let categories = [
            ContextCategory::resume(self.retrieval.resume_top_k),
            ContextCategory::job(self.retrieval.job_top_k, Some(job_id)),
        ];
        let context = self
            .context
            .assemble_context(owner_id, &job_query(&job), &categories)
            .await;

        let template = match kind {
            ArtifactKind::CoverLetter => &prompts::COVER_LETTER,
            ArtifactKind::ResumeRecommendation => &prompts::RESUME_RECOMMENDATIONS,
        };
        let content = self
            .generation
            .generate_text(
                template,
                &PromptInput::new(&context, "")
                    .var("job_title", &job.title)
                    .var("company", &job.company),
            )
            .await?;

        let artifact = GeneratedArtifact {
            id: nanoid::nanoid!(),
            owner_id: owner_id.to_string(),
            job_id: job_id.to_string(),
            kind,
            content,
            created_at: Utc::now(),
        };
        self.db.save_artifact(&artifact).await?;

        info!(owner_id, job_id, kind = ?kind, "Artifact generated");
        Ok(artifact)
    }

    /// The caller's session, or a new one when the id is unknown, expired
    /// or belongs to another owner.
    async fn resolve_session(&self, owner_id: &str, session_id: Option<&str>) -> SessionHandle {
        if let Some(handle) = session_id.and_then(|id| self.sessions.get_session(id)) {
            if handle.lock().await.owner_id == owner_id {
                return handle;
            }
        }
        self.sessions.create_session(owner_id)
    }

    async fn require_question(&self, owner_id: &str, question_id: &str) -> Result<InterviewQuestion> {
        self.db
            .get_question(owner_id, question_id)
            .await?
            .ok_or_else(|| CareerError::NotFound(format!("Question {question_id} not found")))
    }

    async fn require_job(&self, owner_id: &str, job_id: &str) -> Result<JobPosting> {
        self.db
            .get_job(owner_id, job_id)
            .await?
            .ok_or_else(|| CareerError::NotFound(format!("Job {job_id} not found")))
    }
}

/// Retrieval query for job-centred flows.
fn job_query(job: &JobPosting) -> String {
    let description: String = job.description.chars().take(1000).collect();
    format!("{} at {}\n{}", job.title, job.company, description)
}
