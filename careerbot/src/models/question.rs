use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InterviewQuestion {
    pub id: String,
    pub owner_id: String,
    pub job_id: Option<String>,
    pub question: String,
    pub answer: Option<String>,
    pub recommendation: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InterviewQuestion {
    pub fn new(owner_id: &str, job_id: Option<&str>, question: String) -> Self {
        let now = Utc::now();
        Self {
            id: nanoid::nanoid!(),
            owner_id: owner_id.to_string(),
            job_id: job_id.map(str::to_string),
            question,
            answer: None,
            recommendation: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn saved_answer(&self) -> Option<&str> {
        self.answer.as_deref().filter(|a| !a.trim().is_empty())
    }

    /// The Q&A pair as indexed in the knowledge store.
    pub fn qa_text(&self) -> Option<String> {
        self.saved_answer()
            .map(|answer| format!("Question: {}\nAnswer: {}", self.question, answer))
    }
}

/// What the generated interview questions should draw on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    WorkExperience,
    Role,
}

/// Structured response of the answer-help flows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AnswerRecommendation {
    pub answer: String,
    pub recommendation: String,
}

/// Result of an answer-help call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerHelp {
    pub question_id: String,
    pub stage: AnswerHelpStage,
    pub answer: String,
    pub recommendation: String,
}

/// Answer-help state reached by a successful call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnswerHelpStage {
    /// No answer existed; the model proposed one.
    Drafted,
    /// The model revised the user's existing answer.
    Refined,
}

impl AnswerHelpStage {
    pub fn for_existing_answer(existing: Option<&str>) -> Self {
        match existing {
            Some(answer) if !answer.trim().is_empty() => Self::Refined,
            _ => Self::Drafted,
        }
    }
}
