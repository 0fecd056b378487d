mod artifacts;
mod conversations;
mod jobs;
mod questions;
mod resumes;

pub use artifacts::ArtifactRepository;
pub use conversations::ConversationRepository;
pub use jobs::JobRepository;
pub use questions::QuestionRepository;
pub use resumes::ResumeRepository;

use chrono::{DateTime, Utc};

pub(crate) fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
