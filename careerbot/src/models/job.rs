use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub company: String,
    pub description: String,
    pub status: String,
    pub post_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewJobPosting {
    pub title: String,
    pub company: String,
    pub description: String,
    #[serde(default)]
    pub post_url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Named parts a job description is split into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobSectionKind {
    CompanyDescription,
    JobDescription,
    Responsibilities,
    Qualifications,
    Compensation,
}

impl JobSectionKind {
    pub const ALL: [JobSectionKind; 5] = [
        Self::CompanyDescription,
        Self::JobDescription,
        Self::Responsibilities,
        Self::Qualifications,
        Self::Compensation,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::CompanyDescription => "company_description",
            Self::JobDescription => "job_description",
            Self::Responsibilities => "responsibilities",
            Self::Qualifications => "qualifications",
            Self::Compensation => "compensation",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::CompanyDescription => "Company Description",
            Self::JobDescription => "Job Description",
            Self::Responsibilities => "Responsibilities",
            Self::Qualifications => "Qualifications",
            Self::Compensation => "Compensation",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct JobSection {
    pub kind: JobSectionKind,
    pub content: String,
}

impl JobSection {
    /// Text that gets chunked and embedded for this section.
    pub fn composite_text(&self) -> String {
        format!("{}: {}", self.kind.title(), self.content)
    }
}

/// A posting together with its sections.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobDetails {
    #[serde(flatten)]
    pub job: JobPosting,
    pub sections: Vec<JobSection>,
}
