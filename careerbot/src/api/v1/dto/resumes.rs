//! Résumé DTOs for the v1 API.

use serde::{Deserialize, Serialize};

use crate::models::{Section, StoredResume};

/// Multipart form accepted by `POST /v1/resumes:upload`. Documentation only;
/// the handler reads the fields off the multipart stream.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct ResumeUploadForm {
    /// Owner the résumé belongs to.
    pub owner_id: String,
    /// PDF or DOCX file.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

/// The canonical résumé text held for an owner.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResumeResponse {
    pub owner_id: String,
    pub full_text: Option<String>,
    pub sections: Vec<Section>,
}

impl From<StoredResume> for ResumeResponse {
    fn from(resume: StoredResume) -> Self {
        Self {
            owner_id: resume.owner_id,
            full_text: resume.full_text,
            sections: resume.sections,
        }
    }
}
