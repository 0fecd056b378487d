//! Job posting DTOs for the v1 API.

use serde::Deserialize;

use crate::models::NewJobPosting;

/// Request body for `POST /v1/jobs`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub owner_id: String,
    pub title: String,
    pub company: String,
    /// Full posting text; split into sections when a model is configured.
    pub description: String,
    #[serde(default)]
    pub post_url: Option<String>,
    /// Application status, `"saved"` when omitted.
    #[serde(default)]
    pub status: Option<String>,
}

impl CreateJobRequest {
    pub fn into_parts(self) -> (String, NewJobPosting) {
        (
            self.owner_id,
            NewJobPosting {
                title: self.title,
                company: self.company,
                description: self.description,
                post_url: self.post_url,
                status: self.status,
            },
        )
    }
}
