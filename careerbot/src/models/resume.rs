use serde::{Deserialize, Serialize};

/// Relational section name holding the whole extracted résumé text.
pub const FULL_RESUME_SECTION: &str = "FULL RESUME";

/// A labeled subdivision of a résumé's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Section {
    pub header: String,
    pub body: String,
}

impl Section {
    pub fn new(header: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            body: body.into(),
        }
    }
}

/// Canonical résumé text as held by the relational store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct StoredResume {
    pub owner_id: String,
    pub full_text: Option<String>,
    pub sections: Vec<Section>,
}

/// Outcome of a résumé upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResumeIngestReport {
    pub owner_id: String,
    pub sections: Vec<String>,
    pub chunks: usize,
    pub characters: usize,
}
