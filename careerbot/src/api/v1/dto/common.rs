//! Shared DTO types used across multiple v1 API endpoints.

use serde::{Deserialize, Serialize};

/// `?ownerId=` query parameter scoping a lookup to one user's data.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct OwnerQuery {
    pub owner_id: String,
}

/// Body naming the owner a command applies to.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OwnerRequest {
    pub owner_id: String,
}

/// Acknowledgement for delete endpoints.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeletedResponse {
    pub id: String,
    pub deleted: bool,
}

impl DeletedResponse {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            deleted: true,
        }
    }
}
