pub mod chat;
pub mod generation;
pub(crate) mod health;
pub mod jobs;
pub mod questions;
pub mod resumes;

pub use health::health_check;

use serde::Serialize;

use crate::api::v1::response::{ApiResponse, ErrorCode};

/// Rejects requests that do not name an owner.
fn require_owner<T: Serialize>(owner_id: &str) -> Result<(), ApiResponse<T>> {
    if owner_id.trim().is_empty() {
        return Err(ApiResponse::error(
            ErrorCode::InvalidRequest,
            "ownerId is required",
        ));
    }
    Ok(())
}
