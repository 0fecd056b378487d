//! v1 API Data Transfer Objects.
//!
//! Wire types for request bodies and the responses that do not map one to
//! one onto a domain model. Domain models that already carry the v1 wire
//! shape (`JobDetails`, `InterviewQuestion`, `ChatReply`, ...) are returned
//! as they are.

pub mod chat;
pub mod common;
pub mod generation;
pub mod jobs;
pub mod questions;
pub mod resumes;

pub use chat::*;
pub use common::*;
pub use generation::*;
pub use jobs::*;
pub use questions::*;
pub use resumes::*;
