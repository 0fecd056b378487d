pub mod api;
pub mod config;
pub mod db;
pub mod embeddings;
pub mod error;
pub mod knowledge;
pub mod llm;
pub mod migration;
pub mod models;
pub mod processing;
pub mod services;
