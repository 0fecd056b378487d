use serde::Deserialize;
use std::env;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub embeddings: EmbeddingsConfig,
    pub processing: ProcessingConfig,
    pub knowledge: KnowledgeConfig,
    pub retrieval: RetrievalConfig,
    pub sessions: SessionConfig,
    pub llm: Option<LlmConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub auth_token: Option<String>,
    pub local_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingsConfig {
    pub model: String,
    pub dimensions: usize,
    pub batch_size: usize,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Window size for single question/answer pairs.
    pub qa_chunk_size: usize,
    pub pdf_x_tolerance: f32,
    pub pdf_y_tolerance: f32,
}

/// Which knowledge store implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeBackendKind {
    LibSql,
    Remote,
    Memory,
}

impl std::str::FromStr for KnowledgeBackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "libsql" | "local" => Ok(Self::LibSql),
            "remote" | "pinecone" => Ok(Self::Remote),
            "memory" | "in-memory" => Ok(Self::Memory),
            other => Err(format!("unknown knowledge backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeConfig {
    pub backend: KnowledgeBackendKind,
    pub remote_url: Option<String>,
    pub remote_api_key: Option<String>,
    pub remote_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    pub max_context_chars: usize,
    pub resume_top_k: usize,
    pub job_top_k: usize,
    pub answer_top_k: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Prior turns rendered into the prompt.
    pub history_turns: usize,
    pub idle_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

/// LLM configuration for chat/completion models
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("CAREERBOT_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("CAREERBOT_PORT", 3000),
                max_upload_bytes: parse_env_or("CAREERBOT_MAX_UPLOAD_BYTES", 10 * 1024 * 1024),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "file:careerbot.db".to_string()),
                auth_token: env::var("DATABASE_AUTH_TOKEN").ok(),
                local_path: env::var("DATABASE_LOCAL_PATH").ok(),
            },
            embeddings: EmbeddingsConfig {
                model: env::var("EMBEDDING_MODEL")
                    .unwrap_or_else(|_| "BAAI/bge-small-en-v1.5".to_string()),
                dimensions: parse_env_or("EMBEDDING_DIMENSIONS", 384),
                batch_size: parse_env_or("EMBEDDING_BATCH_SIZE", 64),
                api_key: env::var("EMBEDDING_API_KEY").ok(),
                base_url: env::var("EMBEDDING_BASE_URL").ok(),
                timeout_secs: parse_env_or("EMBEDDING_TIMEOUT", 30),
                max_retries: parse_env_or("EMBEDDING_MAX_RETRIES", 2),
            },
            processing: ProcessingConfig {
                chunk_size: parse_env_or("CHUNK_SIZE", 500),
                chunk_overlap: parse_env_or("CHUNK_OVERLAP", 20),
                qa_chunk_size: parse_env_or("QA_CHUNK_SIZE", 5000),
                pdf_x_tolerance: parse_env_or("PDF_X_TOLERANCE", 3.0),
                pdf_y_tolerance: parse_env_or("PDF_Y_TOLERANCE", 1.5),
            },
            knowledge: KnowledgeConfig {
                backend: parse_env_or("KNOWLEDGE_BACKEND", KnowledgeBackendKind::LibSql),
                remote_url: env::var("KNOWLEDGE_REMOTE_URL").ok(),
                remote_api_key: env::var("KNOWLEDGE_REMOTE_API_KEY").ok(),
                remote_timeout_secs: parse_env_or("KNOWLEDGE_REMOTE_TIMEOUT", 30),
            },
            retrieval: RetrievalConfig {
                max_context_chars: parse_env_or("CONTEXT_MAX_CHARS", 12_000),
                resume_top_k: parse_env_or("RESUME_TOP_K", 4),
                job_top_k: parse_env_or("JOB_TOP_K", 4),
                answer_top_k: parse_env_or("ANSWER_TOP_K", 3),
            },
            sessions: SessionConfig {
                history_turns: parse_env_or("SESSION_HISTORY_TURNS", 2),
                idle_ttl_secs: parse_env_or("SESSION_IDLE_TTL_SECS", 3600),
                sweep_interval_secs: parse_env_or("SESSION_SWEEP_INTERVAL_SECS", 300),
            },
            llm: env::var("LLM_MODEL").ok().map(|model| LlmConfig {
                model,
                api_key: env::var("LLM_API_KEY").ok(),
                base_url: env::var("LLM_BASE_URL").ok(),
                timeout_secs: parse_env_or("LLM_TIMEOUT", 60),
                max_retries: parse_env_or("LLM_MAX_RETRIES", 2),
            }),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

/// Known embedding providers that use OpenAI-compatible APIs
const KNOWN_PROVIDERS: &[&str] = &["openai", "openrouter", "ollama", "lmstudio", "local"];

/// Known LLM providers that use OpenAI-compatible APIs
pub const KNOWN_LLM_PROVIDERS: &[&str] = &["openai", "openrouter", "ollama", "lmstudio"];

/// Parse a model name into (provider, model) tuple.
pub fn parse_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        let prefix_lower = prefix.to_lowercase();
        if KNOWN_PROVIDERS.contains(&prefix_lower.as_str()) {
            return (prefix, rest);
        }
    }
    ("local", model)
}

/// Parse an LLM model name into (provider, model) tuple.
pub fn parse_llm_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        let prefix_lower = prefix.to_lowercase();
        if KNOWN_LLM_PROVIDERS.contains(&prefix_lower.as_str()) {
            return (prefix, rest);
        }
    }
    ("local", model)
}
