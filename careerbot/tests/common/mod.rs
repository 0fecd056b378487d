// Shared helpers for the integration tests: document fixtures, a mocked
// OpenAI-compatible server and a fully wired application state.
#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::sync::{Arc, Once};

use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use careerbot::api::AppState;
use careerbot::config::{
    Config, DatabaseConfig, EmbeddingsConfig, KnowledgeBackendKind, KnowledgeConfig, LlmConfig,
    ProcessingConfig, RetrievalConfig, ServerConfig, SessionConfig,
};
use careerbot::db::{Database, DatabaseBackend, LibSqlBackend};
use careerbot::embeddings::EmbeddingProvider;
use careerbot::knowledge::InMemoryKnowledgeStore;
use careerbot::llm::LlmProvider;

pub use tempfile;
pub use wiremock;

pub const DIMENSIONS: usize = 32;

pub const DOCX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

static INIT: Once = Once::new();

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Build a DOCX in memory with docx-rs.
pub fn build_docx<F>(builder_fn: F) -> Vec<u8>
where
    F: FnOnce(docx_rs::Docx) -> docx_rs::Docx,
{
    let docx = builder_fn(docx_rs::Docx::new());
    let mut buffer = Cursor::new(Vec::new());
    docx.build().pack(&mut buffer).expect("Failed to pack DOCX");
    buffer.into_inner()
}

/// A one-column résumé with a paragraph per line.
pub fn resume_docx(lines: &[&str]) -> Vec<u8> {
    use docx_rs::{Paragraph, Run};

    build_docx(|docx| {
        lines.iter().fold(docx, |docx, line| {
            docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(*line)))
        })
    })
}

/// Hand-assembled OOXML package. `parts` are extra `(path, xml)` entries
/// such as header parts or their relationship files.
pub fn ooxml_package(document_xml: &str, document_rels: Option<&str>, parts: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();

    let content_types = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

    let mut entries = vec![
        ("[Content_Types].xml", content_types),
        ("word/document.xml", document_xml),
    ];
    if let Some(rels) = document_rels {
        entries.push(("word/_rels/document.xml.rels", rels));
    }
    entries.extend_from_slice(parts);

    for (name, content) in entries {
        writer.start_file(name, options).expect("start zip entry");
        writer.write_all(content.as_bytes()).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

pub fn word_document(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:body>{body}</w:body></w:document>"#
    )
}

pub fn relationships(entries: &[(&str, &str, bool)]) -> String {
    let items: String = entries
        .iter()
        .map(|(id, target, external)| {
            let mode = if *external { r#" TargetMode="External""# } else { "" };
            format!(r#"<Relationship Id="{id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/unknown" Target="{target}"{mode}/>"#)
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{items}</Relationships>"#
    )
}

/// Deterministic embedder for `POST /v1/embeddings`: every lowercase word
/// adds one to a hashed bucket, so texts sharing words land close together.
pub struct BagOfWordsEmbedder;

impl BagOfWordsEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(2166136261_u32, |h, b| (h ^ u32::from(b)).wrapping_mul(16777619));
            vector[hash as usize % DIMENSIONS] += 1.0;
        }
        if vector.iter().all(|v| *v == 0.0) {
            vector[0] = 1.0;
        }
        vector
    }
}

impl Respond for BagOfWordsEmbedder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value = match serde_json::from_slice(&request.body) {
            Ok(body) => body,
            Err(_) => return ResponseTemplate::new(400),
        };
        let inputs: Vec<String> = body["input"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|i| i.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        let data: Vec<serde_json::Value> = inputs
            .iter()
            .enumerate()
            .map(|(index, text)| {
                json!({
                    "object": "embedding",
                    "index": index,
                    "embedding": Self::vector(text),
                })
            })
            .collect();

        ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": data,
            "model": "text-embedding-3-small",
        }))
    }
}

pub async fn mount_embeddings(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(BagOfWordsEmbedder)
        .mount(server)
        .await;
}

pub fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1,
        "model": "gpt-4o-mini",
        "choices": [
            {
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": content
                },
                "finish_reason": "stop"
            }
        ],
        "usage": {
            "prompt_tokens": 1,
            "completion_tokens": 1,
            "total_tokens": 2
        }
    })
}

pub fn api_error_body(message: &str, error_type: &str, code: &str) -> serde_json::Value {
    json!({
        "error": {
            "message": message,
            "type": error_type,
            "param": serde_json::Value::Null,
            "code": code
        }
    })
}

/// Answer chat completions whose prompt contains `marker` with `content`.
pub async fn mock_completion(server: &MockServer, marker: &str, content: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains(marker))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(content)))
        .mount(server)
        .await;
}

/// Prompts sent to the chat completion endpoint, oldest first.
pub async fn received_prompts(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == "/v1/chat/completions")
        .map(|r| String::from_utf8_lossy(&r.body).into_owned())
        .collect()
}

pub fn test_config(database_url: String, server: &MockServer, with_llm: bool) -> Config {
    let base_url = format!("{}/v1", server.uri());
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            max_upload_bytes: 1024 * 1024,
        },
        database: DatabaseConfig {
            url: database_url,
            auth_token: None,
            local_path: None,
        },
        embeddings: EmbeddingsConfig {
            model: "openai/text-embedding-3-small".to_string(),
            dimensions: DIMENSIONS,
            batch_size: 16,
            api_key: Some("test-key".to_string()),
            base_url: Some(base_url.clone()),
            timeout_secs: 5,
            max_retries: 0,
        },
        processing: ProcessingConfig {
            chunk_size: 200,
            chunk_overlap: 20,
            qa_chunk_size: 5000,
            pdf_x_tolerance: 3.0,
            pdf_y_tolerance: 1.5,
        },
        knowledge: KnowledgeConfig {
            backend: KnowledgeBackendKind::Memory,
            remote_url: None,
            remote_api_key: None,
            remote_timeout_secs: 30,
        },
        retrieval: RetrievalConfig {
            max_context_chars: 12_000,
            resume_top_k: 4,
            job_top_k: 4,
            answer_top_k: 3,
        },
        sessions: SessionConfig {
            history_turns: 3,
            idle_ttl_secs: 3600,
            sweep_interval_secs: 300,
        },
        llm: with_llm.then(|| LlmConfig {
            model: "openai/gpt-4o-mini".to_string(),
            api_key: Some("test-key".to_string()),
            base_url: Some(base_url),
            timeout_secs: 5,
            max_retries: 0,
        }),
    }
}

/// Application state backed by a temporary database file, the in-memory
/// knowledge store and `server` for both embeddings and completions.
pub async fn test_app(server: &MockServer, with_llm: bool) -> (tempfile::TempDir, AppState) {
    init_test_logger();
    mount_embeddings(server).await;

    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("file:{}", dir.path().join("careerbot.db").display());
    let config = test_config(url, server, with_llm);

    let raw_db = Database::new(&config.database).await.expect("database");
    let db: Arc<dyn DatabaseBackend> = Arc::new(LibSqlBackend::new(raw_db));
    let embeddings = EmbeddingProvider::new(&config.embeddings).expect("embeddings");
    let llm = LlmProvider::new(config.llm.as_ref());

    let state = AppState::new(
        config,
        db,
        Arc::new(InMemoryKnowledgeStore::new()),
        embeddings,
        llm,
    )
    .expect("app state");
    (dir, state)
}
