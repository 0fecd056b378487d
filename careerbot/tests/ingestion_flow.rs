mod common;

use pretty_assertions::assert_eq;
use wiremock::MockServer;

use common::{mock_completion, resume_docx, test_app, DOCX_MEDIA_TYPE};

use careerbot::api::AppState;
use careerbot::db::{JobStore, QuestionStore, ResumeStore};
use careerbot::error::CareerError;
use careerbot::knowledge::KnowledgeStore;
use careerbot::models::{
    Category, InterviewQuestion, JobSectionKind, KnowledgeRecord, MetadataFilter, NewJobPosting,
    META_JOB_ID, META_QUESTION_ID,
};
use careerbot::services::{ContextAssembler, ContextCategory};

const OWNER: &str = "owner-1";

async fn records(state: &AppState, owner_id: &str, filter: MetadataFilter) -> Vec<KnowledgeRecord> {
    state
        .knowledge
        .get_where(owner_id, &filter)
        .await
        .expect("knowledge read")
}

fn texts(records: &[KnowledgeRecord]) -> String {
    records
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

fn new_job(description: &str) -> NewJobPosting {
    NewJobPosting {
        title: "Backend Engineer".to_string(),
        company: "Acme".to_string(),
        description: description.to_string(),
        post_url: Some("https://jobs.example.com/1".to_string()),
        status: None,
    }
}

#[tokio::test]
async fn test_resume_upload_stores_sections_and_knowledge() {
    let server = MockServer::start().await;
    let (_dir, state) = test_app(&server, false).await;

    let bytes = resume_docx(&[
        "Jane Doe",
        "Experience",
        "Acme Corp, Senior Engineer. Built the billing platform.",
        "Skills",
        "Rust, SQL, distributed systems.",
    ]);

    let report = state
        .ingestion
        .ingest_resume(OWNER, bytes, Some(DOCX_MEDIA_TYPE))
        .await
        .expect("résumé ingested");

    assert_eq!(report.sections, vec!["Experience", "Skills"]);
    assert!(report.chunks > 0);

    let stored = state
        .db
        .get_resume(OWNER)
        .await
        .expect("db read")
        .expect("résumé stored");
    assert!(stored
        .full_text
        .as_deref()
        .is_some_and(|t| t.contains("billing platform")));
    assert_eq!(stored.sections.len(), 2);
    assert_eq!(stored.sections[1].body, "Rust, SQL, distributed systems.");

    let resume = records(&state, OWNER, MetadataFilter::category(Category::Resume)).await;
    assert_eq!(resume.len(), report.chunks);
    assert!(texts(&resume).contains("billing platform"));
}

#[tokio::test]
async fn test_resume_reupload_replaces_previous_records() {
    let server = MockServer::start().await;
    let (_dir, state) = test_app(&server, false).await;

    state
        .ingestion
        .ingest_resume(
            OWNER,
            resume_docx(&["Experience", "Initech, Analyst. Wrote TPS reports."]),
            Some(DOCX_MEDIA_TYPE),
        )
        .await
        .expect("first upload");

    state
        .ingestion
        .ingest_resume(
            OWNER,
            resume_docx(&["Experience", "Globex, Engineer. Maintained the data pipeline."]),
            None,
        )
        .await
        .expect("second upload");

    let resume = records(&state, OWNER, MetadataFilter::category(Category::Resume)).await;
    let all_text = texts(&resume);
    assert!(all_text.contains("Globex"));
    assert!(!all_text.contains("Initech"));

    let stored = state.db.get_resume(OWNER).await.unwrap().unwrap();
    assert!(!stored.full_text.unwrap_or_default().contains("Initech"));
}

#[tokio::test]
async fn test_reupload_with_embeddings_down_keeps_previous_resume() {
    let server = MockServer::start().await;
    let (_dir, state) = test_app(&server, false).await;

    let first = state
        .ingestion
        .ingest_resume(
            OWNER,
            resume_docx(&["Experience", "Initech, Analyst. Wrote TPS reports."]),
            Some(DOCX_MEDIA_TYPE),
        )
        .await
        .expect("first upload");
    let before = records(&state, OWNER, MetadataFilter::category(Category::Resume)).await;
    assert_eq!(before.len(), first.chunks);

    server.reset().await;

    let result = state
        .ingestion
        .ingest_resume(
            OWNER,
            resume_docx(&["Experience", "Globex, Engineer. Maintained the data pipeline."]),
            Some(DOCX_MEDIA_TYPE),
        )
        .await;
    assert!(matches!(result, Err(CareerError::ProviderUnavailable(_))));

    let stored = state.db.get_resume(OWNER).await.unwrap().unwrap();
    let full_text = stored.full_text.unwrap_or_default();
    assert!(full_text.contains("Initech"));
    assert!(!full_text.contains("Globex"));

    let after = records(&state, OWNER, MetadataFilter::category(Category::Resume)).await;
    assert_eq!(after, before);
}

#[tokio::test]
async fn test_unsupported_resume_leaves_nothing_behind() {
    let server = MockServer::start().await;
    let (_dir, state) = test_app(&server, false).await;

    let result = state
        .ingestion
        .ingest_resume(OWNER, b"Experience\nAcme".to_vec(), Some("text/plain"))
        .await;

    assert!(matches!(result, Err(CareerError::UnsupportedFormat(_))));
    assert!(state.db.get_resume(OWNER).await.unwrap().is_none());
    assert!(records(&state, OWNER, MetadataFilter::category(Category::Resume))
        .await
        .is_empty());
}

#[tokio::test]
async fn test_blank_owner_is_rejected() {
    let server = MockServer::start().await;
    let (_dir, state) = test_app(&server, false).await;

    let result = state
        .ingestion
        .ingest_resume("  ", resume_docx(&["Skills", "Rust"]), Some(DOCX_MEDIA_TYPE))
        .await;

    assert!(matches!(result, Err(CareerError::Validation(_))));
}

#[tokio::test]
async fn test_job_sections_come_from_the_model() {
    let server = MockServer::start().await;
    let (_dir, state) = test_app(&server, true).await;
    mock_completion(
        &server,
        "Break its content into the sections",
        r#"```json
{"company_description": "Acme builds reusable rockets.", "job_description": "Own the telemetry backend.", "responsibilities": ["Design APIs", "Mentor engineers"], "qualifications": "Five years of Rust.", "compensation": null}
```"#,
    )
    .await;

    let details = state
        .ingestion
        .create_job(OWNER, new_job("Acme builds reusable rockets. We need a backend engineer..."))
        .await
        .expect("job created");

    let kinds: Vec<JobSectionKind> = details.sections.iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![
            JobSectionKind::CompanyDescription,
            JobSectionKind::JobDescription,
            JobSectionKind::Responsibilities,
            JobSectionKind::Qualifications,
        ]
    );
    assert_eq!(details.sections[2].content, "Design APIs\nMentor engineers");
    assert_eq!(details.job.status, "saved");

    let job_filter = MetadataFilter::category(Category::Jobs).eq(META_JOB_ID, details.job.id.as_str());
    let job_records = records(&state, OWNER, job_filter.clone()).await;
    assert!(!job_records.is_empty());
    assert!(texts(&job_records).contains("telemetry backend"));

    let stored = state
        .db
        .get_job(OWNER, &details.job.id)
        .await
        .unwrap()
        .expect("job stored");
    assert_eq!(stored.title, "Backend Engineer");

    state
        .ingestion
        .delete_job(OWNER, &details.job.id)
        .await
        .expect("job deleted");

    assert!(state.db.get_job(OWNER, &details.job.id).await.unwrap().is_none());
    assert!(records(&state, OWNER, job_filter).await.is_empty());
}

#[tokio::test]
async fn test_job_without_model_keeps_description_whole() {
    let server = MockServer::start().await;
    let (_dir, state) = test_app(&server, false).await;

    let details = state
        .ingestion
        .create_job(OWNER, new_job("Build services in Rust for a logistics company."))
        .await
        .expect("job created");

    assert_eq!(details.sections.len(), 1);
    assert_eq!(details.sections[0].kind, JobSectionKind::JobDescription);
    assert_eq!(
        details.sections[0].content,
        "Build services in Rust for a logistics company."
    );
}

#[tokio::test]
async fn test_malformed_job_sections_store_nothing() {
    let server = MockServer::start().await;
    let (_dir, state) = test_app(&server, true).await;
    mock_completion(&server, "Break its content into the sections", "Sure! Here you go.").await;

    let result = state
        .ingestion
        .create_job(OWNER, new_job("Build services in Rust."))
        .await;

    assert!(
        matches!(result, Err(CareerError::MalformedModelOutput(_))),
        "got: {result:?}"
    );
    assert!(state.db.list_jobs(OWNER).await.unwrap().is_empty());
    assert!(records(&state, OWNER, MetadataFilter::category(Category::Jobs))
        .await
        .is_empty());
}

#[tokio::test]
async fn test_delete_unknown_job_is_not_found() {
    let server = MockServer::start().await;
    let (_dir, state) = test_app(&server, false).await;

    let result = state.ingestion.delete_job(OWNER, "missing").await;

    assert!(matches!(result, Err(CareerError::NotFound(_))));
}

#[tokio::test]
async fn test_answers_are_reindexed_and_removed_with_their_question() {
    let server = MockServer::start().await;
    let (_dir, state) = test_app(&server, false).await;

    let question = InterviewQuestion::new(OWNER, None, "Tell me about a hard bug.".to_string());
    state
        .db
        .create_questions(std::slice::from_ref(&question))
        .await
        .unwrap();
    let filter = MetadataFilter::category(Category::Questions).eq(META_QUESTION_ID, question.id.as_str());

    state
        .ingestion
        .save_answer(OWNER, &question.id, "A race in the billing retry loop.")
        .await
        .expect("first answer");
    state
        .ingestion
        .save_answer(OWNER, &question.id, "A deadlock between two connection pools.")
        .await
        .expect("second answer");

    let qa = records(&state, OWNER, filter.clone()).await;
    assert_eq!(qa.len(), 1);
    assert!(qa[0].text.contains("Question: Tell me about a hard bug."));
    assert!(qa[0].text.contains("deadlock"));
    assert!(!qa[0].text.contains("billing retry"));

    let cleared = state
        .ingestion
        .save_answer(OWNER, &question.id, "   ")
        .await
        .expect("answer cleared");
    assert!(cleared.answer.is_none());
    assert!(records(&state, OWNER, filter.clone()).await.is_empty());

    state
        .ingestion
        .save_answer(OWNER, &question.id, "Profiling found lock contention.")
        .await
        .unwrap();
    state
        .ingestion
        .delete_question(OWNER, &question.id)
        .await
        .expect("question deleted");

    assert!(state
        .db
        .get_question(OWNER, &question.id)
        .await
        .unwrap()
        .is_none());
    assert!(records(&state, OWNER, filter).await.is_empty());
}

#[tokio::test]
async fn test_other_owners_see_nothing() {
    let server = MockServer::start().await;
    let (_dir, state) = test_app(&server, false).await;

    state
        .ingestion
        .ingest_resume(
            OWNER,
            resume_docx(&["Skills", "Rust, Kubernetes, PostgreSQL."]),
            Some(DOCX_MEDIA_TYPE),
        )
        .await
        .unwrap();

    let assembler = ContextAssembler::new(
        state.embeddings.clone(),
        state.knowledge.clone(),
        state.config.retrieval.max_context_chars,
    );
    let categories = [
        ContextCategory::resume(4),
        ContextCategory::job(4, None),
        ContextCategory::answers(3),
    ];

    let own = assembler.assemble(OWNER, "Rust skills", &categories).await;
    assert_eq!(own.blocks().len(), 1);
    assert!(own.render().contains("Kubernetes"));

    let stranger = assembler
        .assemble("owner-2", "Rust skills", &categories)
        .await;
    assert!(stranger.is_empty());
    assert_eq!(stranger.render(), "");
}

#[tokio::test]
async fn test_rebuild_restores_lost_knowledge() {
    let server = MockServer::start().await;
    let (_dir, state) = test_app(&server, false).await;

    state
        .ingestion
        .ingest_resume(
            OWNER,
            resume_docx(&["Experience", "Acme Corp, Senior Engineer."]),
            Some(DOCX_MEDIA_TYPE),
        )
        .await
        .unwrap();
    let job = state
        .ingestion
        .create_job(OWNER, new_job("Keep the telemetry pipeline healthy."))
        .await
        .unwrap();
    let question = InterviewQuestion::new(OWNER, Some(&job.job.id), "Why Acme?".to_string());
    state
        .db
        .create_questions(std::slice::from_ref(&question))
        .await
        .unwrap();
    state
        .ingestion
        .save_answer(OWNER, &question.id, "Their rockets land themselves.")
        .await
        .unwrap();

    for category in [Category::Resume, Category::Jobs, Category::Questions] {
        state
            .knowledge
            .delete_where(OWNER, &MetadataFilter::category(category))
            .await
            .unwrap();
    }

    let report = state.rebuilder.rebuild_all().await.expect("rebuild");

    assert_eq!(report.owners, 1);
    assert!(report.failed_owners.is_empty());
    assert!(report.resume_records > 0);
    assert!(report.job_records > 0);
    assert_eq!(report.question_records, 1);

    let questions = records(&state, OWNER, MetadataFilter::category(Category::Questions)).await;
    assert!(texts(&questions).contains("rockets land themselves"));
    let jobs = records(&state, OWNER, MetadataFilter::category(Category::Jobs)).await;
    assert!(texts(&jobs).contains("telemetry pipeline"));
}
