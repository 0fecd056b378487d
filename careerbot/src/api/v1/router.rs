use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::api::state::AppState;

use super::handlers;

pub fn v1_router() -> Router<AppState> {
    let resumes = Router::new().route("/{ownerId}", get(handlers::resumes::get_resume));

    let jobs = Router::new().route("/", post(handlers::jobs::create_job)).route(
        "/{jobId}",
        get(handlers::jobs::get_job).delete(handlers::jobs::delete_job),
    );

    // `POST /questions/{questionId}:help` arrives here as one path segment.
    let questions = Router::new()
        .route(
            "/{questionId}",
            post(handlers::questions::answer_help).delete(handlers::questions::delete_question),
        )
        .route(
            "/{questionId}/answer",
            put(handlers::questions::save_answer),
        );

    let chat = Router::new()
        .route("/", post(handlers::chat::send_message))
        .route("/{chatId}/messages", get(handlers::chat::list_messages))
        .route(
            "/sessions/{sessionId}",
            delete(handlers::chat::expire_session),
        );

    let meta_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/openapi.json", get(super::openapi::openapi_json))
        .merge(super::openapi::redoc_router());

    let career_routes = Router::new()
        .route("/resumes:upload", post(handlers::resumes::upload_resume))
        .nest("/resumes", resumes)
        .nest("/jobs", jobs)
        .route(
            "/questions:generate",
            post(handlers::questions::generate_questions),
        )
        .nest("/questions", questions)
        .nest("/chat", chat)
        .route(
            "/cover-letters:generate",
            post(handlers::generation::generate_cover_letter),
        )
        .route(
            "/recommendations:generate",
            post(handlers::generation::generate_recommendations),
        )
        .route(
            "/knowledge:rebuild",
            post(handlers::generation::rebuild_knowledge),
        );

    Router::new().merge(meta_routes).merge(career_routes)
}
