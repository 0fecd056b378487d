use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use careerbot::api::{create_router, AppState};
use careerbot::config::Config;
use careerbot::db::{Database, DatabaseBackend, LibSqlBackend};
use careerbot::embeddings::EmbeddingProvider;
use careerbot::llm::LlmProvider;
use careerbot::migration::{self, MigrationDecision};
use careerbot::services::SessionSweeper;

#[derive(Parser)]
#[command(name = "careerbot")]
#[command(about = "Career assistant backend: résumés, job postings, interview prep")]
struct Args {
    /// Re-embed every owner's knowledge, also approving a dimension migration
    #[arg(long)]
    rebuild_knowledge: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "careerbot=info,tower_http=debug".into());
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let config = Config::from_env();

    tracing::info!("Initializing database...");
    let raw_db = Database::new(&config.database).await?;
    let db: Arc<dyn DatabaseBackend> = Arc::new(LibSqlBackend::new(raw_db.clone()));

    tracing::info!("Loading embedding model: {}...", config.embeddings.model);
    let embeddings = EmbeddingProvider::new(&config.embeddings)?;

    let decision =
        migration::check_dimension_compatibility(&*db, embeddings.dimensions(), args.rebuild_knowledge)
            .await?;
    if decision == MigrationDecision::Rejected {
        tracing::error!("Migration rejected. Cannot start with dimension mismatch.");
        return Err(anyhow::anyhow!(
            "Embedding dimension mismatch - use --rebuild-knowledge to force migration"
        ));
    }

    tracing::info!("Opening knowledge store ({:?})...", config.knowledge.backend);
    let knowledge = migration::open_knowledge_store(&config, &raw_db, decision).await?;

    if let Some(llm_config) = &config.llm {
        tracing::info!("Initializing LLM provider: {}...", llm_config.model);
    }
    let llm = LlmProvider::new(config.llm.as_ref());
    if !llm.is_available() {
        tracing::warn!("LLM unavailable - generation features will report provider errors");
    }

    let state = AppState::new(config.clone(), db, knowledge, embeddings, llm)?;

    if decision == MigrationDecision::Approved || args.rebuild_knowledge {
        tracing::info!("Rebuilding knowledge for every owner...");
        let report = state.rebuilder.rebuild_all().await?;
        tracing::info!(
            owners = report.owners,
            failed = report.failed_owners.len(),
            "Knowledge rebuild finished"
        );
        if decision == MigrationDecision::Approved {
            migration::complete_migration(&*state.db, state.embeddings.dimensions()).await?;
        }
    }

    let cancel_token = CancellationToken::new();

    tracing::info!(
        "Starting session sweeper... (idle_ttl={}s)",
        config.sessions.idle_ttl_secs
    );
    let sweeper = SessionSweeper::new(
        state.career.sessions().clone(),
        config.sessions.sweep_interval_secs,
    );
    let token = cancel_token.child_token();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::info!("Session sweeper shutting down...");
                    break;
                }
                _ = tokio::time::sleep(tokio::time::Duration::from_secs(sweeper.interval_secs())) => {
                    sweeper.run_once();
                }
            }
        }
    });

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Careerbot starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/api/v1/health", addr);
    tracing::info!("  API docs:     http://{}/api/v1/docs", addr);
    tracing::info!("  OpenAPI spec: http://{}/api/v1/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token))
        .await?;

    Ok(())
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, cancelling background tasks...");
    cancel_token.cancel();
}
