mod config;
mod routes;

use anyhow::Context;
use axum::Router;
use config::Config;
use interview_core::evaluator::build_evaluator;
use interview_core::prompt_loader::{self, PROMPTS_DIR};
use interview_core::repository::InterviewRepository;
use interview_core::store::JsonlStore;
use routes::AppState;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load API configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    // --- 3. Load Prompts ---
    let prompts = prompt_loader::load_prompt_set(Path::new(PROMPTS_DIR))
        .context("Failed to load LLM prompts")?;

    // --- 4. Initialize Collaborators ---
    let store = JsonlStore::open(&config.data_path)
        .await
        .with_context(|| format!("Failed to open store at {}", config.data_path.display()))?;
    let repository = InterviewRepository::new(Arc::new(store));
    let evaluator = build_evaluator(
        config.provider,
        config.api_key.clone(),
        config.chat_model.clone(),
        prompts,
    );
    info!(
        "Using {:?} evaluation with model {}",
        config.provider, config.chat_model
    );

    // Browser clients are served from a separate origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app: Router = routes::router(AppState::new(repository, evaluator)).layer(cors);

    info!("Starting interview API, listening on {}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
