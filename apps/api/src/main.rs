mod answers;
mod coach;
mod config;
mod db;
mod errors;
mod evaluation;
mod interview;
mod llm_client;
mod models;
mod report;
mod resume_text;
mod routes;
mod state;
mod store;
#[cfg(test)]
mod testing;
mod transcription;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::answers::audio_store::AudioStore;
use crate::coach::ClaudeCoach;
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::report::markdown::MarkdownReportRenderer;
use crate::routes::build_router;
use crate::state::AppState;
use crate::transcription::WhisperTranscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http=info",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Interview API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize SQLite
    let db = create_pool(&config.database_url, config.db_busy_timeout).await?;

    // Audio uploads live on local disk and are served back under /uploads
    let audio = AudioStore::new(&config.upload_dir)?;
    info!("Audio uploads stored in {}", audio.root().display());

    // Initialize LLM-backed coach
    let llm = LlmClient::new(config.anthropic_api_key.clone(), config.llm_model.clone())?;
    info!("LLM client initialized (model: {})", llm.model());
    let coach = Arc::new(ClaudeCoach(llm));

    let transcriber = Arc::new(WhisperTranscriber::new(
        config.groq_api_key.clone(),
        config.transcription_model.clone(),
    )?);
    info!(
        "Transcriber initialized (model: {})",
        config.transcription_model
    );

    let port = config.port;
    let state = AppState {
        db,
        coach,
        transcriber,
        renderer: Arc::new(MarkdownReportRenderer),
        audio,
        config: Arc::new(config),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
