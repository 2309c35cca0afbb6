pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;

use crate::answers::audio_store::AUDIO_URL_PREFIX;
use crate::answers::handlers as answer_handlers;
use crate::evaluation::handlers as evaluation_handlers;
use crate::interview::handlers as interview_handlers;
use crate::report::handlers as report_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let audio_files = ServeDir::new(state.audio.root());
    let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        .route("/health", get(health::health_handler))
        // Sessions
        .route(
            "/create-session",
            post(interview_handlers::handle_create_session),
        )
        .route("/sessions", get(interview_handlers::handle_list_sessions))
        .route(
            "/session/:session_id",
            get(interview_handlers::handle_get_session),
        )
        // Answers
        .route(
            "/upload-answer/:session_id/:question_id",
            post(answer_handlers::handle_upload_answer),
        )
        // Evaluation and export
        .route(
            "/analyze/:session_id",
            post(evaluation_handlers::handle_analyze),
        )
        .route(
            "/export-report/:session_id",
            get(report_handlers::handle_export_report),
        )
        .nest_service(&format!("/{AUDIO_URL_PREFIX}"), audio_files)
        .layer(body_limit)
        .with_state(state)
}
