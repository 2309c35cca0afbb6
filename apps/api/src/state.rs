use std::sync::Arc;

use sqlx::SqlitePool;

use crate::answers::audio_store::AudioStore;
use crate::coach::InterviewModel;
use crate::config::Config;
use crate::report::ReportRenderer;
use crate::transcription::Transcriber;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Question generation, reference answers and scoring. Default: `ClaudeCoach`.
    pub coach: Arc<dyn InterviewModel>,
    pub transcriber: Arc<dyn Transcriber>,
    pub renderer: Arc<dyn ReportRenderer>,
    pub audio: AudioStore,
    pub config: Arc<Config>,
}
