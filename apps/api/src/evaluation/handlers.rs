use axum::{
    extract::{Path, State},
    Json,
};

use crate::errors::AppError;
use crate::evaluation::analyze::{analyze_session, AnalysisSummary, AnalyzeContext};
use crate::state::AppState;

/// POST /analyze/:session_id
pub async fn handle_analyze(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<AnalysisSummary>, AppError> {
    let retry = state.config.analyze_retry();
    let ctx = AnalyzeContext {
        pool: &state.db,
        coach: state.coach.as_ref(),
        retry: &retry,
    };
    Ok(Json(analyze_session(&ctx, &session_id).await?))
}
