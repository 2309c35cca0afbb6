use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};

use crate::errors::AppError;
use crate::report::build_report;
use crate::state::AppState;

/// GET /export-report/:session_id
pub async fn handle_export_report(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let report = build_report(&state.db, &session_id).await?;
    let rendered = state.renderer.render(&report).await?;

    let short_id: String = session_id.chars().take(8).collect();
    let disposition = format!(
        "attachment; filename=interview_results_{short_id}.{}",
        rendered.extension
    );

    Ok((
        [
            (header::CONTENT_TYPE, rendered.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        rendered.bytes,
    ))
}
