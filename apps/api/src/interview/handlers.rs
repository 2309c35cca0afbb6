use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::interview::service::{
    create_session, get_session, list_sessions, CreatedSession, NewSession, SessionDetail,
};
use crate::models::{Session, SessionStatus};
use crate::resume_text::extract_text;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SessionListQuery {
    pub status: Option<SessionStatus>,
}

pub(crate) fn multipart_error(e: MultipartError) -> AppError {
    AppError::Validation(format!("Malformed multipart body: {e}"))
}

/// POST /create-session
///
/// Multipart fields: `job_description` (text), `resume` (PDF), `duration` (seconds).
pub async fn handle_create_session(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<CreatedSession>, AppError> {
    let mut job_description = None;
    let mut resume_pdf = None;
    let mut duration = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("job_description") => {
                job_description = Some(field.text().await.map_err(multipart_error)?);
            }
            Some("resume") => {
                resume_pdf = Some(field.bytes().await.map_err(multipart_error)?);
            }
            Some("duration") => {
                let raw = field.text().await.map_err(multipart_error)?;
                let seconds = raw.trim().parse::<i64>().map_err(|_| {
                    AppError::Validation(format!("duration must be an integer, got '{raw}'"))
                })?;
                duration = Some(seconds);
            }
            _ => {}
        }
    }

    let job_description = job_description
        .ok_or_else(|| AppError::Validation("job_description is required".to_string()))?;
    let resume_pdf =
        resume_pdf.ok_or_else(|| AppError::Validation("resume is required".to_string()))?;
    let duration_seconds =
        duration.ok_or_else(|| AppError::Validation("duration is required".to_string()))?;

    let resume_text = extract_text(resume_pdf.to_vec()).await?;

    let created = create_session(
        &state.db,
        state.coach.as_ref(),
        &state.config.upload_retry(),
        NewSession {
            job_description,
            resume_text,
            duration_seconds,
        },
    )
    .await?;

    Ok(Json(created))
}

/// GET /session/:session_id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionDetail>, AppError> {
    Ok(Json(get_session(&state.db, &session_id).await?))
}

/// GET /sessions?status=analyzed
pub async fn handle_list_sessions(
    State(state): State<AppState>,
    Query(params): Query<SessionListQuery>,
) -> Result<Json<Vec<Session>>, AppError> {
    Ok(Json(list_sessions(&state.db, params.status).await?))
}
