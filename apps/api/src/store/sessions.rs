use anyhow::Context;
use chrono::Utc;
use sqlx::SqliteConnection;

use crate::errors::AppError;
use crate::models::session::{encode_questions, SessionRow};
use crate::models::{Session, SessionStatus};

/// Orders statuses inside SQL so status updates can refuse to move backward.
const STATUS_RANK_SQL: &str =
    "CASE status WHEN 'created' THEN 0 WHEN 'in_progress' THEN 1 WHEN 'analyzed' THEN 2 ELSE 0 END";

fn status_rank(status: SessionStatus) -> i64 {
    match status {
        SessionStatus::Created => 0,
        SessionStatus::InProgress => 1,
        SessionStatus::Analyzed => 2,
    }
}

pub async fn insert_session(conn: &mut SqliteConnection, session: &Session) -> Result<(), AppError> {
    let questions = encode_questions(&session.questions)
        .with_context(|| format!("Failed to encode questions for session {}", session.id))?;

    sqlx::query(
        r#"
        INSERT INTO interview_sessions
            (id, job_description, resume_text, duration_seconds, questions, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&session.id)
    .bind(&session.job_description)
    .bind(&session.resume_text)
    .bind(session.duration_seconds)
    .bind(questions)
    .bind(session.status.as_str())
    .bind(session.created_at)
    .bind(session.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn fetch_session(
    conn: &mut SqliteConnection,
    session_id: &str,
) -> Result<Option<Session>, AppError> {
    sqlx::query_as::<_, SessionRow>("SELECT * FROM interview_sessions WHERE id = ?")
        .bind(session_id)
        .fetch_optional(conn)
        .await?
        .map(Session::try_from)
        .transpose()
}

/// Like `fetch_session` but a missing session is `AppError::NotFound`.
pub async fn require_session(
    conn: &mut SqliteConnection,
    session_id: &str,
) -> Result<Session, AppError> {
    fetch_session(conn, session_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))
}

/// Newest first. Filtering by status uses `idx_sessions_status`.
pub async fn list_sessions(
    conn: &mut SqliteConnection,
    status: Option<SessionStatus>,
) -> Result<Vec<Session>, AppError> {
    let rows = match status {
        Some(status) => {
            sqlx::query_as::<_, SessionRow>(
                "SELECT * FROM interview_sessions WHERE status = ? ORDER BY created_at DESC",
            )
            .bind(status.as_str())
            .fetch_all(conn)
            .await?
        }
        None => {
            sqlx::query_as::<_, SessionRow>(
                "SELECT * FROM interview_sessions ORDER BY created_at DESC",
            )
            .fetch_all(conn)
            .await?
        }
    };

    rows.into_iter().map(Session::try_from).collect()
}

/// Moves the session forward to `status`. A session already at or past
/// `status` is left untouched. Returns whether a row changed.
pub async fn advance_status(
    conn: &mut SqliteConnection,
    session_id: &str,
    status: SessionStatus,
) -> Result<bool, AppError> {
    let result = sqlx::query(&format!(
        "UPDATE interview_sessions SET status = ?, updated_at = ? \
         WHERE id = ? AND {STATUS_RANK_SQL} < ?"
    ))
    .bind(status.as_str())
    .bind(Utc::now())
    .bind(session_id)
    .bind(status_rank(status))
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}
