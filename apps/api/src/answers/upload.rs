//! Answer upload pipeline.
//!
//! Flow: durable audio write → transcription → upsert answer + advance
//! session status (one transaction, retried on contention).

use bytes::Bytes;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::answers::audio_store::{audio_extension, AudioStore, OrphanGuard};
use crate::db::retry::{with_retry, RetryPolicy};
use crate::errors::AppError;
use crate::models::SessionStatus;
use crate::store::answers::{self, UpsertOutcome};
use crate::store::sessions;
use crate::transcription::Transcriber;

#[derive(Debug, Clone, Serialize)]
pub struct UploadedAnswer {
    pub transcript: String,
    pub audio_path: String,
}

/// Everything the upload pipeline depends on.
pub struct UploadContext<'a> {
    pub pool: &'a SqlitePool,
    pub audio: &'a AudioStore,
    pub transcriber: &'a dyn Transcriber,
    pub retry: &'a RetryPolicy,
}

pub async fn upload_answer(
    ctx: &UploadContext<'_>,
    session_id: &str,
    question_id: &str,
    audio_bytes: Bytes,
    file_name: Option<&str>,
) -> Result<UploadedAnswer, AppError> {
    if audio_bytes.is_empty() {
        return Err(AppError::Validation(
            "Empty audio file received".to_string(),
        ));
    }

    // Early exit before any file or transcription work; persist_answer checks again.
    with_retry(ctx.retry, "upload_answer.check_session", || async move {
        let mut conn = ctx.pool.acquire().await?;
        sessions::require_session(&mut conn, session_id).await
    })
    .await?;

    let stored = ctx
        .audio
        .write(audio_bytes, audio_extension(file_name))
        .await?;
    let guard = OrphanGuard::new(stored.path.clone());

    let transcript = match ctx.transcriber.transcribe(&stored.path).await {
        Ok(text) => text,
        Err(e) => {
            warn!(
                session_id,
                question_id, "Transcription failed for {}: {e}", stored.relative_path
            );
            String::new()
        }
    };

    let audio_path = stored.relative_path.as_str();
    let outcome = with_retry(ctx.retry, "upload_answer", || {
        persist_answer(ctx.pool, session_id, question_id, audio_path, &transcript)
    })
    .await?;
    guard.disarm();

    if let Some(previous) = outcome
        .previous_audio_path
        .as_deref()
        .filter(|previous| *previous != stored.relative_path)
    {
        if let Err(e) = ctx.audio.remove(previous) {
            warn!("Failed to remove replaced audio {previous}: {e}");
        }
    }

    info!(
        session_id,
        question_id,
        answer_id = %outcome.answer_id,
        replaced = outcome.replaced,
        "Stored answer audio at {}",
        stored.relative_path
    );

    Ok(UploadedAnswer {
        transcript,
        audio_path: stored.relative_path,
    })
}

async fn persist_answer(
    pool: &SqlitePool,
    session_id: &str,
    question_id: &str,
    audio_path: &str,
    transcript: &str,
) -> Result<UpsertOutcome, AppError> {
    let mut tx = pool.begin().await?;
    // Write first: the transaction takes the write lock (waiting out busy_timeout)
    // before it reads anything, so its snapshot cannot go stale.
    sessions::advance_status(&mut tx, session_id, SessionStatus::InProgress).await?;
    sessions::require_session(&mut tx, session_id).await?;
    let outcome =
        answers::upsert_answer(&mut tx, session_id, question_id, audio_path, transcript).await?;
    tx.commit().await?;
    Ok(outcome)
}
