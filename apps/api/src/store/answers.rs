use anyhow::Context;
use chrono::Utc;
use serde_json::Value;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::answer::{encode_feedback, AnswerRow};
use crate::models::Answer;

/// Result of writing an answer for a `(session_id, question_id)` pair.
#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub answer_id: String,
    /// Audio of the answer this upload replaced, if it was a re-recording.
    pub previous_audio_path: Option<String>,
    pub replaced: bool,
}

/// The evaluation fields written once an answer has been scored.
#[derive(Debug, Clone)]
pub struct Evaluation<'a> {
    pub score: i64,
    pub feedback: &'a [Value],
    pub model_answer: &'a str,
}

pub async fn list_answers(
    conn: &mut SqliteConnection,
    session_id: &str,
) -> Result<Vec<Answer>, AppError> {
    sqlx::query_as::<_, AnswerRow>(
        "SELECT * FROM interview_answers WHERE session_id = ? ORDER BY created_at, rowid",
    )
    .bind(session_id)
    .fetch_all(conn)
    .await?
    .into_iter()
    .map(Answer::try_from)
    .collect()
}

#[cfg(test)]
pub async fn find_answer(
    conn: &mut SqliteConnection,
    session_id: &str,
    question_id: &str,
) -> Result<Option<Answer>, AppError> {
    sqlx::query_as::<_, AnswerRow>(
        "SELECT * FROM interview_answers WHERE session_id = ? AND question_id = ?",
    )
    .bind(session_id)
    .bind(question_id)
    .fetch_optional(conn)
    .await?
    .map(Answer::try_from)
    .transpose()
}

/// Insert-or-update keyed by `(session_id, question_id)`.
///
/// A re-recording replaces audio and transcript in place and clears any
/// previous evaluation, so the new transcript is scored on the next analysis.
pub async fn upsert_answer(
    conn: &mut SqliteConnection,
    session_id: &str,
    question_id: &str,
    audio_path: &str,
    transcript: &str,
) -> Result<UpsertOutcome, AppError> {
    let existing: Option<(String, Option<String>)> = sqlx::query_as(
        "SELECT id, audio_path FROM interview_answers WHERE session_id = ? AND question_id = ?",
    )
    .bind(session_id)
    .bind(question_id)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some((answer_id, previous_audio_path)) = existing {
        sqlx::query(
            r#"
            UPDATE interview_answers
            SET audio_path = ?, transcript = ?, score = NULL, feedback = NULL, model_answer = NULL
            WHERE id = ?
            "#,
        )
        .bind(audio_path)
        .bind(transcript)
        .bind(&answer_id)
        .execute(&mut *conn)
        .await?;

        return Ok(UpsertOutcome {
            answer_id,
            previous_audio_path,
            replaced: true,
        });
    }

    let answer_id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO interview_answers
            (id, session_id, question_id, audio_path, transcript, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&answer_id)
    .bind(session_id)
    .bind(question_id)
    .bind(audio_path)
    .bind(transcript)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(UpsertOutcome {
        answer_id,
        previous_audio_path: None,
        replaced: false,
    })
}

/// Stores an evaluation on an answer that is still unscored. Returns `false`
/// when the answer was scored (or removed) by someone else first.
pub async fn record_evaluation(
    conn: &mut SqliteConnection,
    answer_id: &str,
    evaluation: &Evaluation<'_>,
) -> Result<bool, AppError> {
    let feedback = encode_feedback(evaluation.feedback)
        .with_context(|| format!("Failed to encode feedback for answer {answer_id}"))?;

    let result = sqlx::query(
        r#"
        UPDATE interview_answers
        SET score = ?, feedback = ?, model_answer = ?
        WHERE id = ? AND score IS NULL
        "#,
    )
    .bind(evaluation.score)
    .bind(feedback)
    .bind(evaluation.model_answer)
    .bind(answer_id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{new_session, questions, seed_session, test_pool};
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_upsert_twice_keeps_one_row_with_latest_audio() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;
        seed_session(&pool, &new_session("s1", questions(&[("q1", "Why Rust?")]))).await;
        let mut conn = pool.acquire().await.unwrap();

        let first = upsert_answer(&mut conn, "s1", "q1", "uploads/a.webm", "first take")
            .await
            .unwrap();
        assert!(!first.replaced);

        let second = upsert_answer(&mut conn, "s1", "q1", "uploads/b.webm", "second take")
            .await
            .unwrap();
        assert!(second.replaced);
        assert_eq!(second.answer_id, first.answer_id);
        assert_eq!(second.previous_audio_path.as_deref(), Some("uploads/a.webm"));

        let answers = list_answers(&mut conn, "s1").await.unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].audio_path.as_deref(), Some("uploads/b.webm"));
        assert_eq!(answers[0].transcript, "second take");
    }

    #[tokio::test]
    async fn test_rerecording_clears_previous_evaluation() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;
        seed_session(&pool, &new_session("s1", questions(&[("q1", "Why Rust?")]))).await;
        let mut conn = pool.acquire().await.unwrap();

        let outcome = upsert_answer(&mut conn, "s1", "q1", "uploads/a.webm", "memory safety")
            .await
            .unwrap();
        let feedback = vec![json!("Mention the borrow checker")];
        record_evaluation(
            &mut conn,
            &outcome.answer_id,
            &Evaluation {
                score: 7,
                feedback: &feedback,
                model_answer: "Ideal answer",
            },
        )
        .await
        .unwrap();

        upsert_answer(&mut conn, "s1", "q1", "uploads/b.webm", "fearless concurrency")
            .await
            .unwrap();

        let answer = find_answer(&mut conn, "s1", "q1").await.unwrap().unwrap();
        assert_eq!(answer.score, None);
        assert_eq!(answer.feedback, None);
        assert_eq!(answer.model_answer, None);
    }

    #[tokio::test]
    async fn test_feedback_round_trips_through_store() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;
        seed_session(&pool, &new_session("s1", questions(&[("q1", "Why Rust?")]))).await;
        let mut conn = pool.acquire().await.unwrap();

        let outcome = upsert_answer(&mut conn, "s1", "q1", "uploads/a.webm", "speed")
            .await
            .unwrap();
        let feedback = vec![
            json!("Good opening"),
            json!({"criterion": "depth", "note": "Give a concrete example", "points": 2}),
        ];
        record_evaluation(
            &mut conn,
            &outcome.answer_id,
            &Evaluation {
                score: 6,
                feedback: &feedback,
                model_answer: "Rust gives C-level speed with memory safety.",
            },
        )
        .await
        .unwrap();

        let answer = find_answer(&mut conn, "s1", "q1").await.unwrap().unwrap();
        assert_eq!(answer.score, Some(6));
        assert_eq!(answer.feedback, Some(feedback));
        assert_eq!(
            answer.model_answer.as_deref(),
            Some("Rust gives C-level speed with memory safety.")
        );
    }

    #[tokio::test]
    async fn test_answer_for_missing_session_violates_foreign_key() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;
        let mut conn = pool.acquire().await.unwrap();

        let err = upsert_answer(&mut conn, "ghost", "q1", "uploads/a.webm", "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }

    #[tokio::test]
    async fn test_scored_answer_is_never_overwritten() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;
        seed_session(&pool, &new_session("s1", questions(&[("q1", "Why Rust?")]))).await;
        let mut conn = pool.acquire().await.unwrap();

        let outcome = upsert_answer(&mut conn, "s1", "q1", "uploads/a.webm", "speed")
            .await
            .unwrap();
        let first = vec![json!("First pass")];
        let second = vec![json!("Second pass")];

        let stored = record_evaluation(
            &mut conn,
            &outcome.answer_id,
            &Evaluation {
                score: 6,
                feedback: &first,
                model_answer: "Reference",
            },
        )
        .await
        .unwrap();
        let overwritten = record_evaluation(
            &mut conn,
            &outcome.answer_id,
            &Evaluation {
                score: 2,
                feedback: &second,
                model_answer: "Other reference",
            },
        )
        .await
        .unwrap();

        assert!(stored);
        assert!(!overwritten);
        let answer = find_answer(&mut conn, "s1", "q1").await.unwrap().unwrap();
        assert_eq!(answer.score, Some(6));
        assert_eq!(answer.feedback, Some(first));
    }
}
