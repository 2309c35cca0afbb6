use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::SqlitePool;

use crate::errors::AppError;
use crate::models::{Answer, Session, SessionStatus};
use crate::store::{answers, sessions};

/// Everything a renderer needs, with no further store access.
#[derive(Debug, Clone, Serialize)]
pub struct ReportDocument {
    pub session_id: String,
    pub status: SessionStatus,
    pub job_description: String,
    pub duration_seconds: i64,
    pub created_at: DateTime<Utc>,
    /// One entry per question in session order, then answers whose question
    /// id is not part of the session.
    pub entries: Vec<ReportEntry>,
    pub average_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    pub question_id: String,
    pub question: Option<String>,
    pub answer: Option<AnsweredQuestion>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnsweredQuestion {
    pub transcript: String,
    pub audio_path: Option<String>,
    pub score: Option<i64>,
    pub feedback: Vec<Value>,
    pub model_answer: Option<String>,
}

impl From<Answer> for AnsweredQuestion {
    fn from(answer: Answer) -> Self {
        Self {
            transcript: answer.transcript,
            audio_path: answer.audio_path,
            score: answer.score,
            feedback: answer.feedback.unwrap_or_default(),
            model_answer: answer.model_answer,
        }
    }
}

/// Reads the session and its answers from one snapshot. `NotFound` if the
/// session does not exist.
pub async fn build_report(pool: &SqlitePool, session_id: &str) -> Result<ReportDocument, AppError> {
    let mut tx = pool.begin().await?;
    let session = sessions::require_session(&mut tx, session_id).await?;
    let answers = answers::list_answers(&mut tx, session_id).await?;
    tx.commit().await?;

    Ok(assemble(session, answers))
}

fn assemble(session: Session, answers: Vec<Answer>) -> ReportDocument {
    // Stored scores are not range-checked here; sum as f64.
    let scores: Vec<f64> = answers.iter().filter_map(|a| a.score).map(|s| s as f64).collect();
    let average_score = if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    };

    let known: HashSet<&str> = session.questions.iter().map(|q| q.id.as_str()).collect();
    let (mut matched, unmatched): (Vec<Answer>, Vec<Answer>) = answers
        .into_iter()
        .partition(|a| known.contains(a.question_id.as_str()));

    let mut entries: Vec<ReportEntry> = session
        .questions
        .iter()
        .map(|question| {
            let answer = matched
                .iter()
                .position(|a| a.question_id == question.id)
                .map(|index| matched.swap_remove(index).into());
            ReportEntry {
                question_id: question.id.clone(),
                question: Some(question.text.clone()),
                answer,
            }
        })
        .collect();

    entries.extend(unmatched.into_iter().map(|answer| ReportEntry {
        question_id: answer.question_id.clone(),
        question: None,
        answer: Some(answer.into()),
    }));

    ReportDocument {
        session_id: session.id,
        status: session.status,
        job_description: session.job_description,
        duration_seconds: session.duration_seconds,
        created_at: session.created_at,
        entries,
        average_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::answers::Evaluation;
    use crate::testing::{new_session, questions, seed_session, test_pool};
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_entries_follow_question_order() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;
        seed_session(
            &pool,
            &new_session(
                "s1",
                questions(&[("q1", "Tell me about yourself"), ("q2", "Why Rust?")]),
            ),
        )
        .await;

        let mut conn = pool.acquire().await.unwrap();
        answers::upsert_answer(&mut conn, "s1", "q2", "uploads/b.webm", "Memory safety")
            .await
            .unwrap();
        answers::upsert_answer(&mut conn, "s1", "q9", "uploads/c.webm", "Stray answer")
            .await
            .unwrap();
        let first = answers::upsert_answer(&mut conn, "s1", "q1", "uploads/a.webm", "Backend")
            .await
            .unwrap();
        let feedback = vec![json!("Be concise")];
        answers::record_evaluation(
            &mut conn,
            &first.answer_id,
            &Evaluation {
                score: 6,
                feedback: &feedback,
                model_answer: "Reference",
            },
        )
        .await
        .unwrap();
        drop(conn);

        let report = build_report(&pool, "s1").await.unwrap();
        let ids: Vec<&str> = report.entries.iter().map(|e| e.question_id.as_str()).collect();
        assert_eq!(ids, vec!["q1", "q2", "q9"]);

        let q1 = report.entries[0].answer.as_ref().unwrap();
        assert_eq!(q1.score, Some(6));
        assert_eq!(q1.feedback, feedback);
        assert!(report.entries[2].question.is_none());
        assert_eq!(report.average_score, Some(6.0));
    }

    #[tokio::test]
    async fn test_unanswered_questions_are_listed() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;
        seed_session(&pool, &new_session("s1", questions(&[("q1", "Why Rust?")]))).await;

        let report = build_report(&pool, "s1").await.unwrap();
        assert_eq!(report.entries.len(), 1);
        assert!(report.entries[0].answer.is_none());
        assert_eq!(report.average_score, None);
    }

    #[tokio::test]
    async fn test_missing_session_is_not_found() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;

        let err = build_report(&pool, "nope").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_average_of_extreme_stored_scores_does_not_overflow() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;
        seed_session(
            &pool,
            &new_session("s1", questions(&[("q1", "Why Rust?"), ("q2", "Why now?")])),
        )
        .await;
        let mut conn = pool.acquire().await.unwrap();
        for question_id in ["q1", "q2"] {
            answers::upsert_answer(&mut conn, "s1", question_id, "uploads/a.webm", "answer")
                .await
                .unwrap();
        }
        sqlx::query("UPDATE interview_answers SET score = ?")
            .bind(i64::MAX)
            .execute(&mut *conn)
            .await
            .unwrap();
        drop(conn);

        let report = build_report(&pool, "s1").await.unwrap();
        let average = report.average_score.unwrap();
        assert!(average.is_finite());
        assert!(average > 9.0e18);
    }
}
