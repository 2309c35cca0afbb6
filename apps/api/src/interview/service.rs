use std::collections::HashSet;

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::coach::InterviewModel;
use crate::db::retry::{with_retry, RetryPolicy};
use crate::errors::AppError;
use crate::models::{Answer, Question, Session, SessionStatus};
use crate::store::{answers, sessions};

#[derive(Debug, Clone)]
pub struct NewSession {
    pub job_description: String,
    pub resume_text: String,
    pub duration_seconds: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedSession {
    pub session_id: String,
    pub questions: Vec<Question>,
    pub duration_seconds: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionDetail {
    pub session: Session,
    pub answers: Vec<Answer>,
}

/// Generates the question set and stores the session with it in one insert.
pub async fn create_session(
    pool: &SqlitePool,
    coach: &dyn InterviewModel,
    retry: &RetryPolicy,
    input: NewSession,
) -> Result<CreatedSession, AppError> {
    if input.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "job_description cannot be empty".to_string(),
        ));
    }
    if input.duration_seconds <= 0 {
        return Err(AppError::Validation(
            "duration must be a positive number of seconds".to_string(),
        ));
    }

    let questions = coach
        .generate_questions(
            &input.job_description,
            &input.resume_text,
            input.duration_seconds,
        )
        .await
        .map_err(|e| AppError::Llm(format!("Question generation failed: {e}")))?;
    let questions = normalize_question_ids(questions);

    let now = Utc::now();
    let session = Session {
        id: Uuid::new_v4().to_string(),
        job_description: input.job_description,
        resume_text: input.resume_text,
        duration_seconds: input.duration_seconds,
        questions,
        status: SessionStatus::Created,
        created_at: now,
        updated_at: now,
    };

    let session_ref = &session;
    with_retry(retry, "create_session", || async move {
        let mut conn = pool.acquire().await?;
        sessions::insert_session(&mut conn, session_ref).await
    })
    .await?;

    info!(
        "Created session {} with {} questions",
        session.id,
        session.questions.len()
    );

    Ok(CreatedSession {
        session_id: session.id,
        questions: session.questions,
        duration_seconds: session.duration_seconds,
    })
}

/// Session plus answers, read from one snapshot.
pub async fn get_session(pool: &SqlitePool, session_id: &str) -> Result<SessionDetail, AppError> {
    let mut tx = pool.begin().await?;
    let session = sessions::require_session(&mut tx, session_id).await?;
    let answers = answers::list_answers(&mut tx, session_id).await?;
    tx.commit().await?;

    Ok(SessionDetail { session, answers })
}

pub async fn list_sessions(
    pool: &SqlitePool,
    status: Option<SessionStatus>,
) -> Result<Vec<Session>, AppError> {
    let mut conn = pool.acquire().await?;
    sessions::list_sessions(&mut conn, status).await
}

/// Question ids must be unique within a session. Blank or repeated ids are
/// replaced with the next free `q<n>`.
pub fn normalize_question_ids(questions: Vec<Question>) -> Vec<Question> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut normalized = Vec::with_capacity(questions.len());

    for (index, question) in questions.into_iter().enumerate() {
        let id = question.id.trim().to_string();
        let id = if id.is_empty() || seen.contains(&id) {
            let mut n = index + 1;
            while seen.contains(&format!("q{n}")) {
                n += 1;
            }
            format!("q{n}")
        } else {
            id
        };
        seen.insert(id.clone());
        normalized.push(Question {
            id,
            text: question.text.trim().to_string(),
        });
    }

    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{questions, test_pool, ScriptedCoach};
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tempfile::TempDir;

    fn input() -> NewSession {
        NewSession {
            job_description: "Senior Rust engineer".to_string(),
            resume_text: "Built a trading engine in Rust".to_string(),
            duration_seconds: 600,
        }
    }

    fn retry() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_create_then_get_session() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;
        let coach = ScriptedCoach {
            questions: questions(&[
                ("q1", "Tell me about yourself"),
                ("q2", "Why this role?"),
            ]),
            ..Default::default()
        };

        let created = create_session(&pool, &coach, &retry(), input()).await.unwrap();
        assert_eq!(created.questions.len(), 2);
        assert_eq!(created.duration_seconds, 600);

        let detail = get_session(&pool, &created.session_id).await.unwrap();
        assert_eq!(detail.session.questions, created.questions);
        assert_eq!(detail.session.status, SessionStatus::Created);
        assert_eq!(detail.session.job_description, "Senior Rust engineer");
        assert!(detail.answers.is_empty());
    }

    #[tokio::test]
    async fn test_empty_job_description_rejected_before_generation() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;
        let coach = ScriptedCoach::default();

        let err = create_session(
            &pool,
            &coach,
            &retry(),
            NewSession {
                job_description: "   ".to_string(),
                ..input()
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(coach.question_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_get_missing_session_is_not_found() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;

        let err = get_session(&pool, "missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_normalize_question_ids() {
        let normalized = normalize_question_ids(questions(&[
            ("q1", "A"),
            ("", "B"),
            ("q1", "C"),
            ("q2", " D "),
        ]));
        let ids: Vec<_> = normalized.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["q1", "q2", "q3", "q4"]);
        assert_eq!(normalized[3].text, "D");
    }
}
