//! The evaluation pass for one session.
//!
//! Flow: read session + answers → short-circuit if it has no questions →
//! skip scored / ineligible answers → reference (cached per question) →
//! evaluate → persist scores → mark session analyzed.
//!
//! No transaction is open while the collaborators run. The read is one short
//! snapshot and the writes are one short transaction, each through
//! `with_retry`, so contention retries the SQL and never the model calls.
//! A score is only written onto an answer that is still unscored; a
//! concurrent pass that got there first wins and this pass counts the
//! answer as already scored.

use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};

use crate::coach::InterviewModel;
use crate::db::retry::{with_retry, RetryPolicy};
use crate::errors::AppError;
use crate::evaluation::reference_cache::ReferenceCache;
use crate::evaluation::scoring::{interpret_evaluation, EvaluationError, ScoredAnswer};
use crate::llm_client::LlmError;
use crate::models::{Answer, Session, SessionStatus};
use crate::store::answers::{self, Evaluation};
use crate::store::sessions;

/// Outcome counts of one evaluation pass. `analyzed` means the pass
/// completed, not that every answer was scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisSummary {
    pub status: &'static str,
    pub message: &'static str,
    pub scored: usize,
    pub already_scored: usize,
    pub ineligible: usize,
    pub failed: usize,
}

impl AnalysisSummary {
    fn completed() -> Self {
        Self {
            status: "success",
            message: "Analysis complete",
            scored: 0,
            already_scored: 0,
            ineligible: 0,
            failed: 0,
        }
    }
}

pub struct AnalyzeContext<'a> {
    pub pool: &'a SqlitePool,
    pub coach: &'a dyn InterviewModel,
    pub retry: &'a RetryPolicy,
}

#[derive(Debug, Error)]
enum AnswerFailure {
    #[error("reference generation failed: {0}")]
    Reference(LlmError),

    #[error("evaluation failed: {0}")]
    Evaluator(LlmError),

    #[error("malformed evaluation: {0}")]
    Malformed(#[from] EvaluationError),
}

/// Evaluations computed by this pass, waiting to be written.
struct PendingScore {
    answer_id: String,
    scored: ScoredAnswer,
}

#[derive(Debug, Default)]
struct PersistOutcome {
    stored: usize,
    raced: usize,
    failed: usize,
}

pub async fn analyze_session(
    ctx: &AnalyzeContext<'_>,
    session_id: &str,
) -> Result<AnalysisSummary, AppError> {
    let (session, answers) = with_retry(ctx.retry, "analyze_session.read", || {
        read_session(ctx.pool, session_id)
    })
    .await?;
    let mut summary = AnalysisSummary::completed();

    if session.questions.is_empty() {
        with_retry(ctx.retry, "analyze_session.persist", || {
            persist_scores(ctx.pool, session_id, &[])
        })
        .await?;
        info!("Session {session_id} has no questions; marked analyzed");
        return Ok(summary);
    }

    let mut cache = ReferenceCache::new();
    let mut pending: Vec<PendingScore> = Vec::new();

    for answer in &answers {
        if answer.is_scored() {
            summary.already_scored += 1;
            continue;
        }
        let Some(question_text) = eligible_question(&session, answer) else {
            summary.ineligible += 1;
            continue;
        };

        match evaluate_answer(ctx.coach, &mut cache, &session, answer, question_text).await {
            Ok(scored) => pending.push(PendingScore {
                answer_id: answer.id.clone(),
                scored,
            }),
            Err(e) => {
                warn!(
                    session_id,
                    answer_id = %answer.id,
                    question_id = %answer.question_id,
                    "Skipping answer: {e}"
                );
                summary.failed += 1;
            }
        }
    }

    let outcome = with_retry(ctx.retry, "analyze_session.persist", || {
        persist_scores(ctx.pool, session_id, &pending)
    })
    .await?;
    summary.scored = outcome.stored;
    summary.already_scored += outcome.raced;
    summary.failed += outcome.failed;

    info!(
        session_id,
        scored = summary.scored,
        already_scored = summary.already_scored,
        ineligible = summary.ineligible,
        failed = summary.failed,
        references = cache.len(),
        "Analysis complete"
    );
    Ok(summary)
}

async fn read_session(
    pool: &SqlitePool,
    session_id: &str,
) -> Result<(Session, Vec<Answer>), AppError> {
    let mut tx = pool.begin().await?;
    let session = sessions::require_session(&mut tx, session_id).await?;
    let answers = answers::list_answers(&mut tx, session_id).await?;
    tx.commit().await?;
    Ok((session, answers))
}

/// Writes every pending score and advances the session, in one transaction.
/// Contention aborts the attempt so nothing half-commits; any other per-answer
/// error is logged and counted.
async fn persist_scores(
    pool: &SqlitePool,
    session_id: &str,
    pending: &[PendingScore],
) -> Result<PersistOutcome, AppError> {
    let mut tx = pool.begin().await?;
    let mut outcome = PersistOutcome::default();

    for PendingScore { answer_id, scored } in pending {
        let evaluation = Evaluation {
            score: scored.score,
            feedback: &scored.feedback,
            model_answer: &scored.model_answer,
        };
        match answers::record_evaluation(&mut tx, answer_id, &evaluation).await {
            Ok(true) => outcome.stored += 1,
            Ok(false) => outcome.raced += 1,
            Err(e) if e.is_contention() => return Err(e),
            Err(e) => {
                warn!(session_id, answer_id = %answer_id, "Failed to store evaluation: {e}");
                outcome.failed += 1;
            }
        }
    }

    if !sessions::advance_status(&mut tx, session_id, SessionStatus::Analyzed).await? {
        // Either already analyzed or deleted since the read.
        sessions::require_session(&mut tx, session_id).await?;
    }
    tx.commit().await?;
    Ok(outcome)
}

/// The question text for an unscored answer that can be evaluated: it has a
/// transcript and its question id resolves to non-empty text in the session.
fn eligible_question<'s>(session: &'s Session, answer: &Answer) -> Option<&'s str> {
    if !answer.has_transcript() {
        return None;
    }
    session.question_text(&answer.question_id)
}

async fn evaluate_answer(
    coach: &dyn InterviewModel,
    cache: &mut ReferenceCache,
    session: &Session,
    answer: &Answer,
    question_text: &str,
) -> Result<ScoredAnswer, AnswerFailure> {
    let reference = cache
        .get_or_create(
            coach,
            &answer.question_id,
            question_text,
            &session.job_description,
            &session.resume_text,
        )
        .await
        .map_err(AnswerFailure::Reference)?;

    let raw = coach
        .evaluate_answer(question_text, &answer.transcript, &reference)
        .await
        .map_err(AnswerFailure::Evaluator)?;

    Ok(interpret_evaluation(raw, &reference)?)
}
