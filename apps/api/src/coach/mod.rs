//! Interview coach: the LLM-backed collaborator that writes questions,
//! reference answers, and evaluations.
//!
//! `AppState` holds an `Arc<dyn InterviewModel>`; tests swap in a scripted model.

pub mod prompts;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::coach::prompts::{
    EVALUATION_PROMPT, EVALUATION_SYSTEM, QUESTIONS_PROMPT, QUESTIONS_SYSTEM, REFERENCE_PROMPT,
    REFERENCE_SYSTEM,
};
use crate::llm_client::prompts::{CANDIDATE_GROUNDING, JSON_ONLY_SYSTEM};
use crate::llm_client::{Completion, LlmClient, LlmError};
use crate::models::Question;

/// Roughly one question per two minutes of interview.
const SECONDS_PER_QUESTION: i64 = 120;
const MIN_QUESTIONS: i64 = 3;
const MAX_QUESTIONS: i64 = 15;

/// Output token budgets per call. A question list is the longest output;
/// reference answers are a few spoken paragraphs.
const QUESTIONS_MAX_TOKENS: u32 = 2048;
const REFERENCE_MAX_TOKENS: u32 = 768;
const EVALUATION_MAX_TOKENS: u32 = 1536;

#[async_trait]
pub trait InterviewModel: Send + Sync {
    async fn generate_questions(
        &self,
        job_description: &str,
        resume_text: &str,
        duration_seconds: i64,
    ) -> Result<Vec<Question>, LlmError>;

    async fn generate_reference_answer(
        &self,
        question: &str,
        job_description: &str,
        resume_text: &str,
    ) -> Result<String, LlmError>;

    /// Returns the evaluator's raw JSON. Callers validate its shape.
    async fn evaluate_answer(
        &self,
        question: &str,
        transcript: &str,
        reference_answer: &str,
    ) -> Result<Value, LlmError>;
}

pub fn question_count(duration_seconds: i64) -> i64 {
    (duration_seconds / SECONDS_PER_QUESTION).clamp(MIN_QUESTIONS, MAX_QUESTIONS)
}

#[derive(Debug, Deserialize)]
struct GeneratedQuestions {
    questions: Vec<Question>,
}

/// Claude-backed coach. All calls go through the shared `LlmClient`.
pub struct ClaudeCoach(pub LlmClient);

#[async_trait]
impl InterviewModel for ClaudeCoach {
    async fn generate_questions(
        &self,
        job_description: &str,
        resume_text: &str,
        duration_seconds: i64,
    ) -> Result<Vec<Question>, LlmError> {
        let prompt = QUESTIONS_PROMPT
            .replace("{count}", &question_count(duration_seconds).to_string())
            .replace("{minutes}", &(duration_seconds / 60).max(1).to_string())
            .replace("{job_description}", job_description)
            .replace("{resume_text}", resume_text);
        let system = format!("{QUESTIONS_SYSTEM} {CANDIDATE_GROUNDING}");

        let generated: GeneratedQuestions = self
            .0
            .complete_json(Completion {
                system: &system,
                prompt: &prompt,
                max_tokens: QUESTIONS_MAX_TOKENS,
            })
            .await?;
        Ok(generated.questions)
    }

    async fn generate_reference_answer(
        &self,
        question: &str,
        job_description: &str,
        resume_text: &str,
    ) -> Result<String, LlmError> {
        let prompt = REFERENCE_PROMPT
            .replace("{question}", question)
            .replace("{job_description}", job_description)
            .replace("{resume_text}", resume_text);
        let system = format!("{REFERENCE_SYSTEM} {CANDIDATE_GROUNDING}");

        self.0
            .complete(Completion {
                system: &system,
                prompt: &prompt,
                max_tokens: REFERENCE_MAX_TOKENS,
            })
            .await
    }

    async fn evaluate_answer(
        &self,
        question: &str,
        transcript: &str,
        reference_answer: &str,
    ) -> Result<Value, LlmError> {
        let prompt = EVALUATION_PROMPT
            .replace("{question}", question)
            .replace("{reference_answer}", reference_answer)
            .replace("{transcript}", transcript);
        let system = format!("{EVALUATION_SYSTEM} {JSON_ONLY_SYSTEM}");

        self.0
            .complete_json(Completion {
                system: &system,
                prompt: &prompt,
                max_tokens: EVALUATION_MAX_TOKENS,
            })
            .await
    }
}
