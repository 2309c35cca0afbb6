//! Validation of raw evaluator output.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::answer::into_feedback_items;

#[derive(Debug, Error, PartialEq)]
pub enum EvaluationError {
    #[error("evaluator returned {0}, expected a JSON object")]
    NotAnObject(&'static str),

    #[error("evaluation has no numeric total_score or score")]
    MissingScore,

    #[error("score {0} is outside the 0 to 10 scale")]
    ScoreOutOfRange(f64),
}

/// Evaluations are scored out of ten (see `coach::prompts::EVALUATION_PROMPT`).
pub const MAX_SCORE: i64 = 10;

/// A well-formed evaluation, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredAnswer {
    pub score: i64,
    pub feedback: Vec<Value>,
    pub model_answer: String,
}

/// Turns the evaluator's JSON into a `ScoredAnswer`.
///
/// The score comes from `total_score`, falling back to `score`. `model_answer`
/// is the reference answer, or the evaluator's own answer when the reference is blank.
pub fn interpret_evaluation(
    raw: Value,
    reference_answer: &str,
) -> Result<ScoredAnswer, EvaluationError> {
    let mut fields: Map<String, Value> = match raw {
        Value::Object(fields) => fields,
        other => return Err(EvaluationError::NotAnObject(kind(&other))),
    };

    let raw_score = fields
        .get("total_score")
        .and_then(numeric_score)
        .or_else(|| fields.get("score").and_then(numeric_score))
        .ok_or(EvaluationError::MissingScore)?;
    let score = raw_score.round();
    if !(0.0..=MAX_SCORE as f64).contains(&score) {
        return Err(EvaluationError::ScoreOutOfRange(raw_score));
    }
    let score = score as i64;

    let feedback = into_feedback_items(fields.remove("feedback").unwrap_or(Value::Null));

    let model_answer = if reference_answer.trim().is_empty() {
        fields
            .get("model_answer")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    } else {
        reference_answer.to_string()
    };

    Ok(ScoredAnswer {
        score,
        feedback,
        model_answer,
    })
}

/// Numbers and numeric strings; the caller rounds and range-checks.
fn numeric_score(value: &Value) -> Option<f64> {
    let score = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    score.is_finite().then_some(score)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
