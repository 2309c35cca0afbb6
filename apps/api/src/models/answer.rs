use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;

use crate::errors::AppError;

/// Raw `interview_answers` row. `feedback` is the JSON-encoded column.
#[derive(Debug, Clone, FromRow)]
pub struct AnswerRow {
    pub id: String,
    pub session_id: String,
    pub question_id: String,
    pub audio_path: Option<String>,
    pub transcript: Option<String>,
    pub score: Option<i64>,
    pub feedback: Option<String>,
    pub model_answer: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One candidate response to one question.
///
/// `score` doubles as the idempotency marker: once it is set the answer is
/// never evaluated again. An empty `transcript` means transcription was
/// attempted and produced nothing.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub id: String,
    pub session_id: String,
    pub question_id: String,
    pub audio_path: Option<String>,
    pub transcript: String,
    pub score: Option<i64>,
    pub feedback: Option<Vec<Value>>,
    pub model_answer: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Answer {
    pub fn is_scored(&self) -> bool {
        self.score.is_some()
    }

    pub fn has_transcript(&self) -> bool {
        !self.transcript.trim().is_empty()
    }
}

impl TryFrom<AnswerRow> for Answer {
    type Error = AppError;

    fn try_from(row: AnswerRow) -> Result<Self, Self::Error> {
        let feedback = row
            .feedback
            .as_deref()
            .map(decode_feedback)
            .transpose()
            .with_context(|| format!("Answer {} has malformed feedback", row.id))?;

        Ok(Answer {
            id: row.id,
            session_id: row.session_id,
            question_id: row.question_id,
            audio_path: row.audio_path,
            transcript: row.transcript.unwrap_or_default(),
            score: row.score,
            feedback,
            model_answer: row.model_answer,
            created_at: row.created_at,
        })
    }
}

pub fn encode_feedback(items: &[Value]) -> serde_json::Result<String> {
    serde_json::to_string(items)
}

/// Decodes the stored feedback column into an ordered list. Rows written before
/// feedback was normalised may hold a bare scalar; it becomes a one-item list.
pub fn decode_feedback(raw: &str) -> serde_json::Result<Vec<Value>> {
    Ok(into_feedback_items(serde_json::from_str(raw)?))
}

/// Normalises any JSON value into an ordered feedback list: arrays pass through,
/// null and empty strings become empty, any other scalar or object becomes a single item.
pub fn into_feedback_items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        Value::String(s) if s.trim().is_empty() => Vec::new(),
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(feedback: Option<&str>, transcript: Option<&str>) -> AnswerRow {
        AnswerRow {
            id: "a1".into(),
            session_id: "s1".into(),
            question_id: "q1".into(),
            audio_path: Some("uploads/a.webm".into()),
            transcript: transcript.map(String::from),
            score: None,
            feedback: feedback.map(String::from),
            model_answer: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_feedback_round_trips_structured_items() {
        let items = vec![
            json!("Good structure"),
            json!({"aspect": "clarity", "comment": "Too long"}),
        ];
        let encoded = encode_feedback(&items).unwrap();
        let answer = Answer::try_from(row(Some(&encoded), Some("hi"))).unwrap();
        assert_eq!(answer.feedback, Some(items));
    }

    #[test]
    fn test_legacy_scalar_feedback_becomes_list() {
        let answer = Answer::try_from(row(Some(r#""Be concise""#), Some("hi"))).unwrap();
        assert_eq!(answer.feedback, Some(vec![json!("Be concise")]));
    }

    #[test]
    fn test_null_columns_decode_to_unevaluated_answer() {
        let answer = Answer::try_from(row(None, None)).unwrap();
        assert_eq!(answer.feedback, None);
        assert_eq!(answer.transcript, "");
        assert!(!answer.has_transcript());
        assert!(!answer.is_scored());
    }

    #[test]
    fn test_into_feedback_items() {
        assert_eq!(into_feedback_items(Value::Null), Vec::<Value>::new());
        assert_eq!(into_feedback_items(json!("")), Vec::<Value>::new());
        assert_eq!(into_feedback_items(json!("ok")), vec![json!("ok")]);
        assert_eq!(
            into_feedback_items(json!(["a", "b"])),
            vec![json!("a"), json!("b")]
        );
    }
}
