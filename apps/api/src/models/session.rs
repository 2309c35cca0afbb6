use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::errors::AppError;

/// Session lifecycle. Ordered: a session only ever moves to a later variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Created,
    InProgress,
    Analyzed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Created => "created",
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Analyzed => "analyzed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(SessionStatus::Created),
            "in_progress" => Ok(SessionStatus::InProgress),
            "analyzed" => Ok(SessionStatus::Analyzed),
            other => Err(anyhow!("Unknown session status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    #[serde(default)]
    pub text: String,
}

/// Raw `interview_sessions` row. `questions` is the JSON-encoded column.
#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: String,
    pub job_description: String,
    pub resume_text: String,
    pub duration_seconds: i64,
    pub questions: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: String,
    pub job_description: String,
    pub resume_text: String,
    pub duration_seconds: i64,
    pub questions: Vec<Question>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Text of the question with this id, if the session has one and it is non-empty.
    pub fn question_text(&self, question_id: &str) -> Option<&str> {
        self.questions
            .iter()
            .find(|q| q.id == question_id)
            .map(|q| q.text.as_str())
            .filter(|text| !text.trim().is_empty())
    }
}

impl TryFrom<SessionRow> for Session {
    type Error = AppError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let questions = decode_questions(&row.questions)
            .with_context(|| format!("Session {} has malformed questions", row.id))?;
        let status = row
            .status
            .parse::<SessionStatus>()
            .with_context(|| format!("Session {} has malformed status", row.id))?;

        Ok(Session {
            id: row.id,
            job_description: row.job_description,
            resume_text: row.resume_text,
            duration_seconds: row.duration_seconds,
            questions,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub fn encode_questions(questions: &[Question]) -> serde_json::Result<String> {
    serde_json::to_string(questions)
}

/// Blank columns decode to an empty question list.
pub fn decode_questions(raw: &str) -> serde_json::Result<Vec<Question>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(raw)
}
