//! Shared fixtures for unit tests: throwaway databases and scripted collaborators.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;

use crate::answers::audio_store::AudioStore;
use crate::coach::InterviewModel;
use crate::config::Config;
use crate::llm_client::LlmError;
use crate::models::{Question, Session, SessionStatus};
use crate::report::markdown::MarkdownReportRenderer;
use crate::state::AppState;
use crate::transcription::{Transcriber, TranscriptionError};

/// Fresh on-disk database inside `dir`.
pub async fn test_pool(dir: &TempDir) -> SqlitePool {
    let url = format!("sqlite://{}", dir.path().join("interview.db").display());
    crate::db::create_pool(&url, Duration::from_millis(2_000))
        .await
        .unwrap()
}

pub fn test_config(dir: &TempDir) -> Config {
    Config {
        database_url: format!("sqlite://{}", dir.path().join("interview.db").display()),
        upload_dir: dir.path().join("uploads"),
        anthropic_api_key: "test-key".to_string(),
        groq_api_key: "test-key".to_string(),
        llm_model: "claude-test-model".to_string(),
        transcription_model: "whisper-large-v3".to_string(),
        port: 0,
        rust_log: "debug".to_string(),
        db_busy_timeout: Duration::from_millis(2_000),
        db_max_attempts: 3,
        upload_retry_base: Duration::from_millis(1),
        analyze_retry_base: Duration::from_millis(1),
        max_upload_bytes: 1024 * 1024,
    }
}

/// Full application state over a throwaway database and upload directory.
pub async fn test_state(
    dir: &TempDir,
    coach: ScriptedCoach,
    transcriber: StubTranscriber,
) -> AppState {
    let config = test_config(dir);
    AppState {
        db: test_pool(dir).await,
        coach: Arc::new(coach),
        transcriber: Arc::new(transcriber),
        renderer: Arc::new(MarkdownReportRenderer),
        audio: AudioStore::new(&config.upload_dir).unwrap(),
        config: Arc::new(config),
    }
}

pub fn questions(pairs: &[(&str, &str)]) -> Vec<Question> {
    pairs
        .iter()
        .map(|(id, text)| Question {
            id: id.to_string(),
            text: text.to_string(),
        })
        .collect()
}

pub fn new_session(id: &str, questions: Vec<Question>) -> Session {
    let now = Utc::now();
    Session {
        id: id.to_string(),
        job_description: "Backend engineer, Rust and Postgres".to_string(),
        resume_text: "Five years building payment APIs".to_string(),
        duration_seconds: 900,
        questions,
        status: SessionStatus::Created,
        created_at: now,
        updated_at: now,
    }
}

pub async fn seed_session(pool: &SqlitePool, session: &Session) {
    let mut conn = pool.acquire().await.unwrap();
    crate::store::sessions::insert_session(&mut conn, session)
        .await
        .unwrap();
}

/// Coach with canned outputs, injectable failures, and call counters.
#[derive(Default)]
pub struct ScriptedCoach {
    pub questions: Vec<Question>,
    /// Question texts whose reference generation fails.
    pub failing_references: HashSet<String>,
    /// Transcripts whose evaluation fails.
    pub failing_evaluations: HashSet<String>,
    /// Transcript -> raw evaluator output, overriding the default evaluation.
    pub evaluations: HashMap<String, Value>,
    pub question_calls: AtomicU32,
    pub evaluation_calls: AtomicU32,
    /// Question text -> number of reference generations requested.
    pub reference_calls: Mutex<HashMap<String, u32>>,
}

impl ScriptedCoach {
    pub fn reference_for(question: &str) -> String {
        format!("Reference answer for: {question}")
    }

    pub fn reference_calls(&self, question: &str) -> u32 {
        self.reference_calls
            .lock()
            .unwrap()
            .get(question)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_reference_calls(&self) -> u32 {
        self.reference_calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl InterviewModel for ScriptedCoach {
    async fn generate_questions(
        &self,
        _job_description: &str,
        _resume_text: &str,
        _duration_seconds: i64,
    ) -> Result<Vec<Question>, LlmError> {
        self.question_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.questions.clone())
    }

    async fn generate_reference_answer(
        &self,
        question: &str,
        _job_description: &str,
        _resume_text: &str,
    ) -> Result<String, LlmError> {
        *self
            .reference_calls
            .lock()
            .unwrap()
            .entry(question.to_string())
            .or_default() += 1;

        if self.failing_references.contains(question) {
            return Err(LlmError::EmptyContent);
        }
        Ok(Self::reference_for(question))
    }

    async fn evaluate_answer(
        &self,
        _question: &str,
        transcript: &str,
        _reference_answer: &str,
    ) -> Result<Value, LlmError> {
        self.evaluation_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing_evaluations.contains(transcript) {
            return Err(LlmError::Api {
                status: 500,
                message: "evaluator unavailable".to_string(),
            });
        }
        Ok(self.evaluations.get(transcript).cloned().unwrap_or_else(|| {
            json!({
                "total_score": 8,
                "feedback": ["Clear structure", "Quantify the impact"],
                "model_answer": "Evaluator's own answer"
            })
        }))
    }
}

/// Transcriber returning a fixed transcript, or failing when `transcript` is `None`.
pub struct StubTranscriber {
    pub transcript: Option<String>,
    pub calls: AtomicU32,
}

impl StubTranscriber {
    pub fn returning(transcript: &str) -> Self {
        Self {
            transcript: Some(transcript.to_string()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            transcript: None,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl Transcriber for StubTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<String, TranscriptionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(audio_path.is_file(), "transcribed before audio was finalised");

        match &self.transcript {
            Some(text) => Ok(text.clone()),
            None => Err(TranscriptionError::Api {
                status: 503,
                message: "speech service down".to_string(),
            }),
        }
    }
}
