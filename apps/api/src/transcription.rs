//! Speech-to-text for uploaded answers.

use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

const GROQ_TRANSCRIPTION_URL: &str = "https://api.groq.com/openai/v1/audio/transcriptions";

#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("Failed to read audio: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_path: &Path) -> Result<String, TranscriptionError>;
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

/// Whisper through Groq's OpenAI-compatible transcription endpoint.
#[derive(Clone)]
pub struct WhisperTranscriber {
    client: Client,
    api_key: String,
    model: String,
}

impl WhisperTranscriber {
    pub fn new(api_key: String, model: String) -> Result<Self, TranscriptionError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()?,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<String, TranscriptionError> {
        let bytes = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "answer.webm".to_string());

        let form = Form::new()
            .text("model", self.model.clone())
            .text("response_format", "json")
            .part("file", Part::bytes(bytes).file_name(file_name));

        let response = self
            .client
            .post(GROQ_TRANSCRIPTION_URL)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranscriptionError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: TranscriptionResponse = response.json().await?;
        debug!(
            "Transcribed {} ({} chars)",
            audio_path.display(),
            body.text.len()
        );
        Ok(body.text.trim().to_string())
    }
}
