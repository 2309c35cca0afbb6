use std::collections::HashMap;

use crate::coach::InterviewModel;
use crate::llm_client::LlmError;

/// Reference answers generated during one evaluation pass, keyed by question id.
///
/// Lives for exactly one `analyze` call. A failed generation stores nothing,
/// so the next answer to the same question tries again.
#[derive(Debug, Default)]
pub struct ReferenceCache {
    answers: HashMap<String, String>,
}

impl ReferenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_create(
        &mut self,
        coach: &dyn InterviewModel,
        question_id: &str,
        question_text: &str,
        job_description: &str,
        resume_text: &str,
    ) -> Result<String, LlmError> {
        if let Some(reference) = self.answers.get(question_id) {
            return Ok(reference.clone());
        }

        let reference = coach
            .generate_reference_answer(question_text, job_description, resume_text)
            .await?;
        self.answers
            .insert(question_id.to_string(), reference.clone());
        Ok(reference)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }
}
