use crate::errors::AppError;

/// Extracts plain text from an uploaded resume PDF. Runs on the blocking pool.
pub async fn extract_text(pdf_bytes: Vec<u8>) -> Result<String, AppError> {
    if pdf_bytes.is_empty() {
        return Err(AppError::Validation("Resume file is empty".to_string()));
    }

    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&pdf_bytes))
        .await
        .map_err(|e| {
            // pdf-extract panics on some malformed documents
            if e.is_panic() {
                AppError::Validation("Could not read resume PDF".to_string())
            } else {
                AppError::Internal(e.into())
            }
        })?
        .map_err(|e| AppError::Validation(format!("Could not read resume PDF: {e}")))?;

    Ok(text.trim().to_string())
}
