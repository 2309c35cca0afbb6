use axum::{
    extract::{Multipart, Path, State},
    Json,
};

use crate::answers::upload::{upload_answer, UploadContext, UploadedAnswer};
use crate::errors::AppError;
use crate::interview::handlers::multipart_error;
use crate::state::AppState;

/// POST /upload-answer/:session_id/:question_id
///
/// Multipart field `audio` carries the recording.
pub async fn handle_upload_answer(
    State(state): State<AppState>,
    Path((session_id, question_id)): Path<(String, String)>,
    mut multipart: Multipart,
) -> Result<Json<UploadedAnswer>, AppError> {
    let mut audio = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("audio") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        audio = Some((bytes, file_name));
    }

    let (bytes, file_name) =
        audio.ok_or_else(|| AppError::Validation("audio file is required".to_string()))?;

    let retry = state.config.upload_retry();
    let ctx = UploadContext {
        pool: &state.db,
        audio: &state.audio,
        transcriber: state.transcriber.as_ref(),
        retry: &retry,
    };

    let uploaded = upload_answer(
        &ctx,
        &session_id,
        &question_id,
        bytes,
        file_name.as_deref(),
    )
    .await?;

    Ok(Json(uploaded))
}
