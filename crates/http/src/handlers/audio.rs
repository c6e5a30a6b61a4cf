use std::sync::Arc;

use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use voice_study_core::{AudioUploadMeta, Role, UploadedAudio, Validator};

use crate::AppState;
use crate::api_error::ApiError;

#[derive(Default)]
struct UploadForm {
    file: Option<Vec<u8>>,
    file_content_type: Option<String>,
    participant_id: Option<String>,
    task_id: Option<String>,
    session: Option<String>,
    turn_id: Option<String>,
    role: Option<String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_owned();
            if name == "file" {
                form.file_content_type = field.content_type().map(ToOwned::to_owned);
                form.file = Some(field.bytes().await?.to_vec());
                continue;
            }
            let value = field.text().await?;
            match name.as_str() {
                "participantId" => form.participant_id = Some(value),
                "taskId" => form.task_id = Some(value),
                "session" => form.session = Some(value),
                "turnId" => form.turn_id = Some(value),
                "role" => form.role = Some(value),
                other => tracing::debug!(field = other, "ignoring unknown upload field"),
            }
        }
        Ok(form)
    }

    fn into_checked(self) -> Result<(AudioUploadMeta, Vec<u8>), ApiError> {
        let mut v = Validator::new();
        if self.file.is_none() {
            v.push("file", "is required");
        }
        let participant_id = v.required("participantId", self.participant_id);
        let task_id = v.required("taskId", self.task_id);
        let turn_id = v.required("turnId", self.turn_id);
        let role = v.parse::<Role>("role", self.role);
        let file = self.file;
        let content_type = self.file_content_type;
        let session = self.session.unwrap_or_default();
        let checked = v.finish_with(|| {
            let meta = AudioUploadMeta {
                participant_id: participant_id?,
                task_id: task_id?,
                session,
                turn_id: turn_id?,
                role: role?,
                content_type,
            };
            Some((meta, file?))
        })?;
        Ok(checked)
    }
}

/// Multipart upload of one recorded utterance; answers `{url, path}`.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadedAudio>, ApiError> {
    let form = UploadForm::read(multipart?).await?;
    let (meta, bytes) = form.into_checked()?;
    Ok(Json(state.audio_service.upload(&meta, bytes).await?))
}
