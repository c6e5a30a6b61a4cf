use std::sync::Arc;

use voice_study_core::{AudioUploadMeta, MAX_AUDIO_UPLOAD_BYTES, UploadedAudio, Validator};

use crate::object_store::{ObjectStore, ObjectStoreConfig, SupabaseAudioStore};
use crate::ServiceError;

/// Uploads recorded conversation audio; unconfigured when credentials are absent.
pub struct AudioService {
    store: Option<Arc<dyn ObjectStore>>,
}

impl AudioService {
    #[must_use]
    pub fn new(store: Option<Arc<dyn ObjectStore>>) -> Self {
        Self { store }
    }

    /// Build from `SUPABASE_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let Some(config) = ObjectStoreConfig::from_env() else {
            tracing::warn!("object storage credentials are missing, audio upload disabled");
            return Self::new(None);
        };
        match SupabaseAudioStore::new(config) {
            Ok(store) => Self::new(Some(Arc::new(store))),
            Err(e) => {
                tracing::error!(error = %e, "failed to build object storage client");
                Self::new(None)
            },
        }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.store.is_some()
    }

    /// Store one recording under its canonical object path, overwriting any previous upload.
    pub async fn upload(
        &self,
        meta: &AudioUploadMeta,
        bytes: Vec<u8>,
    ) -> Result<UploadedAudio, ServiceError> {
        let Some(store) = &self.store else {
            return Err(ServiceError::NotConfigured(
                "object storage credentials are missing".to_owned(),
            ));
        };

        let mut v = Validator::new();
        for (path, value) in [
            ("participantId", &meta.participant_id),
            ("taskId", &meta.task_id),
            ("turnId", &meta.turn_id),
        ] {
            if value.trim().is_empty() {
                v.push(path, "is required");
            }
        }
        if bytes.is_empty() {
            v.push("file", "must not be empty");
        } else if bytes.len() > MAX_AUDIO_UPLOAD_BYTES {
            v.push("file", format!("exceeds {MAX_AUDIO_UPLOAD_BYTES} bytes"));
        }
        v.finish().map_err(ServiceError::Validation)?;

        let path = meta.object_path();
        let size = bytes.len();
        store.put(&path, meta.content_type(), bytes).await?;
        tracing::info!(participant_id = %meta.participant_id, path = %path, size, "audio uploaded");
        Ok(UploadedAudio { url: store.public_url(&path), path })
    }
}
