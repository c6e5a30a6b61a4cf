use std::sync::Arc;

use voice_study_core::{Condition, PlaybackAsset, TaskId};
use voice_study_storage::StorageBackend;
use voice_study_storage::traits::PlaybackStore;

use crate::ServiceError;

pub struct PlaybackService {
    storage: Arc<StorageBackend>,
}

impl PlaybackService {
    #[must_use]
    pub const fn new(storage: Arc<StorageBackend>) -> Self {
        Self { storage }
    }

    pub async fn get(
        &self,
        participant_id: &str,
        task_id: TaskId,
        condition_id: Condition,
    ) -> Result<PlaybackAsset, ServiceError> {
        self.storage.get_playback_asset(participant_id, task_id, condition_id).await?.ok_or_else(
            || ServiceError::NotFound {
                entity: "playback asset",
                id: format!("{participant_id}/{task_id}/{condition_id}"),
            },
        )
    }

    pub async fn list(&self, participant_id: &str) -> Result<Vec<PlaybackAsset>, ServiceError> {
        Ok(self.storage.list_playback_assets(participant_id).await?)
    }

    /// Curate the audio for an existing asset; registration never overwrites it.
    pub async fn set_audio_url(
        &self,
        participant_id: &str,
        task_id: TaskId,
        condition_id: Condition,
        audio_url: &str,
    ) -> Result<PlaybackAsset, ServiceError> {
        if audio_url.trim().is_empty() {
            return Err(ServiceError::invalid("audioUrl", "must not be empty"));
        }
        let asset = self
            .storage
            .set_playback_audio_url(participant_id, task_id, condition_id, audio_url.trim())
            .await?;
        tracing::info!(
            participant_id,
            task_id = %task_id,
            condition_id = %condition_id,
            "playback audio set"
        );
        Ok(asset)
    }
}
