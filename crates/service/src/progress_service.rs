use std::sync::Arc;

use voice_study_core::{ParticipantProgress, ProgressUpdate, Session, Validator};
use voice_study_storage::StorageBackend;
use voice_study_storage::traits::ProgressStore;

use crate::ServiceError;

pub struct ProgressService {
    storage: Arc<StorageBackend>,
}

impl ProgressService {
    #[must_use]
    pub const fn new(storage: Arc<StorageBackend>) -> Self {
        Self { storage }
    }

    /// Overwrite the checkpoint for (participant, session); last write wins.
    pub async fn upsert(
        &self,
        update: &ProgressUpdate,
    ) -> Result<ParticipantProgress, ServiceError> {
        let mut v = Validator::new();
        if update.participant_id.trim().is_empty() {
            v.push("participantId", "must not be empty");
        }
        let task_count = update.session.task_count();
        if update.task_index < 0 {
            v.push("taskIndex", "must be >= 0");
        } else if usize::try_from(update.task_index).unwrap_or(usize::MAX) >= task_count {
            v.push("taskIndex", format!("must be < {task_count} for session {}", update.session));
        }
        v.finish().map_err(ServiceError::Validation)?;

        let saved = self.storage.upsert_progress(update).await?;
        tracing::info!(
            participant_id = %saved.participant_id,
            session = %saved.session,
            task_index = saved.task_index,
            stage = %saved.stage,
            completed = saved.completed,
            "progress saved"
        );
        Ok(saved)
    }

    /// `None` means the session has not been started.
    pub async fn get(
        &self,
        participant_id: &str,
        session: Session,
    ) -> Result<Option<ParticipantProgress>, ServiceError> {
        Ok(self.storage.get_progress(participant_id, session).await?)
    }

    /// Every checkpoint for the participant, ordered by session.
    pub async fn list(
        &self,
        participant_id: &str,
    ) -> Result<Vec<ParticipantProgress>, ServiceError> {
        Ok(self.storage.list_progress(participant_id).await?)
    }
}
