use async_trait::async_trait;
use voice_study_core::{ParticipantProgress, ProgressUpdate, Session};

use crate::error::StorageError;

/// Per (participant, session) resumption checkpoints.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Overwrite the checkpoint; last write wins.
    async fn upsert_progress(
        &self,
        update: &ProgressUpdate,
    ) -> Result<ParticipantProgress, StorageError>;

    async fn get_progress(
        &self,
        participant_id: &str,
        session: Session,
    ) -> Result<Option<ParticipantProgress>, StorageError>;

    /// Every checkpoint of one participant ordered by session.
    async fn list_progress(
        &self,
        participant_id: &str,
    ) -> Result<Vec<ParticipantProgress>, StorageError>;
}
