use async_trait::async_trait;
use voice_study_core::{
    Assignment, Condition, Group, GroupCounts, Participant, PlaybackAsset, TaskId,
};

use crate::error::StorageError;
use crate::types::Registration;

/// Participant enrollment: the registrar and its read side.
#[async_trait]
pub trait ParticipantStore: Send + Sync {
    /// Register `id`, or return the existing registration unchanged.
    ///
    /// One transaction covers group resolution, the participant row, the three
    /// assignments and the three placeholder playback assets. Concurrent calls
    /// are serialized so two registrations never read the same group counts.
    async fn register_participant(
        &self,
        id: &str,
        explicit_group: Option<Group>,
    ) -> Result<Registration, StorageError>;

    async fn get_participant(&self, id: &str) -> Result<Option<Participant>, StorageError>;

    /// All participants, newest first.
    async fn list_participants(&self) -> Result<Vec<Participant>, StorageError>;

    /// Assignments of one participant ordered by `order_index`.
    async fn list_assignments(&self, participant_id: &str) -> Result<Vec<Assignment>, StorageError>;

    /// Participant count per group; groups without participants count 0.
    async fn group_counts(&self) -> Result<GroupCounts, StorageError>;
}

/// Playback assets provisioned by registration and curated by hand.
#[async_trait]
pub trait PlaybackStore: Send + Sync {
    async fn get_playback_asset(
        &self,
        participant_id: &str,
        task_id: TaskId,
        condition_id: Condition,
    ) -> Result<Option<PlaybackAsset>, StorageError>;

    /// Assets of one participant ordered by task.
    async fn list_playback_assets(
        &self,
        participant_id: &str,
    ) -> Result<Vec<PlaybackAsset>, StorageError>;

    /// Set `audio_url` on an existing asset. `NotFound` if registration never created it.
    async fn set_playback_audio_url(
        &self,
        participant_id: &str,
        task_id: TaskId,
        condition_id: Condition,
        audio_url: &str,
    ) -> Result<PlaybackAsset, StorageError>;
}
