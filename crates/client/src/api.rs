use async_trait::async_trait;
use voice_study_core::{
    Condition, ConversationSummary, Group, NewSurveyResponse, NewTimingEvent, NewTurn,
    Participant, ParticipantProgress, PlaybackAsset, ProgressUpdate, Session, SurveyResponse,
    TaskId, TaskNote, TurnScope,
};

use crate::ClientError;

/// The backend operations the session controller depends on.
#[async_trait]
pub trait ExperimentApi: Send + Sync {
    async fn register(&self, id: &str, group: Option<Group>) -> Result<Participant, ClientError>;

    /// `None` when the session has not been started.
    async fn get_progress(
        &self,
        participant_id: &str,
        session: Session,
    ) -> Result<Option<ParticipantProgress>, ClientError>;

    async fn upsert_progress(
        &self,
        update: &ProgressUpdate,
    ) -> Result<ParticipantProgress, ClientError>;

    async fn append_turns(&self, turns: &[NewTurn]) -> Result<(), ClientError>;

    async fn append_timing(&self, events: &[NewTimingEvent]) -> Result<(), ClientError>;

    async fn conversation_summary(
        &self,
        scope: &TurnScope,
    ) -> Result<ConversationSummary, ClientError>;

    async fn submit_survey(
        &self,
        response: &NewSurveyResponse,
    ) -> Result<SurveyResponse, ClientError>;

    async fn save_task_note(
        &self,
        participant_id: &str,
        task_id: TaskId,
        note: &str,
    ) -> Result<TaskNote, ClientError>;

    /// Ordered by task id.
    async fn list_task_notes(&self, participant_id: &str) -> Result<Vec<TaskNote>, ClientError>;

    /// `None` when no asset exists for the triple.
    async fn get_playback_asset(
        &self,
        participant_id: &str,
        task_id: TaskId,
        condition_id: Condition,
    ) -> Result<Option<PlaybackAsset>, ClientError>;
}
