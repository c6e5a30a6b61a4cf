use async_trait::async_trait;
use voice_study_core::{NewSurveyResponse, SurveyFilter, SurveyResponse, TaskId, TaskNote};

use crate::error::StorageError;

/// Append-only survey submissions.
#[async_trait]
pub trait SurveyStore: Send + Sync {
    async fn save_survey(
        &self,
        response: &NewSurveyResponse,
    ) -> Result<SurveyResponse, StorageError>;

    /// Matching submissions, oldest first.
    async fn list_surveys(
        &self,
        filter: &SurveyFilter,
    ) -> Result<Vec<SurveyResponse>, StorageError>;
}

/// One free-text note per (participant, task); latest write wins.
#[async_trait]
pub trait TaskNoteStore: Send + Sync {
    async fn upsert_task_note(
        &self,
        participant_id: &str,
        task_id: TaskId,
        note: &str,
    ) -> Result<TaskNote, StorageError>;

    /// Notes of one participant ordered by task id.
    async fn list_task_notes(&self, participant_id: &str) -> Result<Vec<TaskNote>, StorageError>;
}
