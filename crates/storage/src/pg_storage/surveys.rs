//! SurveyStore and TaskNoteStore implementations for PgStorage.

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;
use voice_study_core::{NewSurveyResponse, SurveyFilter, SurveyResponse, TaskId, TaskNote};

use super::{row_to_note, row_to_survey, PgStorage, NOTE_COLUMNS, SURVEY_COLUMNS};
use crate::error::StorageError;
use crate::traits::{SurveyStore, TaskNoteStore};

#[async_trait]
impl SurveyStore for PgStorage {
    async fn save_survey(
        &self,
        response: &NewSurveyResponse,
    ) -> Result<SurveyResponse, StorageError> {
        let row = sqlx::query(&format!(
            "INSERT INTO survey_responses
               (participant_id, session, task_id, stage, condition_id, answers, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {SURVEY_COLUMNS}"
        ))
        .bind(&response.participant_id)
        .bind(response.session.as_str())
        .bind(&response.task_id)
        .bind(&response.stage)
        .bind(&response.condition)
        .bind(&response.answers)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        row_to_survey(&row)
    }

    async fn list_surveys(
        &self,
        filter: &SurveyFilter,
    ) -> Result<Vec<SurveyResponse>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {SURVEY_COLUMNS} FROM survey_responses
             WHERE ($1::text IS NULL OR participant_id = $1)
               AND ($2::text IS NULL OR session = $2)
               AND ($3::text IS NULL OR stage = $3)
             ORDER BY created_at, id"
        ))
        .bind(filter.participant_id.as_deref())
        .bind(filter.session.map(|s| s.as_str()))
        .bind(filter.stage.as_deref())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_survey).collect()
    }
}

#[async_trait]
impl TaskNoteStore for PgStorage {
    async fn upsert_task_note(
        &self,
        participant_id: &str,
        task_id: TaskId,
        note: &str,
    ) -> Result<TaskNote, StorageError> {
        let row = sqlx::query(&format!(
            "INSERT INTO task_notes (id, participant_id, task_id, note, updated_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (participant_id, task_id) DO UPDATE SET
               note = EXCLUDED.note,
               updated_at = EXCLUDED.updated_at
             RETURNING {NOTE_COLUMNS}"
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(participant_id)
        .bind(task_id.as_str())
        .bind(note)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        row_to_note(&row)
    }

    async fn list_task_notes(&self, participant_id: &str) -> Result<Vec<TaskNote>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {NOTE_COLUMNS} FROM task_notes WHERE participant_id = $1 ORDER BY task_id"
        ))
        .bind(participant_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_note).collect()
    }
}
