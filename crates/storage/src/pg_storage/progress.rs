//! ProgressStore implementation for PgStorage.

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;
use voice_study_core::{ParticipantProgress, ProgressUpdate, Session};

use super::{row_to_progress, PgStorage, PROGRESS_COLUMNS};
use crate::error::StorageError;
use crate::traits::ProgressStore;

#[async_trait]
impl ProgressStore for PgStorage {
    async fn upsert_progress(
        &self,
        update: &ProgressUpdate,
    ) -> Result<ParticipantProgress, StorageError> {
        let row = sqlx::query(&format!(
            "INSERT INTO participant_progress
               (id, participant_id, session, task_index, stage, completed, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (participant_id, session) DO UPDATE SET
               task_index = EXCLUDED.task_index,
               stage = EXCLUDED.stage,
               completed = EXCLUDED.completed,
               updated_at = EXCLUDED.updated_at
             RETURNING {PROGRESS_COLUMNS}"
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(&update.participant_id)
        .bind(update.session.as_str())
        .bind(update.task_index)
        .bind(update.stage.as_str())
        .bind(update.completed)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        row_to_progress(&row)
    }

    async fn get_progress(
        &self,
        participant_id: &str,
        session: Session,
    ) -> Result<Option<ParticipantProgress>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM participant_progress
             WHERE participant_id = $1 AND session = $2"
        ))
        .bind(participant_id)
        .bind(session.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| row_to_progress(&r)).transpose()
    }

    async fn list_progress(
        &self,
        participant_id: &str,
    ) -> Result<Vec<ParticipantProgress>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM participant_progress
             WHERE participant_id = $1 ORDER BY session"
        ))
        .bind(participant_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_progress).collect()
    }
}
