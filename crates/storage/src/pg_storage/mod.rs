//! PostgreSQL storage backend using sqlx.
//!
//! Split into modular files by domain concern.

#![allow(clippy::absolute_paths, reason = "std paths in error handling are clear")]

mod conversation;
mod participants;
mod progress;
mod surveys;

use std::time::Duration;

use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use voice_study_core::{
    Assignment, ParticipantProgress, Participant, PlaybackAsset, SurveyResponse, TaskNote,
    PG_POOL_ACQUIRE_TIMEOUT_SECS, PG_POOL_IDLE_TIMEOUT_SECS,
};

use crate::error::StorageError;
use crate::pg_migrations::run_pg_migrations;
use crate::types::parse_stored;

#[derive(Clone, Debug)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(PG_POOL_ACQUIRE_TIMEOUT_SECS))
            .idle_timeout(Duration::from_secs(PG_POOL_IDLE_TIMEOUT_SECS))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;
        run_pg_migrations(&pool).await.map_err(|e| StorageError::Migration(e.to_string()))?;
        tracing::info!(max_connections, "PgStorage initialized");
        Ok(Self { pool })
    }

    pub async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

pub(crate) const PARTICIPANT_COLUMNS: &str = "id, participant_group, created_at";

pub(crate) const ASSIGNMENT_COLUMNS: &str =
    "id, participant_id, task_id, order_index, condition_id";

pub(crate) const PLAYBACK_COLUMNS: &str =
    "id, participant_id, task_id, condition_id, audio_url, created_at, updated_at";

pub(crate) const PROGRESS_COLUMNS: &str =
    "participant_id, session, task_index, stage, completed, updated_at";

pub(crate) const SURVEY_COLUMNS: &str =
    "id, participant_id, session, task_id, stage, condition_id, answers, created_at";

pub(crate) const NOTE_COLUMNS: &str = "id, participant_id, task_id, note, updated_at";

pub(crate) fn row_to_participant(row: &PgRow) -> Result<Participant, StorageError> {
    Ok(Participant {
        id: row.try_get("id")?,
        group: parse_stored("participant_group", &row.try_get::<String, _>("participant_group")?)?,
        created_at: row.try_get("created_at")?,
    })
}

pub(crate) fn row_to_assignment(row: &PgRow) -> Result<Assignment, StorageError> {
    Ok(Assignment {
        id: row.try_get("id")?,
        participant_id: row.try_get("participant_id")?,
        task_id: parse_stored("task_id", &row.try_get::<String, _>("task_id")?)?,
        order_index: row.try_get("order_index")?,
        condition_id: parse_stored("condition_id", &row.try_get::<String, _>("condition_id")?)?,
    })
}

pub(crate) fn row_to_playback_asset(row: &PgRow) -> Result<PlaybackAsset, StorageError> {
    Ok(PlaybackAsset {
        id: row.try_get("id")?,
        participant_id: row.try_get("participant_id")?,
        task_id: parse_stored("task_id", &row.try_get::<String, _>("task_id")?)?,
        condition_id: parse_stored("condition_id", &row.try_get::<String, _>("condition_id")?)?,
        audio_url: row.try_get("audio_url")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(crate) fn row_to_progress(row: &PgRow) -> Result<ParticipantProgress, StorageError> {
    Ok(ParticipantProgress {
        participant_id: row.try_get("participant_id")?,
        session: parse_stored("session", &row.try_get::<String, _>("session")?)?,
        task_index: row.try_get("task_index")?,
        stage: parse_stored("stage", &row.try_get::<String, _>("stage")?)?,
        completed: row.try_get("completed")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(crate) fn row_to_survey(row: &PgRow) -> Result<SurveyResponse, StorageError> {
    Ok(SurveyResponse {
        id: row.try_get("id")?,
        participant_id: row.try_get("participant_id")?,
        session: parse_stored("session", &row.try_get::<String, _>("session")?)?,
        task_id: row.try_get("task_id")?,
        stage: row.try_get("stage")?,
        condition: row.try_get("condition_id")?,
        answers: row.try_get("answers")?,
        created_at: row.try_get("created_at")?,
    })
}

pub(crate) fn row_to_note(row: &PgRow) -> Result<TaskNote, StorageError> {
    Ok(TaskNote {
        id: row.try_get("id")?,
        participant_id: row.try_get("participant_id")?,
        task_id: parse_stored("task_id", &row.try_get::<String, _>("task_id")?)?,
        note: row.try_get("note")?,
        updated_at: row.try_get("updated_at")?,
    })
}
