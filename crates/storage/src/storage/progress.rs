use chrono::Utc;
use rusqlite::{params, OptionalExtension as _};
use uuid::Uuid;
use voice_study_core::{ParticipantProgress, ProgressUpdate, Session};

use super::{col_enum, col_time, get_conn, to_db_time, Storage};
use crate::error::StorageError;

const PROGRESS_COLUMNS: &str = "participant_id, session, task_index, stage, completed, updated_at";

fn map_progress(row: &rusqlite::Row<'_>) -> rusqlite::Result<ParticipantProgress> {
    Ok(ParticipantProgress {
        participant_id: row.get(0)?,
        session: col_enum(row, 1)?,
        task_index: row.get(2)?,
        stage: col_enum(row, 3)?,
        completed: row.get(4)?,
        updated_at: col_time(row, 5)?,
    })
}

impl Storage {
    /// Overwrite the (participant, session) checkpoint.
    ///
    /// # Errors
    /// Returns error if the upsert fails.
    pub fn upsert_progress(
        &self,
        update: &ProgressUpdate,
    ) -> Result<ParticipantProgress, StorageError> {
        let conn = get_conn(&self.pool)?;
        Ok(conn.query_row(
            &format!(
                "INSERT INTO participant_progress
                   (id, participant_id, session, task_index, stage, completed, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT (participant_id, session) DO UPDATE SET
                   task_index = excluded.task_index,
                   stage = excluded.stage,
                   completed = excluded.completed,
                   updated_at = excluded.updated_at
                 RETURNING {PROGRESS_COLUMNS}"
            ),
            params![
                Uuid::new_v4().to_string(),
                update.participant_id,
                update.session.as_str(),
                update.task_index,
                update.stage.as_str(),
                update.completed,
                to_db_time(Utc::now()),
            ],
            map_progress,
        )?)
    }

    /// # Errors
    /// Returns error if the query fails.
    pub fn get_progress(
        &self,
        participant_id: &str,
        session: Session,
    ) -> Result<Option<ParticipantProgress>, StorageError> {
        let conn = get_conn(&self.pool)?;
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {PROGRESS_COLUMNS} FROM participant_progress
                     WHERE participant_id = ?1 AND session = ?2"
                ),
                params![participant_id, session.as_str()],
                map_progress,
            )
            .optional()?)
    }

    /// # Errors
    /// Returns error if the query fails.
    pub fn list_progress(
        &self,
        participant_id: &str,
    ) -> Result<Vec<ParticipantProgress>, StorageError> {
        let conn = get_conn(&self.pool)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM participant_progress
             WHERE participant_id = ?1 ORDER BY session"
        ))?;
        let rows = stmt.query_map(params![participant_id], map_progress)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
