use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;
use voice_study_core::{NewSurveyResponse, SurveyFilter, SurveyResponse, TaskId, TaskNote};

use super::{col_enum, col_time, get_conn, parse_json, to_db_time, Storage};
use crate::error::StorageError;

const SURVEY_COLUMNS: &str =
    "id, participant_id, session, task_id, stage, condition_id, answers, created_at";
const NOTE_COLUMNS: &str = "id, participant_id, task_id, note, updated_at";

fn map_survey(row: &rusqlite::Row<'_>) -> rusqlite::Result<SurveyResponse> {
    Ok(SurveyResponse {
        id: row.get(0)?,
        participant_id: row.get(1)?,
        session: col_enum(row, 2)?,
        task_id: row.get(3)?,
        stage: row.get(4)?,
        condition: row.get(5)?,
        answers: parse_json(6, &row.get::<_, String>(6)?)?,
        created_at: col_time(row, 7)?,
    })
}

fn map_note(row: &rusqlite::Row<'_>) -> rusqlite::Result<TaskNote> {
    Ok(TaskNote {
        id: row.get(0)?,
        participant_id: row.get(1)?,
        task_id: col_enum(row, 2)?,
        note: row.get(3)?,
        updated_at: col_time(row, 4)?,
    })
}

impl Storage {
    /// # Errors
    /// Returns error if the insert fails.
    pub fn save_survey(
        &self,
        response: &NewSurveyResponse,
    ) -> Result<SurveyResponse, StorageError> {
        let answers = serde_json::to_string(&response.answers)?;
        let conn = get_conn(&self.pool)?;
        Ok(conn.query_row(
            &format!(
                "INSERT INTO survey_responses
                   (participant_id, session, task_id, stage, condition_id, answers, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 RETURNING {SURVEY_COLUMNS}"
            ),
            params![
                response.participant_id,
                response.session.as_str(),
                response.task_id,
                response.stage,
                response.condition,
                answers,
                to_db_time(Utc::now()),
            ],
            map_survey,
        )?)
    }

    /// Oldest first; unset filter fields match everything.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn list_surveys(&self, filter: &SurveyFilter) -> Result<Vec<SurveyResponse>, StorageError> {
        let conn = get_conn(&self.pool)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SURVEY_COLUMNS} FROM survey_responses
             WHERE (?1 IS NULL OR participant_id = ?1)
               AND (?2 IS NULL OR session = ?2)
               AND (?3 IS NULL OR stage = ?3)
             ORDER BY created_at, id"
        ))?;
        let rows = stmt.query_map(
            params![filter.participant_id, filter.session.map(|s| s.as_str()), filter.stage],
            map_survey,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// # Errors
    /// Returns error if the upsert fails.
    pub fn upsert_task_note(
        &self,
        participant_id: &str,
        task_id: TaskId,
        note: &str,
    ) -> Result<TaskNote, StorageError> {
        let conn = get_conn(&self.pool)?;
        Ok(conn.query_row(
            &format!(
                "INSERT INTO task_notes (id, participant_id, task_id, note, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (participant_id, task_id) DO UPDATE SET
                   note = excluded.note,
                   updated_at = excluded.updated_at
                 RETURNING {NOTE_COLUMNS}"
            ),
            params![
                Uuid::new_v4().to_string(),
                participant_id,
                task_id.as_str(),
                note,
                to_db_time(Utc::now()),
            ],
            map_note,
        )?)
    }

    /// # Errors
    /// Returns error if the query fails.
    pub fn list_task_notes(&self, participant_id: &str) -> Result<Vec<TaskNote>, StorageError> {
        let conn = get_conn(&self.pool)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM task_notes WHERE participant_id = ?1 ORDER BY task_id"
        ))?;
        let rows = stmt.query_map(params![participant_id], map_note)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
