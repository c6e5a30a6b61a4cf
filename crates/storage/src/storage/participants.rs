use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;
use voice_study_core::{
    assignment_plan, preassigned_group, Assignment, Condition, Group, GroupCounts, GroupSource,
    Participant, PlaybackAsset, TaskId, TASKS_PER_SESSION,
};

use super::{col_enum, col_time, get_conn, to_db_time, Storage};
use crate::error::StorageError;
use crate::types::{counts_from_rows, Registration};

const PARTICIPANT_COLUMNS: &str = "id, participant_group, created_at";
const ASSIGNMENT_COLUMNS: &str = "id, participant_id, task_id, order_index, condition_id";
const PLAYBACK_COLUMNS: &str =
    "id, participant_id, task_id, condition_id, audio_url, created_at, updated_at";

fn map_participant(row: &rusqlite::Row<'_>) -> rusqlite::Result<Participant> {
    Ok(Participant { id: row.get(0)?, group: col_enum(row, 1)?, created_at: col_time(row, 2)? })
}

fn map_assignment(row: &rusqlite::Row<'_>) -> rusqlite::Result<Assignment> {
    Ok(Assignment {
        id: row.get(0)?,
        participant_id: row.get(1)?,
        task_id: col_enum(row, 2)?,
        order_index: row.get(3)?,
        condition_id: col_enum(row, 4)?,
    })
}

fn map_playback_asset(row: &rusqlite::Row<'_>) -> rusqlite::Result<PlaybackAsset> {
    Ok(PlaybackAsset {
        id: row.get(0)?,
        participant_id: row.get(1)?,
        task_id: col_enum(row, 2)?,
        condition_id: col_enum(row, 3)?,
        audio_url: row.get(4)?,
        created_at: col_time(row, 5)?,
        updated_at: col_time(row, 6)?,
    })
}

fn count_groups(conn: &Connection) -> Result<GroupCounts, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT participant_group, COUNT(*) FROM participants GROUP BY participant_group",
    )?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(counts_from_rows(rows))
}

impl Storage {
    /// Registrar transaction. `BEGIN IMMEDIATE` takes the write lock up front,
    /// so the group counts cannot change before commit.
    ///
    /// # Errors
    /// Returns error if any statement fails; nothing is persisted in that case.
    pub fn register_participant(
        &self,
        id: &str,
        explicit_group: Option<Group>,
    ) -> Result<Registration, StorageError> {
        let mut conn = get_conn(&self.pool)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing = tx
            .query_row(
                &format!("SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE id = ?1"),
                params![id],
                map_participant,
            )
            .optional()?;

        let (group, source) =
            match preassigned_group(existing.as_ref().map(|p| p.group), explicit_group) {
                Some(resolved) => resolved,
                None => (count_groups(&tx)?.least_populated(), GroupSource::Balanced),
            };

        let created = existing.is_none();
        let participant = match existing {
            Some(participant) => participant,
            None => tx.query_row(
                &format!(
                    "INSERT INTO participants (id, participant_group, created_at)
                     VALUES (?1, ?2, ?3)
                     RETURNING {PARTICIPANT_COLUMNS}"
                ),
                params![id, group.as_str(), to_db_time(Utc::now())],
                map_participant,
            )?,
        };

        let now = to_db_time(Utc::now());
        let mut assignments = Vec::with_capacity(TASKS_PER_SESSION);
        for entry in assignment_plan(participant.group) {
            assignments.push(tx.query_row(
                &format!(
                    "INSERT INTO assignments
                       (id, participant_id, task_id, order_index, condition_id)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT (participant_id, task_id) DO UPDATE SET
                       order_index = excluded.order_index,
                       condition_id = excluded.condition_id
                     RETURNING {ASSIGNMENT_COLUMNS}"
                ),
                params![
                    Uuid::new_v4().to_string(),
                    participant.id,
                    entry.task_id.as_str(),
                    entry.order_index,
                    entry.condition_id.as_str(),
                ],
                map_assignment,
            )?);

            // Existing rows keep their curated audio_url.
            tx.execute(
                "INSERT INTO playback_assets
                   (id, participant_id, task_id, condition_id, audio_url, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, '', ?5, ?5)
                 ON CONFLICT (participant_id, task_id, condition_id) DO NOTHING",
                params![
                    Uuid::new_v4().to_string(),
                    participant.id,
                    entry.task_id.as_str(),
                    entry.condition_id.as_str(),
                    now,
                ],
            )?;
        }

        tx.commit()?;
        Ok(Registration { participant, assignments, source, created })
    }

    /// # Errors
    /// Returns error if the query fails.
    pub fn get_participant(&self, id: &str) -> Result<Option<Participant>, StorageError> {
        let conn = get_conn(&self.pool)?;
        Ok(conn
            .query_row(
                &format!("SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE id = ?1"),
                params![id],
                map_participant,
            )
            .optional()?)
    }

    /// Newest first.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn list_participants(&self) -> Result<Vec<Participant>, StorageError> {
        let conn = get_conn(&self.pool)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants ORDER BY created_at DESC, id"
        ))?;
        let rows = stmt.query_map([], map_participant)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// # Errors
    /// Returns error if the query fails.
    pub fn list_assignments(&self, participant_id: &str) -> Result<Vec<Assignment>, StorageError> {
        let conn = get_conn(&self.pool)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments
             WHERE participant_id = ?1 ORDER BY order_index"
        ))?;
        let rows = stmt.query_map(params![participant_id], map_assignment)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// # Errors
    /// Returns error if the query fails.
    pub fn group_counts(&self) -> Result<GroupCounts, StorageError> {
        let conn = get_conn(&self.pool)?;
        count_groups(&conn)
    }

    /// # Errors
    /// Returns error if the query fails.
    pub fn get_playback_asset(
        &self,
        participant_id: &str,
        task_id: TaskId,
        condition_id: Condition,
    ) -> Result<Option<PlaybackAsset>, StorageError> {
        let conn = get_conn(&self.pool)?;
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {PLAYBACK_COLUMNS} FROM playback_assets
                     WHERE participant_id = ?1 AND task_id = ?2 AND condition_id = ?3"
                ),
                params![participant_id, task_id.as_str(), condition_id.as_str()],
                map_playback_asset,
            )
            .optional()?)
    }

    /// # Errors
    /// Returns error if the query fails.
    pub fn list_playback_assets(
        &self,
        participant_id: &str,
    ) -> Result<Vec<PlaybackAsset>, StorageError> {
        let conn = get_conn(&self.pool)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PLAYBACK_COLUMNS} FROM playback_assets
             WHERE participant_id = ?1 ORDER BY task_id"
        ))?;
        let rows = stmt.query_map(params![participant_id], map_playback_asset)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// # Errors
    /// `NotFound` if the asset was never provisioned; database errors otherwise.
    pub fn set_playback_audio_url(
        &self,
        participant_id: &str,
        task_id: TaskId,
        condition_id: Condition,
        audio_url: &str,
    ) -> Result<PlaybackAsset, StorageError> {
        let conn = get_conn(&self.pool)?;
        conn.query_row(
            &format!(
                "UPDATE playback_assets SET audio_url = ?4, updated_at = ?5
                 WHERE participant_id = ?1 AND task_id = ?2 AND condition_id = ?3
                 RETURNING {PLAYBACK_COLUMNS}"
            ),
            params![
                participant_id,
                task_id.as_str(),
                condition_id.as_str(),
                audio_url,
                to_db_time(Utc::now()),
            ],
            map_playback_asset,
        )
        .optional()?
        .ok_or_else(|| StorageError::NotFound {
            entity: "playback asset",
            id: format!("{participant_id}/{task_id}/{condition_id}"),
        })
    }
}
