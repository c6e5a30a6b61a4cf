//! ParticipantStore and PlaybackStore implementations for PgStorage.

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;
use voice_study_core::{
    assignment_plan, preassigned_group, Assignment, Condition, Group, GroupCounts, GroupSource,
    Participant, PlaybackAsset, TaskId, REGISTRATION_LOCK_KEY, TASKS_PER_SESSION,
};

use super::{
    row_to_assignment, row_to_participant, row_to_playback_asset, PgStorage, ASSIGNMENT_COLUMNS,
    PARTICIPANT_COLUMNS, PLAYBACK_COLUMNS,
};
use crate::error::StorageError;
use crate::traits::{ParticipantStore, PlaybackStore};
use crate::types::{counts_from_rows, Registration};

async fn count_groups<'e, E>(executor: E) -> Result<GroupCounts, StorageError>
where
    E: sqlx::PgExecutor<'e>,
{
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT participant_group, COUNT(*) FROM participants GROUP BY participant_group",
    )
    .fetch_all(executor)
    .await?;
    Ok(counts_from_rows(rows))
}

#[async_trait]
impl ParticipantStore for PgStorage {
    async fn register_participant(
        &self,
        id: &str,
        explicit_group: Option<Group>,
    ) -> Result<Registration, StorageError> {
        let mut tx = self.pool.begin().await?;

        // Serializes registrations so the group counts read below stay valid until commit.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(REGISTRATION_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        let existing = sqlx::query(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .map(|r| row_to_participant(&r))
        .transpose()?;

        let (group, source) =
            match preassigned_group(existing.as_ref().map(|p| p.group), explicit_group) {
                Some(resolved) => resolved,
                None => (count_groups(&mut *tx).await?.least_populated(), GroupSource::Balanced),
            };

        let created = existing.is_none();
        let participant = match existing {
            Some(participant) => participant,
            None => {
                let row = sqlx::query(&format!(
                    "INSERT INTO participants (id, participant_group, created_at)
                     VALUES ($1, $2, $3)
                     RETURNING {PARTICIPANT_COLUMNS}"
                ))
                .bind(id)
                .bind(group.as_str())
                .bind(Utc::now())
                .fetch_one(&mut *tx)
                .await?;
                row_to_participant(&row)?
            },
        };

        let now = Utc::now();
        let mut assignments = Vec::with_capacity(TASKS_PER_SESSION);
        for entry in assignment_plan(participant.group) {
            let row = sqlx::query(&format!(
                "INSERT INTO assignments (id, participant_id, task_id, order_index, condition_id)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (participant_id, task_id) DO UPDATE SET
                   order_index = EXCLUDED.order_index,
                   condition_id = EXCLUDED.condition_id
                 RETURNING {ASSIGNMENT_COLUMNS}"
            ))
            .bind(Uuid::new_v4().to_string())
            .bind(&participant.id)
            .bind(entry.task_id.as_str())
            .bind(entry.order_index)
            .bind(entry.condition_id.as_str())
            .fetch_one(&mut *tx)
            .await?;
            assignments.push(row_to_assignment(&row)?);

            // Existing rows keep their curated audio_url.
            sqlx::query(
                "INSERT INTO playback_assets
                   (id, participant_id, task_id, condition_id, audio_url, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, '', $5, $5)
                 ON CONFLICT (participant_id, task_id, condition_id) DO NOTHING",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&participant.id)
            .bind(entry.task_id.as_str())
            .bind(entry.condition_id.as_str())
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Registration { participant, assignments, source, created })
    }

    async fn get_participant(&self, id: &str) -> Result<Option<Participant>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| row_to_participant(&r)).transpose()
    }

    async fn list_participants(&self) -> Result<Vec<Participant>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants ORDER BY created_at DESC, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_participant).collect()
    }

    async fn list_assignments(
        &self,
        participant_id: &str,
    ) -> Result<Vec<Assignment>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments
             WHERE participant_id = $1 ORDER BY order_index"
        ))
        .bind(participant_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_assignment).collect()
    }

    async fn group_counts(&self) -> Result<GroupCounts, StorageError> {
        count_groups(&self.pool).await
    }
}

#[async_trait]
impl PlaybackStore for PgStorage {
    async fn get_playback_asset(
        &self,
        participant_id: &str,
        task_id: TaskId,
        condition_id: Condition,
    ) -> Result<Option<PlaybackAsset>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {PLAYBACK_COLUMNS} FROM playback_assets
             WHERE participant_id = $1 AND task_id = $2 AND condition_id = $3"
        ))
        .bind(participant_id)
        .bind(task_id.as_str())
        .bind(condition_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| row_to_playback_asset(&r)).transpose()
    }

    async fn list_playback_assets(
        &self,
        participant_id: &str,
    ) -> Result<Vec<PlaybackAsset>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {PLAYBACK_COLUMNS} FROM playback_assets
             WHERE participant_id = $1 ORDER BY task_id"
        ))
        .bind(participant_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_playback_asset).collect()
    }

    async fn set_playback_audio_url(
        &self,
        participant_id: &str,
        task_id: TaskId,
        condition_id: Condition,
        audio_url: &str,
    ) -> Result<PlaybackAsset, StorageError> {
        let row = sqlx::query(&format!(
            "UPDATE playback_assets SET audio_url = $4, updated_at = $5
             WHERE participant_id = $1 AND task_id = $2 AND condition_id = $3
             RETURNING {PLAYBACK_COLUMNS}"
        ))
        .bind(participant_id)
        .bind(task_id.as_str())
        .bind(condition_id.as_str())
        .bind(audio_url)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(r) => row_to_playback_asset(&r),
            None => Err(StorageError::NotFound {
                entity: "playback asset",
                id: format!("{participant_id}/{task_id}/{condition_id}"),
            }),
        }
    }
}
