//! ConversationStore implementation for PgStorage.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use voice_study_core::{
    count_assistant_run_starts, partition_by_scope, ConversationSummary, NewTimingEvent, NewTurn,
    Role, TimingEvent, TurnScope, TurnView,
};

use super::PgStorage;
use crate::error::StorageError;
use crate::traits::ConversationStore;
use crate::types::{parse_stored, AppendOutcome};

/// Advisory-lock namespace for turn scopes; the second key is `hashtext(scope)`.
const TURN_SCOPE_LOCK_NAMESPACE: i32 = 0x7475_726e;

#[async_trait]
impl ConversationStore for PgStorage {
    async fn append_turns(&self, turns: &[NewTurn]) -> Result<AppendOutcome, StorageError> {
        let mut outcome = AppendOutcome::default();
        if turns.is_empty() {
            return Ok(outcome);
        }
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        let scoped = partition_by_scope(turns);

        // Overlapping appends for a scope must see each other's rows before reading the
        // high-water mark. Locks are taken in sorted order so multi-scope batches cannot deadlock.
        let mut lock_keys: Vec<String> =
            scoped.iter().map(|(scope, _)| scope.to_string()).collect();
        lock_keys.sort_unstable();
        lock_keys.dedup();
        for key in &lock_keys {
            sqlx::query("SELECT pg_advisory_xact_lock($1, hashtext($2))")
                .bind(TURN_SCOPE_LOCK_NAMESPACE)
                .bind(key)
                .execute(&mut *tx)
                .await?;
        }

        for (scope, batch) in scoped {
            let last: Option<(i64, String)> = sqlx::query_as(
                "SELECT turn_index, role FROM conversation_turns
                 WHERE participant_id = $1 AND session = $2 AND task_id = $3
                 ORDER BY turn_index DESC LIMIT 1",
            )
            .bind(&scope.participant_id)
            .bind(scope.session.as_str())
            .bind(&scope.task_id)
            .fetch_optional(&mut *tx)
            .await?;

            let (high_water, previous_role) = match last {
                Some((index, role)) => (Some(index), Some(parse_stored::<Role>("role", &role)?)),
                None => (None, None),
            };
            let fresh: Vec<&NewTurn> = batch
                .iter()
                .copied()
                .filter(|t| high_water.is_none_or(|max| t.turn_index > max))
                .collect();
            outcome.skipped += batch.len() - fresh.len();
            if fresh.is_empty() {
                tracing::debug!(scope = %scope, "turn batch already stored, skipping");
                continue;
            }

            for turn in &fresh {
                sqlx::query(
                    "INSERT INTO conversation_turns
                       (participant_id, session, task_id, turn_index, role, text, audio_url,
                        duration_ms, started_at, ended_at, created_at)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
                )
                .bind(&scope.participant_id)
                .bind(scope.session.as_str())
                .bind(&scope.task_id)
                .bind(turn.turn_index)
                .bind(turn.role.as_str())
                .bind(&turn.text)
                .bind(&turn.audio_url)
                .bind(turn.resolved_duration_ms())
                .bind(turn.started_at)
                .bind(turn.ended_at)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }

            let starts = count_assistant_run_starts(previous_role, fresh.iter().map(|t| t.role));
            if starts > 0 {
                sqlx::query(
                    "INSERT INTO conversation_summaries
                       (participant_id, session, task_id, user_utterance_count, updated_at)
                     VALUES ($1, $2, $3, $4, $5)
                     ON CONFLICT (participant_id, session, task_id) DO UPDATE SET
                       user_utterance_count = conversation_summaries.user_utterance_count
                         + EXCLUDED.user_utterance_count,
                       updated_at = EXCLUDED.updated_at",
                )
                .bind(&scope.participant_id)
                .bind(scope.session.as_str())
                .bind(&scope.task_id)
                .bind(starts)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }
            outcome.inserted += fresh.len();
            outcome.assistant_run_starts += starts;
        }

        tx.commit().await?;
        Ok(outcome)
    }

    async fn list_turns(&self, scope: &TurnScope) -> Result<Vec<TurnView>, StorageError> {
        let rows = sqlx::query(
            "SELECT role, text, started_at, ended_at FROM conversation_turns
             WHERE participant_id = $1 AND session = $2 AND task_id = $3 AND text IS NOT NULL
             ORDER BY turn_index",
        )
        .bind(&scope.participant_id)
        .bind(scope.session.as_str())
        .bind(&scope.task_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| -> Result<TurnView, StorageError> {
                Ok(TurnView {
                    role: parse_stored("role", &row.try_get::<String, _>("role")?)?,
                    text: row.try_get("text")?,
                    started_at: row.try_get("started_at")?,
                    ended_at: row.try_get("ended_at")?,
                })
            })
            .collect()
    }

    async fn append_timing_events(&self, events: &[NewTimingEvent]) -> Result<usize, StorageError> {
        if events.is_empty() {
            return Ok(0);
        }
        let mut tx = self.pool.begin().await?;
        for event in events {
            sqlx::query(
                "INSERT INTO conversation_timings
                   (participant_id, session, task_id, event, occurred_at, extra)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(&event.scope.participant_id)
            .bind(event.scope.session.as_str())
            .bind(&event.scope.task_id)
            .bind(&event.event)
            .bind(event.timestamp)
            .bind(&event.extra)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(events.len())
    }

    async fn list_timing_events(
        &self,
        scope: &TurnScope,
    ) -> Result<Vec<TimingEvent>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, event, occurred_at, extra FROM conversation_timings
             WHERE participant_id = $1 AND session = $2 AND task_id = $3
             ORDER BY id",
        )
        .bind(&scope.participant_id)
        .bind(scope.session.as_str())
        .bind(&scope.task_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| -> Result<TimingEvent, StorageError> {
                Ok(TimingEvent {
                    id: row.try_get("id")?,
                    participant_id: scope.participant_id.clone(),
                    session: scope.session,
                    task_id: scope.task_id.clone(),
                    event: row.try_get("event")?,
                    timestamp: row.try_get("occurred_at")?,
                    extra: row.try_get("extra")?,
                })
            })
            .collect()
    }

    async fn get_conversation_summary(
        &self,
        scope: &TurnScope,
    ) -> Result<ConversationSummary, StorageError> {
        let row = sqlx::query(
            "SELECT
               (SELECT user_utterance_count FROM conversation_summaries
                 WHERE participant_id = $1 AND session = $2 AND task_id = $3) AS runs,
               (SELECT MAX(turn_index) FROM conversation_turns
                 WHERE participant_id = $1 AND session = $2 AND task_id = $3) AS last_index",
        )
        .bind(&scope.participant_id)
        .bind(scope.session.as_str())
        .bind(&scope.task_id)
        .fetch_one(&self.pool)
        .await?;
        let runs: Option<i64> = row.try_get("runs")?;
        let last_index: Option<i64> = row.try_get("last_index")?;
        Ok(ConversationSummary {
            participant_id: scope.participant_id.clone(),
            session: scope.session,
            task_id: scope.task_id.clone(),
            user_utterance_count: runs.unwrap_or(0),
            next_turn_index: last_index.map_or(0, |i| i + 1),
        })
    }
}
