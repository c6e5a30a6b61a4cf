use chrono::Utc;
use rusqlite::{params, OptionalExtension as _, TransactionBehavior};
use voice_study_core::{
    count_assistant_run_starts, partition_by_scope, ConversationSummary, NewTimingEvent, NewTurn,
    Role, TimingEvent, TurnScope, TurnView,
};

use super::{col_enum, col_time, get_conn, parse_json, to_db_time, Storage};
use crate::error::StorageError;
use crate::types::AppendOutcome;

impl Storage {
    /// Append turns; see `ConversationStore::append_turns`.
    ///
    /// # Errors
    /// Returns error if any insert fails; the whole batch is rolled back.
    pub fn append_turns(&self, turns: &[NewTurn]) -> Result<AppendOutcome, StorageError> {
        let mut outcome = AppendOutcome::default();
        if turns.is_empty() {
            return Ok(outcome);
        }
        let mut conn = get_conn(&self.pool)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = to_db_time(Utc::now());

        for (scope, batch) in partition_by_scope(turns) {
            let last: Option<(i64, Role)> = tx
                .query_row(
                    "SELECT turn_index, role FROM conversation_turns
                     WHERE participant_id = ?1 AND session = ?2 AND task_id = ?3
                     ORDER BY turn_index DESC LIMIT 1",
                    params![scope.participant_id, scope.session.as_str(), scope.task_id],
                    |row| Ok((row.get(0)?, col_enum(row, 1)?)),
                )
                .optional()?;
            let high_water = last.map(|(index, _)| index);
            let previous_role = last.map(|(_, role)| role);

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

            {
                let mut insert = tx.prepare_cached(
                    "INSERT INTO conversation_turns
                       (participant_id, session, task_id, turn_index, role, text, audio_url,
                        duration_ms, started_at, ended_at, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                )?;
                for turn in &fresh {
                    insert.execute(params![
                        scope.participant_id,
                        scope.session.as_str(),
                        scope.task_id,
                        turn.turn_index,
                        turn.role.as_str(),
                        turn.text,
                        turn.audio_url,
                        turn.resolved_duration_ms(),
                        to_db_time(turn.started_at),
                        to_db_time(turn.ended_at),
                        now,
                    ])?;
                }
            }

            let starts = count_assistant_run_starts(previous_role, fresh.iter().map(|t| t.role));
            if starts > 0 {
                tx.execute(
                    "INSERT INTO conversation_summaries
                       (participant_id, session, task_id, user_utterance_count, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT (participant_id, session, task_id) DO UPDATE SET
                       user_utterance_count = user_utterance_count + excluded.user_utterance_count,
                       updated_at = excluded.updated_at",
                    params![
                        scope.participant_id,
                        scope.session.as_str(),
                        scope.task_id,
                        starts,
                        now
                    ],
                )?;
            }
            outcome.inserted += fresh.len();
            outcome.assistant_run_starts += starts;
        }

        tx.commit()?;
        Ok(outcome)
    }

    /// # Errors
    /// Returns error if the query fails.
    pub fn list_turns(&self, scope: &TurnScope) -> Result<Vec<TurnView>, StorageError> {
        let conn = get_conn(&self.pool)?;
        let mut stmt = conn.prepare(
            "SELECT role, text, started_at, ended_at FROM conversation_turns
             WHERE participant_id = ?1 AND session = ?2 AND task_id = ?3 AND text IS NOT NULL
             ORDER BY turn_index",
        )?;
        let rows = stmt.query_map(
            params![scope.participant_id, scope.session.as_str(), scope.task_id],
            |row| {
                Ok(TurnView {
                    role: col_enum(row, 0)?,
                    text: row.get(1)?,
                    started_at: col_time(row, 2)?,
                    ended_at: col_time(row, 3)?,
                })
            },
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// # Errors
    /// Returns error if any insert fails; nothing is written in that case.
    pub fn append_timing_events(&self, events: &[NewTimingEvent]) -> Result<usize, StorageError> {
        if events.is_empty() {
            return Ok(0);
        }
        let mut conn = get_conn(&self.pool)?;
        let tx = conn.transaction()?;
        let now = to_db_time(Utc::now());
        {
            let mut insert = tx.prepare_cached(
                "INSERT INTO conversation_timings
                   (participant_id, session, task_id, event, occurred_at, extra, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for event in events {
                let extra = event.extra.as_ref().map(serde_json::to_string).transpose()?;
                insert.execute(params![
                    event.scope.participant_id,
                    event.scope.session.as_str(),
                    event.scope.task_id,
                    event.event,
                    to_db_time(event.timestamp),
                    extra,
                    now,
                ])?;
            }
        }
        tx.commit()?;
        Ok(events.len())
    }

    /// # Errors
    /// Returns error if the query fails.
    pub fn list_timing_events(&self, scope: &TurnScope) -> Result<Vec<TimingEvent>, StorageError> {
        let conn = get_conn(&self.pool)?;
        let mut stmt = conn.prepare(
            "SELECT id, event, occurred_at, extra FROM conversation_timings
             WHERE participant_id = ?1 AND session = ?2 AND task_id = ?3
             ORDER BY id",
        )?;
        let rows = stmt.query_map(
            params![scope.participant_id, scope.session.as_str(), scope.task_id],
            |row| {
                let extra: Option<String> = row.get(3)?;
                Ok(TimingEvent {
                    id: row.get(0)?,
                    participant_id: scope.participant_id.clone(),
                    session: scope.session,
                    task_id: scope.task_id.clone(),
                    event: row.get(1)?,
                    timestamp: col_time(row, 2)?,
                    extra: extra.map(|raw| parse_json(3, &raw)).transpose()?,
                })
            },
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// # Errors
    /// Returns error if the query fails.
    pub fn get_conversation_summary(
        &self,
        scope: &TurnScope,
    ) -> Result<ConversationSummary, StorageError> {
        let conn = get_conn(&self.pool)?;
        let (runs, last_index): (Option<i64>, Option<i64>) = conn.query_row(
            "SELECT
               (SELECT user_utterance_count FROM conversation_summaries
                 WHERE participant_id = ?1 AND session = ?2 AND task_id = ?3),
               (SELECT MAX(turn_index) FROM conversation_turns
                 WHERE participant_id = ?1 AND session = ?2 AND task_id = ?3)",
            params![scope.participant_id, scope.session.as_str(), scope.task_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(ConversationSummary {
            participant_id: scope.participant_id.clone(),
            session: scope.session,
            task_id: scope.task_id.clone(),
            user_utterance_count: runs.unwrap_or(0),
            next_turn_index: last_index.map_or(0, |i| i + 1),
        })
    }
}
