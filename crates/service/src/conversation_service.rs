use std::collections::HashMap;
use std::sync::Arc;

use voice_study_core::{
    ConversationSummary, MAX_BATCH_LEN, NewTimingEvent, NewTurn, TimingEvent, TurnScope, TurnView,
    Validator,
};
use voice_study_storage::traits::ConversationStore;
use voice_study_storage::{AppendOutcome, StorageBackend};

use crate::ServiceError;

/// Turn and timing recorder.
pub struct ConversationService {
    storage: Arc<StorageBackend>,
}

fn check_batch_len(len: usize) -> Result<(), ServiceError> {
    if len > MAX_BATCH_LEN {
        return Err(ServiceError::invalid(
            "",
            format!("batch of {len} exceeds the limit of {MAX_BATCH_LEN}"),
        ));
    }
    Ok(())
}

fn check_scope(v: &mut Validator, index: usize, scope: &TurnScope) {
    if scope.participant_id.trim().is_empty() {
        v.push(format!("[{index}].participantId"), "must not be empty");
    }
    if scope.task_id.trim().is_empty() {
        v.push(format!("[{index}].taskId"), "must not be empty");
    }
}

impl ConversationService {
    #[must_use]
    pub const fn new(storage: Arc<StorageBackend>) -> Self {
        Self { storage }
    }

    /// Append a batch of turns, all or nothing.
    ///
    /// Indices must strictly increase per scope within the batch. Turns at or
    /// below the highest stored index of their scope are retries and are skipped.
    pub async fn append_turns(&self, turns: &[NewTurn]) -> Result<AppendOutcome, ServiceError> {
        check_batch_len(turns.len())?;
        if turns.is_empty() {
            return Ok(AppendOutcome::default());
        }

        let mut v = Validator::new();
        let mut last_index: HashMap<&TurnScope, i64> = HashMap::new();
        for (i, turn) in turns.iter().enumerate() {
            check_scope(&mut v, i, &turn.scope);
            if turn.turn_index < 0 {
                v.push(format!("[{i}].turnIndex"), "must be >= 0");
            }
            if let Some(prev) = last_index.insert(&turn.scope, turn.turn_index) {
                if turn.turn_index <= prev {
                    v.push(
                        format!("[{i}].turnIndex"),
                        format!("must be greater than {prev} within {}", turn.scope),
                    );
                }
            }
        }
        v.finish().map_err(ServiceError::Validation)?;

        let outcome = self.storage.append_turns(turns).await?;
        tracing::info!(
            count = outcome.inserted,
            skipped = outcome.skipped,
            assistant_runs = outcome.assistant_run_starts,
            "turns appended"
        );
        Ok(outcome)
    }

    /// Append timing events verbatim, all or nothing.
    pub async fn append_timing(&self, events: &[NewTimingEvent]) -> Result<usize, ServiceError> {
        check_batch_len(events.len())?;
        if events.is_empty() {
            return Ok(0);
        }

        let mut v = Validator::new();
        for (i, event) in events.iter().enumerate() {
            check_scope(&mut v, i, &event.scope);
            if event.event.trim().is_empty() {
                v.push(format!("[{i}].event"), "must not be empty");
            }
        }
        v.finish().map_err(ServiceError::Validation)?;

        let count = self.storage.append_timing_events(events).await?;
        tracing::debug!(count, "timing events appended");
        Ok(count)
    }

    /// Transcript ordered by turn index; turns without text are omitted.
    pub async fn list_turns(&self, scope: &TurnScope) -> Result<Vec<TurnView>, ServiceError> {
        Ok(self.storage.list_turns(scope).await?)
    }

    pub async fn list_timing(&self, scope: &TurnScope) -> Result<Vec<TimingEvent>, ServiceError> {
        Ok(self.storage.list_timing_events(scope).await?)
    }

    pub async fn summary(&self, scope: &TurnScope) -> Result<ConversationSummary, ServiceError> {
        Ok(self.storage.get_conversation_summary(scope).await?)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "test code")]

    use chrono::{Duration, Utc};
    use voice_study_core::{Role, Session};

    use super::*;
    use crate::test_support::sqlite_backend;

    fn turn(scope: &TurnScope, index: i64, role: Role) -> NewTurn {
        let started_at = Utc::now();
        NewTurn {
            scope: scope.clone(),
            turn_index: index,
            role,
            text: Some(format!("{role} {index}")),
            audio_url: None,
            duration_ms: None,
            started_at,
            ended_at: started_at + Duration::seconds(1),
        }
    }

    #[tokio::test]
    async fn summary_counts_assistant_runs() {
        let (backend, _dir) = sqlite_backend();
        let service = ConversationService::new(backend);
        let scope = TurnScope::new("p", Session::S1, "BIRTHDAY_GIFT");
        let roles = [Role::User, Role::Assistant, Role::Assistant, Role::User, Role::Assistant];
        let turns: Vec<NewTurn> =
            roles.iter().zip(0_i64..).map(|(role, i)| turn(&scope, i, *role)).collect();

        let outcome = service.append_turns(&turns).await.unwrap();
        assert_eq!(outcome.inserted, 5);

        let summary = service.summary(&scope).await.unwrap();
        assert_eq!(summary.user_utterance_count, 2);
        assert_eq!(summary.next_turn_index, 5);
    }

    #[tokio::test]
    async fn non_increasing_indices_reject_whole_batch() {
        let (backend, _dir) = sqlite_backend();
        let service = ConversationService::new(backend);
        let scope = TurnScope::new("p", Session::S1, "WEEKEND_TRIP");
        let turns = vec![
            turn(&scope, 0, Role::User),
            turn(&scope, 2, Role::Assistant),
            turn(&scope, 2, Role::User),
        ];

        let err = service.append_turns(&turns).await.unwrap_err();
        match err {
            ServiceError::Validation(issues) => {
                assert_eq!(issues.len(), 1);
                assert_eq!(issues[0].path, "[2].turnIndex");
            },
            other => panic!("unexpected error: {other}"),
        }
        assert!(service.list_turns(&scope).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn same_index_in_different_scopes_is_fine() {
        let (backend, _dir) = sqlite_backend();
        let service = ConversationService::new(backend);
        let a = TurnScope::new("p", Session::S1, "BIRTHDAY_GIFT");
        let b = TurnScope::new("p", Session::S1, "FAREWELL_PARTY");
        let outcome = service
            .append_turns(&[turn(&a, 0, Role::Assistant), turn(&b, 0, Role::Assistant)])
            .await
            .unwrap();
        assert_eq!(outcome.inserted, 2);
        assert_eq!(outcome.assistant_run_starts, 2);
    }

    #[tokio::test]
    async fn empty_batches_are_noops() {
        let (backend, _dir) = sqlite_backend();
        let service = ConversationService::new(backend);
        assert_eq!(service.append_turns(&[]).await.unwrap(), AppendOutcome::default());
        assert_eq!(service.append_timing(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn oversized_batch_is_rejected() {
        let (backend, _dir) = sqlite_backend();
        let service = ConversationService::new(backend);
        let scope = TurnScope::new("p", Session::S2, "BIRTHDAY_GIFT");
        let event = NewTimingEvent {
            scope,
            event: "session_start".to_owned(),
            timestamp: Utc::now(),
            extra: None,
        };
        let events = vec![event; MAX_BATCH_LEN + 1];
        assert!(matches!(
            service.append_timing(&events).await.unwrap_err(),
            ServiceError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn blank_timing_event_name_is_rejected() {
        let (backend, _dir) = sqlite_backend();
        let service = ConversationService::new(backend);
        let scope = TurnScope::new("p", Session::S2, "BIRTHDAY_GIFT");
        let events = [NewTimingEvent {
            scope: scope.clone(),
            event: " ".to_owned(),
            timestamp: Utc::now(),
            extra: None,
        }];
        let err = service.append_timing(&events).await.unwrap_err();
        assert!(
            matches!(err, ServiceError::Validation(ref issues) if issues[0].path == "[0].event")
        );
        assert!(service.list_timing(&scope).await.unwrap().is_empty());
    }
}
