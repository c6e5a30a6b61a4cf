//! Async trait implementations for SQLite `Storage` via `spawn_blocking`.

use async_trait::async_trait;
use voice_study_core::{
    Assignment, Condition, ConversationSummary, Group, GroupCounts, NewSurveyResponse,
    NewTimingEvent, NewTurn, Participant, ParticipantProgress, PlaybackAsset, ProgressUpdate,
    Session, SurveyFilter, SurveyResponse, TaskId, TaskNote, TimingEvent, TurnScope, TurnView,
};

use crate::error::StorageError;
use crate::traits::{
    ConversationStore, ParticipantStore, PlaybackStore, ProgressStore, SurveyStore, TaskNoteStore,
};
use crate::types::{AppendOutcome, Registration};
use crate::Storage;

/// Helper: run a blocking closure on the tokio blocking pool.
async fn blocking<F, T>(f: F) -> Result<T, StorageError>
where
    F: FnOnce() -> Result<T, StorageError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

/// Body-generating macro for async-to-blocking delegation.
///
/// Each argument is annotated with a capture kind:
/// - `@ref arg`      : `.clone()` a `&T`, pass as `&arg`
/// - `@str arg`      : `.to_owned()` a `&str`, pass as `&arg`
/// - `@slice arg`    : `.to_vec()` a `&[T]`, pass as `&arg`
/// - `@val arg`      : move directly (Copy/owned types)
macro_rules! delegate {
    ($self:ident, $method:ident $(, @$kind:ident $arg:ident)*) => {{
        let s = $self.clone();
        $(delegate!(@capture $kind $arg);)*
        blocking(move || s.$method($(delegate!(@pass $kind $arg)),*)).await
    }};
    (@capture ref $arg:ident) => { let $arg = $arg.clone(); };
    (@capture str $arg:ident) => { let $arg = $arg.to_owned(); };
    (@capture slice $arg:ident) => { let $arg = $arg.to_vec(); };
    (@capture val $arg:ident) => { };
    (@pass ref $arg:ident) => { &$arg };
    (@pass str $arg:ident) => { &$arg };
    (@pass slice $arg:ident) => { &$arg };
    (@pass val $arg:ident) => { $arg };
}

// ── ParticipantStore ─────────────────────────────────────────────

#[async_trait]
impl ParticipantStore for Storage {
    async fn register_participant(
        &self,
        id: &str,
        explicit_group: Option<Group>,
    ) -> Result<Registration, StorageError> {
        delegate!(self, register_participant, @str id, @val explicit_group)
    }
    async fn get_participant(&self, id: &str) -> Result<Option<Participant>, StorageError> {
        delegate!(self, get_participant, @str id)
    }
    async fn list_participants(&self) -> Result<Vec<Participant>, StorageError> {
        delegate!(self, list_participants)
    }
    async fn list_assignments(
        &self,
        participant_id: &str,
    ) -> Result<Vec<Assignment>, StorageError> {
        delegate!(self, list_assignments, @str participant_id)
    }
    async fn group_counts(&self) -> Result<GroupCounts, StorageError> {
        delegate!(self, group_counts)
    }
}

// ── PlaybackStore ────────────────────────────────────────────────

#[async_trait]
impl PlaybackStore for Storage {
    async fn get_playback_asset(
        &self,
        participant_id: &str,
        task_id: TaskId,
        condition_id: Condition,
    ) -> Result<Option<PlaybackAsset>, StorageError> {
        delegate!(self, get_playback_asset, @str participant_id, @val task_id, @val condition_id)
    }
    async fn list_playback_assets(
        &self,
        participant_id: &str,
    ) -> Result<Vec<PlaybackAsset>, StorageError> {
        delegate!(self, list_playback_assets, @str participant_id)
    }
    async fn set_playback_audio_url(
        &self,
        participant_id: &str,
        task_id: TaskId,
        condition_id: Condition,
        audio_url: &str,
    ) -> Result<PlaybackAsset, StorageError> {
        delegate!(
            self,
            set_playback_audio_url,
            @str participant_id,
            @val task_id,
            @val condition_id,
            @str audio_url
        )
    }
}

// ── ProgressStore ────────────────────────────────────────────────

#[async_trait]
impl ProgressStore for Storage {
    async fn upsert_progress(
        &self,
        update: &ProgressUpdate,
    ) -> Result<ParticipantProgress, StorageError> {
        delegate!(self, upsert_progress, @ref update)
    }
    async fn get_progress(
        &self,
        participant_id: &str,
        session: Session,
    ) -> Result<Option<ParticipantProgress>, StorageError> {
        delegate!(self, get_progress, @str participant_id, @val session)
    }
    async fn list_progress(
        &self,
        participant_id: &str,
    ) -> Result<Vec<ParticipantProgress>, StorageError> {
        delegate!(self, list_progress, @str participant_id)
    }
}

// ── ConversationStore ────────────────────────────────────────────

#[async_trait]
impl ConversationStore for Storage {
    async fn append_turns(&self, turns: &[NewTurn]) -> Result<AppendOutcome, StorageError> {
        delegate!(self, append_turns, @slice turns)
    }
    async fn list_turns(&self, scope: &TurnScope) -> Result<Vec<TurnView>, StorageError> {
        delegate!(self, list_turns, @ref scope)
    }
    async fn append_timing_events(&self, events: &[NewTimingEvent]) -> Result<usize, StorageError> {
        delegate!(self, append_timing_events, @slice events)
    }
    async fn list_timing_events(
        &self,
        scope: &TurnScope,
    ) -> Result<Vec<TimingEvent>, StorageError> {
        delegate!(self, list_timing_events, @ref scope)
    }
    async fn get_conversation_summary(
        &self,
        scope: &TurnScope,
    ) -> Result<ConversationSummary, StorageError> {
        delegate!(self, get_conversation_summary, @ref scope)
    }
}

// ── SurveyStore / TaskNoteStore ──────────────────────────────────

#[async_trait]
impl SurveyStore for Storage {
    async fn save_survey(
        &self,
        response: &NewSurveyResponse,
    ) -> Result<SurveyResponse, StorageError> {
        delegate!(self, save_survey, @ref response)
    }
    async fn list_surveys(
        &self,
        filter: &SurveyFilter,
    ) -> Result<Vec<SurveyResponse>, StorageError> {
        delegate!(self, list_surveys, @ref filter)
    }
}

#[async_trait]
impl TaskNoteStore for Storage {
    async fn upsert_task_note(
        &self,
        participant_id: &str,
        task_id: TaskId,
        note: &str,
    ) -> Result<TaskNote, StorageError> {
        delegate!(self, upsert_task_note, @str participant_id, @val task_id, @str note)
    }
    async fn list_task_notes(&self, participant_id: &str) -> Result<Vec<TaskNote>, StorageError> {
        delegate!(self, list_task_notes, @str participant_id)
    }
}
