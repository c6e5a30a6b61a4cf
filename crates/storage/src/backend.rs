//! Unified storage backend with enum dispatch.

#[cfg(feature = "sqlite")]
use std::path::Path;

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

macro_rules! dispatch {
    ($self:expr, $trait:path, $method:ident ( $($arg:expr),* $(,)? )) => {
        match $self {
            #[cfg(feature = "sqlite")]
            StorageBackend::Sqlite(s) => <crate::Storage as $trait>::$method(s, $($arg),*).await,
            #[cfg(feature = "postgres")]
            StorageBackend::Postgres(s) => {
                <crate::pg_storage::PgStorage as $trait>::$method(s, $($arg),*).await
            },
        }
    };
}

#[derive(Clone, Debug)]
pub enum StorageBackend {
    #[cfg(feature = "sqlite")]
    Sqlite(crate::Storage),
    #[cfg(feature = "postgres")]
    Postgres(crate::pg_storage::PgStorage),
}

impl StorageBackend {
    #[cfg(feature = "sqlite")]
    pub fn new_sqlite(db_path: &Path) -> Result<Self, StorageError> {
        Ok(Self::Sqlite(crate::Storage::new(db_path)?))
    }

    #[cfg(feature = "postgres")]
    pub async fn new_postgres(
        database_url: &str,
        max_connections: u32,
    ) -> Result<Self, StorageError> {
        Ok(Self::Postgres(crate::pg_storage::PgStorage::new(database_url, max_connections).await?))
    }

    /// Short backend name for logs and the readiness endpoint.
    pub const fn kind(&self) -> &'static str {
        match self {
            #[cfg(feature = "sqlite")]
            Self::Sqlite(_) => "sqlite",
            #[cfg(feature = "postgres")]
            Self::Postgres(_) => "postgres",
        }
    }

    /// Cheap round trip to check the database is reachable.
    pub async fn ping(&self) -> Result<(), StorageError> {
        match self {
            #[cfg(feature = "sqlite")]
            Self::Sqlite(s) => {
                let s = s.clone();
                tokio::task::spawn_blocking(move || s.ping()).await?
            },
            #[cfg(feature = "postgres")]
            Self::Postgres(s) => s.ping().await,
        }
    }
}

// ── ParticipantStore ─────────────────────────────────────────────

#[async_trait]
impl ParticipantStore for StorageBackend {
    async fn register_participant(
        &self,
        id: &str,
        explicit_group: Option<Group>,
    ) -> Result<Registration, StorageError> {
        dispatch!(self, ParticipantStore, register_participant(id, explicit_group))
    }

    async fn get_participant(&self, id: &str) -> Result<Option<Participant>, StorageError> {
        dispatch!(self, ParticipantStore, get_participant(id))
    }

    async fn list_participants(&self) -> Result<Vec<Participant>, StorageError> {
        dispatch!(self, ParticipantStore, list_participants())
    }

    async fn list_assignments(
        &self,
        participant_id: &str,
    ) -> Result<Vec<Assignment>, StorageError> {
        dispatch!(self, ParticipantStore, list_assignments(participant_id))
    }

    async fn group_counts(&self) -> Result<GroupCounts, StorageError> {
        dispatch!(self, ParticipantStore, group_counts())
    }
}

// ── PlaybackStore ────────────────────────────────────────────────

#[async_trait]
impl PlaybackStore for StorageBackend {
    async fn get_playback_asset(
        &self,
        participant_id: &str,
        task_id: TaskId,
        condition_id: Condition,
    ) -> Result<Option<PlaybackAsset>, StorageError> {
        dispatch!(self, PlaybackStore, get_playback_asset(participant_id, task_id, condition_id))
    }

    async fn list_playback_assets(
        &self,
        participant_id: &str,
    ) -> Result<Vec<PlaybackAsset>, StorageError> {
        dispatch!(self, PlaybackStore, list_playback_assets(participant_id))
    }

    async fn set_playback_audio_url(
        &self,
        participant_id: &str,
        task_id: TaskId,
        condition_id: Condition,
        audio_url: &str,
    ) -> Result<PlaybackAsset, StorageError> {
        dispatch!(
            self,
            PlaybackStore,
            set_playback_audio_url(participant_id, task_id, condition_id, audio_url)
        )
    }
}

// ── ProgressStore ────────────────────────────────────────────────

#[async_trait]
impl ProgressStore for StorageBackend {
    async fn upsert_progress(
        &self,
        update: &ProgressUpdate,
    ) -> Result<ParticipantProgress, StorageError> {
        dispatch!(self, ProgressStore, upsert_progress(update))
    }

    async fn get_progress(
        &self,
        participant_id: &str,
        session: Session,
    ) -> Result<Option<ParticipantProgress>, StorageError> {
        dispatch!(self, ProgressStore, get_progress(participant_id, session))
    }

    async fn list_progress(
        &self,
        participant_id: &str,
    ) -> Result<Vec<ParticipantProgress>, StorageError> {
        dispatch!(self, ProgressStore, list_progress(participant_id))
    }
}

// ── ConversationStore ────────────────────────────────────────────

#[async_trait]
impl ConversationStore for StorageBackend {
    async fn append_turns(&self, turns: &[NewTurn]) -> Result<AppendOutcome, StorageError> {
        dispatch!(self, ConversationStore, append_turns(turns))
    }

    async fn list_turns(&self, scope: &TurnScope) -> Result<Vec<TurnView>, StorageError> {
        dispatch!(self, ConversationStore, list_turns(scope))
    }

    async fn append_timing_events(&self, events: &[NewTimingEvent]) -> Result<usize, StorageError> {
        dispatch!(self, ConversationStore, append_timing_events(events))
    }

    async fn list_timing_events(
        &self,
        scope: &TurnScope,
    ) -> Result<Vec<TimingEvent>, StorageError> {
        dispatch!(self, ConversationStore, list_timing_events(scope))
    }

    async fn get_conversation_summary(
        &self,
        scope: &TurnScope,
    ) -> Result<ConversationSummary, StorageError> {
        dispatch!(self, ConversationStore, get_conversation_summary(scope))
    }
}

// ── SurveyStore ──────────────────────────────────────────────────

#[async_trait]
impl SurveyStore for StorageBackend {
    async fn save_survey(
        &self,
        response: &NewSurveyResponse,
    ) -> Result<SurveyResponse, StorageError> {
        dispatch!(self, SurveyStore, save_survey(response))
    }

    async fn list_surveys(
        &self,
        filter: &SurveyFilter,
    ) -> Result<Vec<SurveyResponse>, StorageError> {
        dispatch!(self, SurveyStore, list_surveys(filter))
    }
}

// ── TaskNoteStore ────────────────────────────────────────────────

#[async_trait]
impl TaskNoteStore for StorageBackend {
    async fn upsert_task_note(
        &self,
        participant_id: &str,
        task_id: TaskId,
        note: &str,
    ) -> Result<TaskNote, StorageError> {
        dispatch!(self, TaskNoteStore, upsert_task_note(participant_id, task_id, note))
    }

    async fn list_task_notes(&self, participant_id: &str) -> Result<Vec<TaskNote>, StorageError> {
        dispatch!(self, TaskNoteStore, list_task_notes(participant_id))
    }
}
