use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use voice_study_core::{
    Condition, ConversationSummary, Group, NewSurveyResponse, NewTimingEvent, NewTurn,
    Participant, ParticipantProgress, PlaybackAsset, ProgressUpdate, Role, Session,
    SurveyResponse, TaskId, TaskNote, TurnScope, count_assistant_run_starts,
};

use crate::{ClientError, ExperimentApi};

#[derive(Default)]
pub struct FakeState {
    pub participants: HashMap<String, Participant>,
    pub progress: HashMap<(String, Session), ParticipantProgress>,
    pub turns: Vec<NewTurn>,
    pub timing: Vec<NewTimingEvent>,
    pub surveys: Vec<NewSurveyResponse>,
    pub notes: HashMap<(String, TaskId), String>,
    pub progress_writes: usize,
}

/// Failure switches flip individual operations to HTTP 500.
#[derive(Default)]
pub struct FakeApi {
    pub state: Mutex<FakeState>,
    pub fail_progress_reads: Mutex<bool>,
    pub fail_progress_writes: Mutex<bool>,
    pub fail_telemetry: Mutex<bool>,
}

fn server_error() -> ClientError {
    ClientError::Status { code: 500, body: "{\"error\":\"internal server error\"}".to_owned() }
}

impl FakeApi {
    pub fn set(flag: &Mutex<bool>, value: bool) {
        *flag.lock().unwrap() = value;
    }

    fn failing(flag: &Mutex<bool>) -> bool {
        *flag.lock().unwrap()
    }

    pub fn events(&self) -> Vec<String> {
        self.state.lock().unwrap().timing.iter().map(|e| e.event.clone()).collect()
    }
}

#[async_trait]
impl ExperimentApi for FakeApi {
    async fn register(&self, id: &str, group: Option<Group>) -> Result<Participant, ClientError> {
        let mut state = self.state.lock().unwrap();
        let participant = state.participants.entry(id.to_owned()).or_insert_with(|| Participant {
            id: id.to_owned(),
            group: group.unwrap_or(Group::G1),
            created_at: Utc::now(),
        });
        Ok(participant.clone())
    }

    async fn get_progress(
        &self,
        participant_id: &str,
        session: Session,
    ) -> Result<Option<ParticipantProgress>, ClientError> {
        if Self::failing(&self.fail_progress_reads) {
            return Err(server_error());
        }
        Ok(self.state.lock().unwrap().progress.get(&(participant_id.to_owned(), session)).cloned())
    }

    async fn upsert_progress(
        &self,
        update: &ProgressUpdate,
    ) -> Result<ParticipantProgress, ClientError> {
        if Self::failing(&self.fail_progress_writes) {
            return Err(server_error());
        }
        let saved = ParticipantProgress {
            participant_id: update.participant_id.clone(),
            session: update.session,
            task_index: update.task_index,
            stage: update.stage,
            completed: update.completed,
            updated_at: Utc::now(),
        };
        let mut state = self.state.lock().unwrap();
        state.progress_writes += 1;
        state.progress.insert((update.participant_id.clone(), update.session), saved.clone());
        Ok(saved)
    }

    async fn append_turns(&self, turns: &[NewTurn]) -> Result<(), ClientError> {
        if Self::failing(&self.fail_telemetry) {
            return Err(server_error());
        }
        self.state.lock().unwrap().turns.extend_from_slice(turns);
        Ok(())
    }

    async fn append_timing(&self, events: &[NewTimingEvent]) -> Result<(), ClientError> {
        if Self::failing(&self.fail_telemetry) {
            return Err(server_error());
        }
        self.state.lock().unwrap().timing.extend_from_slice(events);
        Ok(())
    }

    async fn conversation_summary(
        &self,
        scope: &TurnScope,
    ) -> Result<ConversationSummary, ClientError> {
        let state = self.state.lock().unwrap();
        let roles: Vec<Role> =
            state.turns.iter().filter(|t| t.scope == *scope).map(|t| t.role).collect();
        let last = state.turns.iter().filter(|t| t.scope == *scope).map(|t| t.turn_index).max();
        Ok(ConversationSummary {
            participant_id: scope.participant_id.clone(),
            session: scope.session,
            task_id: scope.task_id.clone(),
            user_utterance_count: count_assistant_run_starts(None, roles),
            next_turn_index: last.map_or(0, |i| i + 1),
        })
    }

    async fn submit_survey(
        &self,
        response: &NewSurveyResponse,
    ) -> Result<SurveyResponse, ClientError> {
        if Self::failing(&self.fail_telemetry) {
            return Err(server_error());
        }
        let mut state = self.state.lock().unwrap();
        state.surveys.push(response.clone());
        Ok(SurveyResponse {
            id: i64::try_from(state.surveys.len()).unwrap(),
            participant_id: response.participant_id.clone(),
            session: response.session,
            task_id: response.task_id.clone(),
            stage: response.stage.clone(),
            condition: response.condition.clone(),
            answers: response.answers.clone(),
            created_at: Utc::now(),
        })
    }

    async fn save_task_note(
        &self,
        participant_id: &str,
        task_id: TaskId,
        note: &str,
    ) -> Result<TaskNote, ClientError> {
        let key = (participant_id.to_owned(), task_id);
        self.state.lock().unwrap().notes.insert(key, note.to_owned());
        Ok(TaskNote {
            id: format!("{participant_id}-{task_id}"),
            participant_id: participant_id.to_owned(),
            task_id,
            note: note.to_owned(),
            updated_at: Utc::now(),
        })
    }

    async fn list_task_notes(&self, participant_id: &str) -> Result<Vec<TaskNote>, ClientError> {
        if Self::failing(&self.fail_progress_reads) {
            return Err(server_error());
        }
        let state = self.state.lock().unwrap();
        let mut notes: Vec<TaskNote> = state
            .notes
            .iter()
            .filter(|((pid, _), _)| pid == participant_id)
            .map(|((pid, task_id), note)| TaskNote {
                id: format!("{pid}-{task_id}"),
                participant_id: pid.clone(),
                task_id: *task_id,
                note: note.clone(),
                updated_at: Utc::now(),
            })
            .collect();
        notes.sort_by_key(|n| n.task_id);
        Ok(notes)
    }

        async fn get_playback_asset(
        &self,
        participant_id: &str,
        task_id: TaskId,
        condition_id: Condition,
    ) -> Result<Option<PlaybackAsset>, ClientError> {
        if !self.state.lock().unwrap().participants.contains_key(participant_id) {
            return Ok(None);
        }
        Ok(Some(PlaybackAsset {
            id: format!("{participant_id}-{task_id}"),
            participant_id: participant_id.to_owned(),
            task_id,
            condition_id,
            audio_url: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }))
    }
}
