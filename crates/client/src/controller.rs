use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use voice_study_core::{
    Condition, EVENT_ASSISTANT_END_TO_USER_START, EVENT_SESSION_START, EVENT_SESSION_STOP,
    FlowError, FlowState, Group, NewSurveyResponse, NewTimingEvent, NewTurn, PRACTICE_TASK_ID,
    Participant, PlanEntry, PlaybackAsset, Role, Session, Stage, TASKS_PER_SESSION, TurnScope,
    VOICE_TIME_LIMIT, assignment_plan, check_post_answers,
};

use crate::{ClientError, ExperimentApi, ProgressCache};

/// The task the participant is currently on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentTask {
    pub task_id: String,
    /// `None` for the practice task.
    pub plan: Option<PlanEntry>,
}

impl CurrentTask {
    #[must_use]
    pub fn condition(&self) -> Option<Condition> {
        self.plan.map(|p| p.condition_id)
    }
}

struct VoiceRun {
    deadline: DateTime<Utc>,
    last_assistant_end: Option<DateTime<Utc>>,
}

/// Register (or re-fetch) a participant and remember it in `cache`.
pub async fn enroll<A: ExperimentApi + ?Sized>(
    api: &A,
    cache: &mut ProgressCache,
    id: &str,
    group: Option<Group>,
) -> Result<Participant, ClientError> {
    let participant = api.register(id, group).await?;
    tracing::info!(participant_id = %participant.id, group = %participant.group, "enrolled");
    cache.remember_participant(participant.clone());
    Ok(participant)
}

/// Drives one participant through one session.
///
/// Progress writes gate every transition: the local state only moves after the
/// server accepted the new checkpoint. Surveys, turns and timing events are
/// best-effort; their failures are logged and queued as notices.
pub struct SessionController<A: ExperimentApi + ?Sized> {
    api: Arc<A>,
    cache: ProgressCache,
    participant: Participant,
    plan: [PlanEntry; TASKS_PER_SESSION],
    state: FlowState,
    note: Option<String>,
    next_turn_index: i64,
    voice: Option<VoiceRun>,
    notices: Vec<String>,
}

impl<A: ExperimentApi + ?Sized> SessionController<A> {
    /// Rebuild the flow for `session` from the server checkpoint, falling back
    /// to the cache only when the server cannot be reached.
    pub async fn resume(
        api: Arc<A>,
        mut cache: ProgressCache,
        participant: Participant,
        session: Session,
    ) -> Result<Self, ClientError> {
        cache.remember_participant(participant.clone());
        let checkpoint = match api.get_progress(&participant.id, session).await {
            Ok(Some(progress)) => {
                cache.store(progress.clone());
                Some(progress)
            },
            Ok(None) => None,
            Err(e) => match cache.get(session) {
                Some(cached) => {
                    tracing::warn!(
                        error = %e,
                        session = %session,
                        "progress read failed, using cached checkpoint"
                    );
                    Some(cached.clone())
                },
                None => return Err(e),
            },
        };
        let state = FlowState::resume(session, checkpoint.as_ref());
        tracing::info!(
            participant_id = %participant.id,
            session = %session,
            task_index = state.task_index,
            stage = %state.stage,
            "session resumed"
        );
        let mut controller = Self {
            api,
            cache,
            plan: assignment_plan(participant.group),
            participant,
            state,
            note: None,
            next_turn_index: 0,
            voice: None,
            notices: Vec::new(),
        };
        match controller.state.stage {
            Stage::Voice => controller.seed_turn_index().await,
            Stage::Survey => controller.restore_note().await,
            Stage::Post | Stage::Complete => {},
        }
        Ok(controller)
    }

    #[must_use]
    pub const fn state(&self) -> FlowState {
        self.state
    }

    #[must_use]
    pub const fn participant(&self) -> &Participant {
        &self.participant
    }

    #[must_use]
    pub const fn cache(&self) -> &ProgressCache {
        &self.cache
    }

    #[must_use]
    pub const fn next_turn_index(&self) -> i64 {
        self.next_turn_index
    }

    #[must_use]
    pub const fn is_voice_active(&self) -> bool {
        self.voice.is_some()
    }

    /// Drain messages about best-effort writes that failed.
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    #[must_use]
    pub fn current_task(&self) -> CurrentTask {
        if self.state.session == Session::Practice {
            return CurrentTask { task_id: PRACTICE_TASK_ID.to_owned(), plan: None };
        }
        let entry = self.plan.get(self.state.task_index).copied();
        CurrentTask {
            task_id: entry
                .map_or_else(|| PRACTICE_TASK_ID.to_owned(), |e| e.task_id.as_str().to_owned()),
            plan: entry,
        }
    }

    fn scope(&self) -> TurnScope {
        TurnScope::new(self.participant.id.clone(), self.state.session, self.current_task().task_id)
    }

    /// Playback audio curated for the current task, if any.
    pub async fn playback_asset(&self) -> Result<Option<PlaybackAsset>, ClientError> {
        let Some(entry) = self.current_task().plan else {
            return Ok(None);
        };
        self.api.get_playback_asset(&self.participant.id, entry.task_id, entry.condition_id).await
    }

    /// Save the planning note required before the pre-task survey.
    pub async fn save_note(&mut self, note: &str) -> Result<(), ClientError> {
        if self.state.is_complete() {
            return Err(FlowError::SessionComplete(self.state.session).into());
        }
        if self.state.stage != Stage::Survey {
            return Err(FlowError::WrongStage {
                action: "save a task note",
                session: self.state.session,
                stage: self.state.stage,
            }
            .into());
        }
        let note = note.trim();
        if note.is_empty() {
            return Err(FlowError::NoteRequired.into());
        }
        if let Some(entry) = self.current_task().plan {
            self.api.save_task_note(&self.participant.id, entry.task_id, note).await?;
        }
        self.note = Some(note.to_owned());
        Ok(())
    }

    /// Submit the pre-task survey and move to the voice stage.
    pub async fn submit_pre_survey(&mut self, answers: Value) -> Result<FlowState, ClientError> {
        let next = self.state.after_pre_survey()?;
        if self.state.session.requires_task_note() && self.note.is_none() {
            return Err(FlowError::NoteRequired.into());
        }
        let mut answers = answers;
        if let (Some(map), Some(note)) = (answers.as_object_mut(), &self.note) {
            map.insert("note".to_owned(), Value::String(note.clone()));
        }
        self.save_survey_best_effort("pre", answers).await;
        self.persist(next).await
    }

    /// Open the voice interaction; it auto-closes after the time limit (see `tick`).
    pub async fn start_voice(&mut self, now: DateTime<Utc>) -> Result<(), ClientError> {
        if self.state.stage != Stage::Voice {
            return Err(FlowError::WrongStage {
                action: "start the voice interaction",
                session: self.state.session,
                stage: self.state.stage,
            }
            .into());
        }
        if self.voice.is_some() {
            return Err(FlowError::VoiceActive.into());
        }
        self.seed_turn_index().await;
        let limit = chrono::Duration::from_std(VOICE_TIME_LIMIT).unwrap_or(chrono::Duration::MAX);
        self.voice = Some(VoiceRun { deadline: now + limit, last_assistant_end: None });
        self.emit_timing(EVENT_SESSION_START, now, None).await;
        Ok(())
    }

    /// Record one finished utterance with the next turn index.
    pub async fn record_turn(
        &mut self,
        role: Role,
        text: Option<String>,
        audio_url: Option<String>,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    ) -> Result<i64, ClientError> {
        let Some(voice) = self.voice.as_mut() else {
            return Err(FlowError::WrongStage {
                action: "record a turn",
                session: self.state.session,
                stage: self.state.stage,
            }
            .into());
        };
        if role == Role::Assistant {
            voice.last_assistant_end = Some(ended_at);
        }
        let turn_index = self.next_turn_index;
        self.next_turn_index += 1;
        let turn = NewTurn {
            scope: self.scope(),
            turn_index,
            role,
            text,
            audio_url,
            duration_ms: None,
            started_at,
            ended_at,
        };
        if let Err(e) = self.api.append_turns(std::slice::from_ref(&turn)).await {
            self.notice(format!("turn {turn_index} was not saved"), &e);
        }
        Ok(turn_index)
    }

    /// The participant started speaking; logs the gap since the assistant finished.
    pub async fn user_speech_started(&mut self, at: DateTime<Utc>) {
        let Some(end) = self.voice.as_mut().and_then(|v| v.last_assistant_end.take()) else {
            return;
        };
        let delay_ms = (at - end).num_milliseconds().max(0);
        let extra = json!({ "delayMs": delay_ms });
        self.emit_timing(EVENT_ASSISTANT_END_TO_USER_START, at, Some(extra)).await;
    }

    /// Close the voice interaction and move to the post-task survey.
    pub async fn finish_voice(&mut self, now: DateTime<Utc>) -> Result<FlowState, ClientError> {
        let next = self.state.after_voice()?;
        // `post` keeps the task index, so the stop event lands in the same scope.
        let saved = self.persist(next).await?;
        if self.voice.take().is_some() {
            self.emit_timing(EVENT_SESSION_STOP, now, None).await;
        }
        Ok(saved)
    }

    /// Auto-finish the voice stage once its deadline passed. Returns whether it fired.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Result<bool, ClientError> {
        let expired = self.voice.as_ref().is_some_and(|v| now >= v.deadline);
        if !expired {
            return Ok(false);
        }
        tracing::info!(participant_id = %self.participant.id, "voice time limit reached");
        self.finish_voice(now).await?;
        Ok(true)
    }

    /// Submit the post-task survey and advance to the next task or `complete`.
    pub async fn submit_post_survey(&mut self, answers: Value) -> Result<FlowState, ClientError> {
        let next = self.state.after_post_survey()?;
        check_post_answers(&answers).map_err(FlowError::IncompleteAnswers)?;
        self.save_survey_best_effort("post", answers).await;
        let saved = self.persist(next).await?;
        self.note = None;
        self.next_turn_index = 0;
        Ok(saved)
    }

    /// Submit the end-of-session questionnaire (`demographics` after s1,
    /// `impressions` after s2). Practice has none. Returns the stage submitted.
    pub async fn finish_follow_up(
        &mut self,
        answers: Value,
    ) -> Result<Option<&'static str>, ClientError> {
        if !self.state.is_complete() {
            return Err(FlowError::WrongStage {
                action: "submit the session follow-up",
                session: self.state.session,
                stage: self.state.stage,
            }
            .into());
        }
        let Some(stage) = self.state.session.follow_up_stage() else {
            return Ok(None);
        };
        let response = NewSurveyResponse {
            participant_id: self.participant.id.clone(),
            session: self.state.session,
            task_id: None,
            stage: stage.to_owned(),
            condition: None,
            answers,
        };
        self.api.submit_survey(&response).await?;
        tracing::info!(participant_id = %self.participant.id, stage, "follow-up submitted");
        Ok(Some(stage))
    }

    async fn persist(&mut self, next: FlowState) -> Result<FlowState, ClientError> {
        let saved = self.api.upsert_progress(&next.to_update(&self.participant.id)).await?;
        self.cache.store(saved);
        self.state = next;
        Ok(next)
    }

    /// Pick up a note saved before a reload so the gate does not ask for it twice.
    async fn restore_note(&mut self) {
        if !self.state.session.requires_task_note() {
            return;
        }
        let Some(entry) = self.current_task().plan else {
            return;
        };
        match self.api.list_task_notes(&self.participant.id).await {
            Ok(notes) => {
                self.note = notes
                    .into_iter()
                    .find(|n| n.task_id == entry.task_id && !n.note.trim().is_empty())
                    .map(|n| n.note);
            },
            Err(e) => tracing::warn!(
                error = %e,
                participant_id = %self.participant.id,
                "could not read saved task notes"
            ),
        }
    }

    async fn seed_turn_index(&mut self) {
        let scope = self.scope();
        match self.api.conversation_summary(&scope).await {
            Ok(summary) => {
                self.next_turn_index = self.next_turn_index.max(summary.next_turn_index);
            },
            Err(e) => {
                tracing::warn!(error = %e, scope = %scope, "could not read conversation summary");
            },
        }
    }

    async fn save_survey_best_effort(&mut self, stage: &str, answers: Value) {
        let task = self.current_task();
        let response = NewSurveyResponse {
            participant_id: self.participant.id.clone(),
            session: self.state.session,
            task_id: Some(task.task_id),
            stage: stage.to_owned(),
            condition: task.plan.map(|p| p.condition_id.as_str().to_owned()),
            answers,
        };
        if let Err(e) = self.api.submit_survey(&response).await {
            self.notice(format!("{stage} survey was not saved"), &e);
        }
    }

    async fn emit_timing(&mut self, event: &str, timestamp: DateTime<Utc>, extra: Option<Value>) {
        let timing =
            NewTimingEvent { scope: self.scope(), event: event.to_owned(), timestamp, extra };
        if let Err(e) = self.api.append_timing(std::slice::from_ref(&timing)).await {
            self.notice(format!("{event} timing was not saved"), &e);
        }
    }

    fn notice(&mut self, message: String, error: &ClientError) {
        tracing::warn!(error = %error, participant_id = %self.participant.id, "{message}");
        self.notices.push(message);
    }
}
