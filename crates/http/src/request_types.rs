//! Request bodies and query strings.
//!
//! Fields are deserialized leniently (everything optional, enums as strings)
//! and then converted into domain input with a `Validator`, so a bad request
//! reports every rejected field at once instead of the first serde error.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use voice_study_core::{
    Condition, Group, NewSurveyResponse, NewTimingEvent, NewTurn, ProgressUpdate, Role, Session,
    SurveyFilter, TaskId, TurnScope, ValidationIssue, Validator,
};

type Checked<T> = Result<T, Vec<ValidationIssue>>;

fn at(index: usize, field: &str) -> String {
    format!("[{index}].{field}")
}

fn check_scope(
    v: &mut Validator,
    prefix: &dyn Fn(&str) -> String,
    participant_id: Option<String>,
    session: Option<String>,
    task_id: Option<String>,
) -> Option<TurnScope> {
    let participant_id = v.required(&prefix("participantId"), participant_id);
    let session = v.parse::<Session>(&prefix("session"), session);
    let task_id = v.required(&prefix("taskId"), task_id);
    Some(TurnScope::new(participant_id?, session?, task_id?))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub id: Option<String>,
    pub group: Option<String>,
}

impl RegisterRequest {
    pub fn into_checked(self) -> Checked<(String, Option<Group>)> {
        let mut v = Validator::new();
        let id = v.required("id", self.id.map(|id| id.trim().to_owned()));
        let group = v.parse_optional::<Group>("group", self.group.filter(|g| !g.is_empty()));
        v.finish_with(|| Some((id?, group)))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRequest {
    pub participant_id: Option<String>,
    pub session: Option<String>,
    pub task_index: Option<i64>,
    pub stage: Option<String>,
    pub completed: Option<bool>,
}

impl ProgressRequest {
    pub fn into_checked(self) -> Checked<ProgressUpdate> {
        let mut v = Validator::new();
        let participant_id = v.required("participantId", self.participant_id);
        let session = v.parse("session", self.session);
        let task_index = v.at_least("taskIndex", self.task_index, 0).and_then(|i| {
            let narrowed = i32::try_from(i).ok();
            if narrowed.is_none() {
                v.push("taskIndex", "is out of range");
            }
            narrowed
        });
        let stage = v.parse("stage", self.stage);
        let completed = self.completed.unwrap_or(false);
        v.finish_with(|| {
            Some(ProgressUpdate::new(participant_id?, session?, task_index?, stage?, completed))
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    pub participant_id: Option<String>,
    pub session: Option<String>,
    pub task_id: Option<String>,
    pub turn_index: Option<i64>,
    pub role: Option<String>,
    pub text: Option<String>,
    pub audio_url: Option<String>,
    pub duration_ms: Option<i64>,
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
}

/// Validate a whole batch; any bad element rejects all of them.
pub fn check_turns(batch: Vec<TurnRequest>) -> Checked<Vec<NewTurn>> {
    let mut v = Validator::new();
    let mut turns = Vec::with_capacity(batch.len());
    for (i, t) in batch.into_iter().enumerate() {
        let prefix = |field: &str| at(i, field);
        let scope = check_scope(&mut v, &prefix, t.participant_id, t.session, t.task_id);
        let turn_index = v.at_least(&prefix("turnIndex"), t.turn_index, 0);
        let role = v.parse::<Role>(&prefix("role"), t.role);
        let started_at = v.parse::<DateTime<Utc>>(&prefix("startedAt"), t.started_at);
        let ended_at = v.parse::<DateTime<Utc>>(&prefix("endedAt"), t.ended_at);
        if let (Some(scope), Some(turn_index), Some(role), Some(started_at), Some(ended_at)) =
            (scope, turn_index, role, started_at, ended_at)
        {
            turns.push(NewTurn {
                scope,
                turn_index,
                role,
                text: t.text,
                audio_url: t.audio_url.filter(|u| !u.is_empty()),
                duration_ms: t.duration_ms,
                started_at,
                ended_at,
            });
        }
    }
    v.finish().map(|()| turns)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingRequest {
    pub participant_id: Option<String>,
    pub session: Option<String>,
    pub task_id: Option<String>,
    pub event: Option<String>,
    pub timestamp: Option<String>,
    pub extra: Option<serde_json::Value>,
}

/// Events without a timestamp are stamped with `now`.
pub fn check_timing(batch: Vec<TimingRequest>, now: DateTime<Utc>) -> Checked<Vec<NewTimingEvent>> {
    let mut v = Validator::new();
    let mut events = Vec::with_capacity(batch.len());
    for (i, e) in batch.into_iter().enumerate() {
        let prefix = |field: &str| at(i, field);
        let scope = check_scope(&mut v, &prefix, e.participant_id, e.session, e.task_id);
        let event = v.required(&prefix("event"), e.event);
        let timestamp =
            v.parse_optional::<DateTime<Utc>>(&prefix("timestamp"), e.timestamp).unwrap_or(now);
        if let (Some(scope), Some(event)) = (scope, event) {
            events.push(NewTimingEvent { scope, event, timestamp, extra: e.extra });
        }
    }
    v.finish().map(|()| events)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyRequest {
    pub participant_id: Option<String>,
    pub session: Option<String>,
    pub task_id: Option<String>,
    pub stage: Option<String>,
    pub condition: Option<String>,
    pub answers: Option<serde_json::Value>,
}

impl SurveyRequest {
    pub fn into_checked(self) -> Checked<NewSurveyResponse> {
        let mut v = Validator::new();
        let participant_id = v.required("participantId", self.participant_id);
        let session = v.parse("session", self.session);
        let stage = v.required("stage", self.stage);
        if self.answers.is_none() {
            v.push("answers", "is required");
        }
        v.finish_with(|| {
            Some(NewSurveyResponse {
                participant_id: participant_id?,
                session: session?,
                task_id: self.task_id.filter(|t| !t.is_empty()),
                stage: stage?,
                condition: self.condition.filter(|c| !c.is_empty()),
                answers: self.answers?,
            })
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskNoteRequest {
    pub participant_id: Option<String>,
    pub task_id: Option<String>,
    pub note: Option<String>,
}

impl TaskNoteRequest {
    pub fn into_checked(self) -> Checked<(String, TaskId, String)> {
        let mut v = Validator::new();
        let participant_id = v.required("participantId", self.participant_id);
        let task_id = v.parse("taskId", self.task_id);
        // An empty note clears a saved one; only a missing field is rejected.
        if self.note.is_none() {
            v.push("note", "is required");
        }
        let note = self.note;
        v.finish_with(|| Some((participant_id?, task_id?, note?)))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressQuery {
    pub participant_id: Option<String>,
    pub session: Option<String>,
}

impl ProgressQuery {
    pub fn into_checked(self) -> Checked<(String, Option<Session>)> {
        let mut v = Validator::new();
        let participant_id = v.required("participantId", self.participant_id);
        let session = v.parse_optional("session", self.session.filter(|s| !s.is_empty()));
        v.finish_with(|| Some((participant_id?, session)))
    }
}

/// `participantId`, `session` and `taskId`; used by the turn, timing and summary reads.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeQuery {
    pub participant_id: Option<String>,
    pub session: Option<String>,
    pub task_id: Option<String>,
}

impl ScopeQuery {
    pub fn into_checked(self) -> Checked<TurnScope> {
        let mut v = Validator::new();
        let plain = |field: &str| field.to_owned();
        let scope =
            check_scope(&mut v, &plain, self.participant_id, self.session, self.task_id);
        v.finish_with(|| scope)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyQuery {
    pub participant_id: Option<String>,
    pub session: Option<String>,
    pub stage: Option<String>,
}

impl SurveyQuery {
    pub fn into_checked(self) -> Checked<SurveyFilter> {
        let mut v = Validator::new();
        let session = v.parse_optional("session", self.session.filter(|s| !s.is_empty()));
        v.finish()?;
        Ok(SurveyFilter {
            participant_id: self.participant_id.filter(|p| !p.is_empty()),
            session,
            stage: self.stage.filter(|s| !s.is_empty()),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantQuery {
    pub participant_id: Option<String>,
}

impl ParticipantQuery {
    pub fn into_checked(self) -> Checked<String> {
        let mut v = Validator::new();
        let participant_id = v.required("participantId", self.participant_id);
        v.finish_with(|| participant_id)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackQuery {
    pub participant_id: Option<String>,
    pub task_id: Option<String>,
    pub condition_id: Option<String>,
}

impl PlaybackQuery {
    pub fn into_checked(self) -> Checked<(String, TaskId, Condition)> {
        let mut v = Validator::new();
        let participant_id = v.required("participantId", self.participant_id);
        let task_id = v.parse("taskId", self.task_id);
        let condition_id = v.parse("conditionId", self.condition_id);
        v.finish_with(|| Some((participant_id?, task_id?, condition_id?)))
    }
}
