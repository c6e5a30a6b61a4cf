//! Conversation turns, timing events and the assistant-run summary.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::progress::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            _ => Err(ParseError::new("role", s)),
        }
    }
}

/// The (participant, session, task) key shared by turns, timings and summaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnScope {
    pub participant_id: String,
    pub session: Session,
    pub task_id: String,
}

impl TurnScope {
    #[must_use]
    pub fn new(
        participant_id: impl Into<String>,
        session: Session,
        task_id: impl Into<String>,
    ) -> Self {
        Self { participant_id: participant_id.into(), session, task_id: task_id.into() }
    }
}

impl fmt::Display for TurnScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.participant_id, self.session, self.task_id)
    }
}

/// Validated turn ready to be appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTurn {
    pub scope: TurnScope,
    pub turn_index: i64,
    pub role: Role,
    pub text: Option<String>,
    pub audio_url: Option<String>,
    pub duration_ms: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl NewTurn {
    /// Explicit duration if given, else `ended_at - started_at`; never negative.
    #[must_use]
    pub fn resolved_duration_ms(&self) -> i64 {
        self.duration_ms
            .unwrap_or_else(|| (self.ended_at - self.started_at).num_milliseconds())
            .max(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurn {
    pub id: i64,
    pub participant_id: String,
    pub session: Session,
    pub task_id: String,
    pub turn_index: i64,
    pub role: Role,
    pub text: Option<String>,
    pub audio_url: Option<String>,
    pub duration_ms: i64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

/// Transcript row returned to the UI; only turns with text are listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnView {
    pub role: Role,
    pub text: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTimingEvent {
    pub scope: TurnScope,
    pub event: String,
    pub timestamp: DateTime<Utc>,
    pub extra: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingEvent {
    pub id: i64,
    pub participant_id: String,
    pub session: Session,
    pub task_id: String,
    pub event: String,
    pub timestamp: DateTime<Utc>,
    pub extra: Option<serde_json::Value>,
}

/// Running per-task counters.
///
/// `user_utterance_count` counts assistant runs that start right after a
/// non-assistant turn, accumulated across every appended batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub participant_id: String,
    pub session: Session,
    pub task_id: String,
    pub user_utterance_count: i64,
    /// Highest stored turn index plus one, or 0 when nothing is stored.
    pub next_turn_index: i64,
}

/// Number of maximal assistant runs in `roles` preceded by a non-assistant
/// role, where `previous` is the role of the last already-stored turn.
#[must_use]
pub fn count_assistant_run_starts<I>(previous: Option<Role>, roles: I) -> i64
where
    I: IntoIterator<Item = Role>,
{
    let mut prev = previous;
    let mut starts = 0;
    for role in roles {
        if role == Role::Assistant && prev != Some(Role::Assistant) {
            starts += 1;
        }
        prev = Some(role);
    }
    starts
}

/// Group turns by scope, keeping first-seen scope order and batch order within a scope.
#[must_use]
pub fn partition_by_scope(turns: &[NewTurn]) -> Vec<(TurnScope, Vec<&NewTurn>)> {
    let mut groups: Vec<(TurnScope, Vec<&NewTurn>)> = Vec::new();
    for turn in turns {
        match groups.iter_mut().find(|(scope, _)| *scope == turn.scope) {
            Some((_, members)) => members.push(turn),
            None => groups.push((turn.scope.clone(), vec![turn])),
        }
    }
    groups
}
