use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::TASKS_PER_SESSION;
use crate::error::ParseError;

/// A block of tasks with its own progress checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Session {
    Practice,
    S1,
    S2,
}

impl Session {
    pub const ALL: [Self; 3] = [Self::Practice, Self::S1, Self::S2];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Practice => "practice",
            Self::S1 => "s1",
            Self::S2 => "s2",
        }
    }

    /// Number of tasks a participant works through in this session.
    #[must_use]
    pub const fn task_count(self) -> usize {
        match self {
            Self::Practice => 1,
            Self::S1 | Self::S2 => TASKS_PER_SESSION,
        }
    }

    /// Whether tasks in this session require a saved task note before the pre-survey.
    #[must_use]
    pub const fn requires_task_note(self) -> bool {
        !matches!(self, Self::Practice)
    }

    /// Session-level survey stage shown once all tasks are done.
    #[must_use]
    pub const fn follow_up_stage(self) -> Option<&'static str> {
        match self {
            Self::Practice => None,
            Self::S1 => Some("demographics"),
            Self::S2 => Some("impressions"),
        }
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Session {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| ParseError::new("session", s))
    }
}

/// Position within one task's flow, or the session-level terminal marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Survey,
    Voice,
    Post,
    Complete,
}

impl Stage {
    pub const ALL: [Self; 4] = [Self::Survey, Self::Voice, Self::Post, Self::Complete];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Survey => "survey",
            Self::Voice => "voice",
            Self::Post => "post",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| ParseError::new("stage", s))
    }
}

/// Persisted resumption checkpoint for one (participant, session).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantProgress {
    pub participant_id: String,
    pub session: Session,
    pub task_index: i32,
    pub stage: Stage,
    pub completed: bool,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for a progress upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub participant_id: String,
    pub session: Session,
    pub task_index: i32,
    pub stage: Stage,
    pub completed: bool,
}

impl ProgressUpdate {
    #[must_use]
    pub fn new(
        participant_id: impl Into<String>,
        session: Session,
        task_index: i32,
        stage: Stage,
        completed: bool,
    ) -> Self {
        Self { participant_id: participant_id.into(), session, task_index, stage, completed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_wire_names() {
        assert_eq!(serde_json::to_string(&Session::S1).unwrap(), "\"s1\"");
        assert_eq!("practice".parse::<Session>(), Ok(Session::Practice));
        assert!("s3".parse::<Session>().is_err());
    }

    #[test]
    fn session_shapes() {
        assert_eq!(Session::Practice.task_count(), 1);
        assert_eq!(Session::S2.task_count(), 3);
        assert!(!Session::Practice.requires_task_note());
        assert_eq!(Session::S1.follow_up_stage(), Some("demographics"));
        assert_eq!(Session::S2.follow_up_stage(), Some("impressions"));
    }

    #[test]
    fn stage_parse() {
        assert_eq!("complete".parse::<Stage>(), Ok(Stage::Complete));
        assert!("done".parse::<Stage>().is_err());
    }
}
