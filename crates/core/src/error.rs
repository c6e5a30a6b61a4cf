use thiserror::Error;

use crate::{Session, Stage};

/// A string did not name any variant of a closed domain enum.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value:?}")]
pub struct ParseError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self { kind, value: value.to_owned() }
    }
}

/// A session-flow transition was requested from a stage that does not allow it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("cannot {action} while session {session} is at stage {stage}")]
    WrongStage { action: &'static str, session: Session, stage: Stage },

    #[error("session {0} is already complete")]
    SessionComplete(Session),

    #[error("a task note must be saved before the pre-task survey")]
    NoteRequired,

    #[error("post-task survey is incomplete: {0}")]
    IncompleteAnswers(String),

    #[error("voice interaction is still active")]
    VoiceActive,
}
