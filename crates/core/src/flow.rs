//! Per-session task flow: `survey -> voice -> post` for each task, then `complete`.
//!
//! Transitions are pure and return the next state; callers persist it and only
//! then adopt it, so a failed write never moves the participant forward.

use serde::{Deserialize, Serialize};

use crate::error::FlowError;
use crate::progress::{ParticipantProgress, ProgressUpdate, Session, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowState {
    pub session: Session,
    pub task_index: usize,
    pub stage: Stage,
}

impl FlowState {
    /// Not started: first task, pre-task survey.
    #[must_use]
    pub const fn start(session: Session) -> Self {
        Self { session, task_index: 0, stage: Stage::Survey }
    }

    /// Rebuild the flow from a stored checkpoint; no checkpoint means not started.
    #[must_use]
    pub fn resume(session: Session, progress: Option<&ParticipantProgress>) -> Self {
        let Some(p) = progress else {
            return Self::start(session);
        };
        let last = session.task_count().saturating_sub(1);
        if p.completed || p.stage == Stage::Complete {
            return Self { session, task_index: last, stage: Stage::Complete };
        }
        let task_index = usize::try_from(p.task_index).unwrap_or(0).min(last);
        Self { session, task_index, stage: p.stage }
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self.stage, Stage::Complete)
    }

    #[must_use]
    pub const fn is_last_task(&self) -> bool {
        self.task_index + 1 >= self.session.task_count()
    }

    /// Pre-task survey submitted.
    ///
    /// # Errors
    /// `WrongStage` unless at `survey`.
    pub fn after_pre_survey(self) -> Result<Self, FlowError> {
        self.require_stage(Stage::Survey, "submit the pre-task survey")?;
        Ok(Self { stage: Stage::Voice, ..self })
    }

    /// Voice interaction finished.
    ///
    /// # Errors
    /// `WrongStage` unless at `voice`.
    pub fn after_voice(self) -> Result<Self, FlowError> {
        self.require_stage(Stage::Voice, "finish the voice interaction")?;
        Ok(Self { stage: Stage::Post, ..self })
    }

    /// Valid post-task survey submitted: next task, or `complete` after the last one.
    ///
    /// # Errors
    /// `WrongStage` unless at `post`.
    pub fn after_post_survey(self) -> Result<Self, FlowError> {
        self.require_stage(Stage::Post, "submit the post-task survey")?;
        if self.is_last_task() {
            Ok(Self { stage: Stage::Complete, ..self })
        } else {
            Ok(Self { task_index: self.task_index + 1, stage: Stage::Survey, ..self })
        }
    }

    /// Checkpoint for this state.
    #[must_use]
    pub fn to_update(&self, participant_id: &str) -> ProgressUpdate {
        ProgressUpdate::new(
            participant_id,
            self.session,
            i32::try_from(self.task_index).unwrap_or(i32::MAX),
            self.stage,
            self.is_complete(),
        )
    }

    fn require_stage(&self, stage: Stage, action: &'static str) -> Result<(), FlowError> {
        if self.is_complete() {
            return Err(FlowError::SessionComplete(self.session));
        }
        if self.stage != stage {
            return Err(FlowError::WrongStage { action, session: self.session, stage: self.stage });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn progress(task_index: i32, stage: Stage, completed: bool) -> ParticipantProgress {
        ParticipantProgress {
            participant_id: "p1".to_owned(),
            session: Session::S1,
            task_index,
            stage,
            completed,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn walks_three_tasks_to_complete() {
        let mut state = FlowState::start(Session::S1);
        for expected_index in 0..3 {
            assert_eq!(state.task_index, expected_index);
            assert_eq!(state.stage, Stage::Survey);
            state = state.after_pre_survey().unwrap();
            state = state.after_voice().unwrap();
            state = state.after_post_survey().unwrap();
        }
        assert!(state.is_complete());
        assert_eq!(state.task_index, 2);
        let update = state.to_update("p1");
        assert!(update.completed);
        assert_eq!(update.task_index, 2);
        assert_eq!(update.stage, Stage::Complete);
    }

    #[test]
    fn practice_completes_after_one_task() {
        let state = FlowState::start(Session::Practice)
            .after_pre_survey()
            .and_then(FlowState::after_voice)
            .and_then(FlowState::after_post_survey)
            .unwrap();
        assert!(state.is_complete());
        assert_eq!(state.task_index, 0);
    }

    #[test]
    fn out_of_order_transitions_are_rejected() {
        let state = FlowState::start(Session::S2);
        assert!(matches!(state.after_voice(), Err(FlowError::WrongStage { .. })));
        assert!(matches!(state.after_post_survey(), Err(FlowError::WrongStage { .. })));
    }

    #[test]
    fn complete_session_rejects_everything() {
        let state = FlowState::resume(Session::S1, Some(&progress(2, Stage::Complete, true)));
        assert_eq!(state.after_pre_survey(), Err(FlowError::SessionComplete(Session::S1)));
    }

    #[test]
    fn resume_without_checkpoint_starts_fresh() {
        assert_eq!(FlowState::resume(Session::S1, None), FlowState::start(Session::S1));
    }

    #[test]
    fn resume_restores_stage() {
        let state = FlowState::resume(Session::S1, Some(&progress(1, Stage::Voice, false)));
        assert_eq!(state.task_index, 1);
        assert_eq!(state.stage, Stage::Voice);
    }

    #[test]
    fn resume_treats_completed_flag_as_terminal() {
        let state = FlowState::resume(Session::S1, Some(&progress(1, Stage::Post, true)));
        assert!(state.is_complete());
    }

    #[test]
    fn resume_clamps_out_of_range_index() {
        let state = FlowState::resume(Session::S1, Some(&progress(9, Stage::Survey, false)));
        assert_eq!(state.task_index, 2);
        let state = FlowState::resume(Session::S1, Some(&progress(-3, Stage::Survey, false)));
        assert_eq!(state.task_index, 0);
    }
}
