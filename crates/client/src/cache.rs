use std::collections::HashMap;

use voice_study_core::{Participant, ParticipantProgress, Session};

/// Write-through copy of the last known participant and checkpoints.
///
/// The server stays authoritative: the controller fills this only after a
/// successful read or write, and reads it only when the server is unreachable.
#[derive(Debug, Clone, Default)]
pub struct ProgressCache {
    participant: Option<Participant>,
    progress: HashMap<Session, ParticipantProgress>,
}

impl ProgressCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remember_participant(&mut self, participant: Participant) {
        if self.participant.as_ref().is_some_and(|p| p.id != participant.id) {
            self.progress.clear();
        }
        self.participant = Some(participant);
    }

    #[must_use]
    pub const fn participant(&self) -> Option<&Participant> {
        self.participant.as_ref()
    }

    pub fn store(&mut self, progress: ParticipantProgress) {
        self.progress.insert(progress.session, progress);
    }

    #[must_use]
    pub fn get(&self, session: Session) -> Option<&ParticipantProgress> {
        self.progress.get(&session)
    }

    pub fn clear(&mut self) {
        self.participant = None;
        self.progress.clear();
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use voice_study_core::{Group, Stage};

    use super::*;

    fn participant(id: &str) -> Participant {
        Participant { id: id.to_owned(), group: Group::G3, created_at: Utc::now() }
    }

    fn checkpoint(id: &str) -> ParticipantProgress {
        ParticipantProgress {
            participant_id: id.to_owned(),
            session: Session::S1,
            task_index: 1,
            stage: Stage::Post,
            completed: false,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn switching_participant_drops_checkpoints() {
        let mut cache = ProgressCache::new();
        cache.remember_participant(participant("a"));
        cache.store(checkpoint("a"));
        assert!(cache.get(Session::S1).is_some());

        cache.remember_participant(participant("a"));
        assert!(cache.get(Session::S1).is_some());

        cache.remember_participant(participant("b"));
        assert!(cache.get(Session::S1).is_none());
        assert_eq!(cache.participant().map(|p| p.id.as_str()), Some("b"));
    }
}
