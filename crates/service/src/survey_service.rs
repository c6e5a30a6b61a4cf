use std::sync::Arc;

use voice_study_core::{
    NewSurveyResponse, SurveyFilter, SurveyResponse, TaskId, TaskNote, Validator,
};
use voice_study_storage::StorageBackend;
use voice_study_storage::traits::{SurveyStore, TaskNoteStore};

use crate::ServiceError;

/// Survey responses and per-task planning notes.
pub struct SurveyService {
    storage: Arc<StorageBackend>,
}

impl SurveyService {
    #[must_use]
    pub const fn new(storage: Arc<StorageBackend>) -> Self {
        Self { storage }
    }

    /// Answers are stored as an opaque document; only the envelope is checked.
    pub async fn submit(
        &self,
        response: &NewSurveyResponse,
    ) -> Result<SurveyResponse, ServiceError> {
        let mut v = Validator::new();
        if response.participant_id.trim().is_empty() {
            v.push("participantId", "must not be empty");
        }
        if response.stage.trim().is_empty() {
            v.push("stage", "must not be empty");
        }
        v.finish().map_err(ServiceError::Validation)?;

        let saved = self.storage.save_survey(response).await?;
        tracing::info!(
            participant_id = %saved.participant_id,
            session = %saved.session,
            stage = %saved.stage,
            task_id = saved.task_id.as_deref().unwrap_or("-"),
            "survey response saved"
        );
        Ok(saved)
    }

    /// Oldest first.
    pub async fn list(&self, filter: &SurveyFilter) -> Result<Vec<SurveyResponse>, ServiceError> {
        Ok(self.storage.list_surveys(filter).await?)
    }

    pub async fn save_note(
        &self,
        participant_id: &str,
        task_id: TaskId,
        note: &str,
    ) -> Result<TaskNote, ServiceError> {
        if participant_id.trim().is_empty() {
            return Err(ServiceError::invalid("participantId", "must not be empty"));
        }

        let saved = self.storage.upsert_task_note(participant_id, task_id, note).await?;
        tracing::info!(participant_id, task_id = %task_id, "task note saved");
        Ok(saved)
    }

    /// Ordered by task id.
    pub async fn list_notes(&self, participant_id: &str) -> Result<Vec<TaskNote>, ServiceError> {
        Ok(self.storage.list_task_notes(participant_id).await?)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "test code")]

    use serde_json::json;
    use voice_study_core::Session;

    use super::*;
    use crate::test_support::sqlite_backend;

    fn response(participant_id: &str, stage: &str) -> NewSurveyResponse {
        NewSurveyResponse {
            participant_id: participant_id.to_owned(),
            session: Session::S2,
            task_id: Some("WEEKEND_TRIP".to_owned()),
            stage: stage.to_owned(),
            condition: Some("NARRATIVE".to_owned()),
            answers: json!({ "satisfaction": 4, "comment": "nice" }),
        }
    }

    #[tokio::test]
    async fn submit_and_filter() {
        let (backend, _dir) = sqlite_backend();
        let service = SurveyService::new(backend);
        service.submit(&response("p", "pre")).await.unwrap();
        service.submit(&response("p", "post")).await.unwrap();
        service.submit(&response("q", "post")).await.unwrap();

        let filter = SurveyFilter { stage: Some("post".to_owned()), ..SurveyFilter::default() };
        let posts = service.list(&filter).await.unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].participant_id, "p");
        assert_eq!(posts[0].answers["satisfaction"], 4);
    }

    #[tokio::test]
    async fn blank_envelope_is_rejected() {
        let (backend, _dir) = sqlite_backend();
        let service = SurveyService::new(backend);
        let err = service.submit(&response("", " ")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref issues) if issues.len() == 2));
    }

    #[tokio::test]
    async fn notes_overwrite_per_task() {
        let (backend, _dir) = sqlite_backend();
        let service = SurveyService::new(backend);
        service.save_note("p", TaskId::WeekendTrip, "hike").await.unwrap();
        service.save_note("p", TaskId::BirthdayGift, "book").await.unwrap();
        service.save_note("p", TaskId::WeekendTrip, "onsen").await.unwrap();

        let notes = service.list_notes("p").await.unwrap();
        let pairs: Vec<(TaskId, &str)> =
            notes.iter().map(|n| (n.task_id, n.note.as_str())).collect();
        assert_eq!(pairs, vec![(TaskId::BirthdayGift, "book"), (TaskId::WeekendTrip, "onsen")]);

        assert!(service.save_note(" ", TaskId::WeekendTrip, "hike").await.is_err());
    }

    #[tokio::test]
    async fn empty_note_clears_saved_note() {
        let (backend, _dir) = sqlite_backend();
        let service = SurveyService::new(backend);
        service.save_note("p", TaskId::FarewellParty, "karaoke").await.unwrap();

        let cleared = service.save_note("p", TaskId::FarewellParty, "").await.unwrap();
        assert_eq!(cleared.note, "");
        let notes = service.list_notes("p").await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].note, "");
    }
}
