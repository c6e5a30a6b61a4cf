use std::sync::Arc;

use voice_study_core::{Assignment, Group, GroupCounts, Participant};
use voice_study_storage::traits::ParticipantStore;
use voice_study_storage::{Registration, StorageBackend};

use crate::ServiceError;

/// Registrar entry point and participant lookups.
pub struct ParticipantService {
    storage: Arc<StorageBackend>,
}

impl ParticipantService {
    #[must_use]
    pub const fn new(storage: Arc<StorageBackend>) -> Self {
        Self { storage }
    }

    /// Register `id` or return its existing record; see the registrar transaction in storage.
    pub async fn register(
        &self,
        id: &str,
        explicit_group: Option<Group>,
    ) -> Result<Registration, ServiceError> {
        if id.trim().is_empty() {
            return Err(ServiceError::invalid("id", "must not be empty"));
        }
        let registration = self.storage.register_participant(id, explicit_group).await?;
        if registration.created {
            tracing::info!(
                participant_id = %id,
                group = %registration.participant.group,
                source = registration.source.as_str(),
                "participant registered"
            );
        } else {
            tracing::debug!(participant_id = %id, "participant already registered");
        }
        Ok(registration)
    }

    /// Newest first.
    pub async fn list(&self) -> Result<Vec<Participant>, ServiceError> {
        Ok(self.storage.list_participants().await?)
    }

    pub async fn get(&self, id: &str) -> Result<Participant, ServiceError> {
        self.storage
            .get_participant(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound { entity: "participant", id: id.to_owned() })
    }

    pub async fn assignments(&self, id: &str) -> Result<Vec<Assignment>, ServiceError> {
        Ok(self.storage.list_assignments(id).await?)
    }

    pub async fn group_counts(&self) -> Result<GroupCounts, ServiceError> {
        Ok(self.storage.group_counts().await?)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "test code")]

    use voice_study_core::GroupSource;

    use super::*;
    use crate::test_support::{sqlite_backend, LogCapture};

    #[tokio::test]
    async fn blank_id_is_rejected_before_storage() {
        let (backend, _dir) = sqlite_backend();
        let service = ParticipantService::new(backend);
        let err = service.register("   ", None).await.unwrap_err();
        match err {
            ServiceError::Validation(issues) => assert_eq!(issues[0].path, "id"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn register_then_get() {
        let (backend, _dir) = sqlite_backend();
        let service = ParticipantService::new(backend);
        let reg = service.register("p-01", Some(Group::G4)).await.unwrap();
        assert_eq!(reg.source, GroupSource::Explicit);
        assert_eq!(service.get("p-01").await.unwrap().group, Group::G4);
        assert_eq!(service.assignments("p-01").await.unwrap().len(), 3);
        assert_eq!(service.group_counts().await.unwrap().get(Group::G4), 1);
    }

    #[tokio::test]
    async fn unknown_participant_is_not_found() {
        let (backend, _dir) = sqlite_backend();
        let service = ParticipantService::new(backend);
        assert!(service.get("nobody").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn registration_is_logged_once() {
        let (backend, _dir) = sqlite_backend();
        let service = ParticipantService::new(backend);
        let logs = LogCapture::default();
        let _guard = tracing::subscriber::set_default(logs.subscriber());

        service.register("p-02", Some(Group::G1)).await.unwrap();
        service.register("p-02", None).await.unwrap();

        assert_eq!(logs.text().matches("participant registered").count(), 1);
    }
}
