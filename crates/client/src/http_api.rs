use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use voice_study_core::{
    Condition, ConversationSummary, Group, NewSurveyResponse, NewTimingEvent, NewTurn,
    Participant, ParticipantProgress, PlaybackAsset, ProgressUpdate, Role, Session,
    SurveyResponse, TaskId, TaskNote, TurnScope,
};

use crate::{ClientError, ExperimentApi};

/// reqwest-backed `ExperimentApi` talking to the voice-study HTTP server.
#[derive(Debug, Clone)]
pub struct HttpExperimentApi {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterBody<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    group: Option<Group>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TurnBody<'a> {
    participant_id: &'a str,
    session: Session,
    task_id: &'a str,
    turn_index: i64,
    role: Role,
    text: Option<&'a str>,
    audio_url: Option<&'a str>,
    duration_ms: Option<i64>,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
}

impl<'a> From<&'a NewTurn> for TurnBody<'a> {
    fn from(t: &'a NewTurn) -> Self {
        Self {
            participant_id: &t.scope.participant_id,
            session: t.scope.session,
            task_id: &t.scope.task_id,
            turn_index: t.turn_index,
            role: t.role,
            text: t.text.as_deref(),
            audio_url: t.audio_url.as_deref(),
            duration_ms: t.duration_ms,
            started_at: t.started_at,
            ended_at: t.ended_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TimingBody<'a> {
    participant_id: &'a str,
    session: Session,
    task_id: &'a str,
    event: &'a str,
    timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    extra: Option<&'a serde_json::Value>,
}

impl<'a> From<&'a NewTimingEvent> for TimingBody<'a> {
    fn from(e: &'a NewTimingEvent) -> Self {
        Self {
            participant_id: &e.scope.participant_id,
            session: e.scope.session,
            task_id: &e.scope.task_id,
            event: &e.event,
            timestamp: e.timestamp,
            extra: e.extra.as_ref(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NoteBody<'a> {
    participant_id: &'a str,
    task_id: TaskId,
    note: &'a str,
}

impl HttpExperimentApi {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built (TLS backend failure).
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
        context: &str,
    ) -> Result<T, ClientError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status { code: status.as_u16(), body });
        }
        serde_json::from_str(&body)
            .map_err(|source| ClientError::Decode { context: context.to_owned(), source })
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::decode(response, path).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ClientError> {
        let response = self.client.get(self.url(path)).query(query).send().await?;
        Self::decode(response, path).await
    }
}

#[async_trait]
impl ExperimentApi for HttpExperimentApi {
    async fn register(&self, id: &str, group: Option<Group>) -> Result<Participant, ClientError> {
        self.post_json("/participants", &RegisterBody { id, group }).await
    }

    async fn get_progress(
        &self,
        participant_id: &str,
        session: Session,
    ) -> Result<Option<ParticipantProgress>, ClientError> {
        self.get_json(
            "/progress",
            &[("participantId", participant_id), ("session", session.as_str())],
        )
        .await
    }

    async fn upsert_progress(
        &self,
        update: &ProgressUpdate,
    ) -> Result<ParticipantProgress, ClientError> {
        self.post_json("/progress", update).await
    }

    async fn append_turns(&self, turns: &[NewTurn]) -> Result<(), ClientError> {
        let body: Vec<TurnBody<'_>> = turns.iter().map(TurnBody::from).collect();
        let _: serde_json::Value = self.post_json("/conversation/turns", &body).await?;
        Ok(())
    }

    async fn append_timing(&self, events: &[NewTimingEvent]) -> Result<(), ClientError> {
        let body: Vec<TimingBody<'_>> = events.iter().map(TimingBody::from).collect();
        let _: serde_json::Value = self.post_json("/conversation/timing", &body).await?;
        Ok(())
    }

    async fn conversation_summary(
        &self,
        scope: &TurnScope,
    ) -> Result<ConversationSummary, ClientError> {
        self.get_json(
            "/conversation/summary",
            &[
                ("participantId", scope.participant_id.as_str()),
                ("session", scope.session.as_str()),
                ("taskId", scope.task_id.as_str()),
            ],
        )
        .await
    }

    async fn submit_survey(
        &self,
        response: &NewSurveyResponse,
    ) -> Result<SurveyResponse, ClientError> {
        self.post_json("/surveys", response).await
    }

    async fn save_task_note(
        &self,
        participant_id: &str,
        task_id: TaskId,
        note: &str,
    ) -> Result<TaskNote, ClientError> {
        self.post_json("/task-notes", &NoteBody { participant_id, task_id, note }).await
    }

    async fn list_task_notes(&self, participant_id: &str) -> Result<Vec<TaskNote>, ClientError> {
        self.get_json("/task-notes", &[("participantId", participant_id)]).await
    }

    async fn get_playback_asset(
        &self,
        participant_id: &str,
        task_id: TaskId,
        condition_id: Condition,
    ) -> Result<Option<PlaybackAsset>, ClientError> {
        let result = self
            .get_json(
                "/playback-assets",
                &[
                    ("participantId", participant_id),
                    ("taskId", task_id.as_str()),
                    ("conditionId", condition_id.as_str()),
                ],
            )
            .await;
        match result {
            Ok(asset) => Ok(Some(asset)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
