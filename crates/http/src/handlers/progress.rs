use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use voice_study_core::ParticipantProgress;

use crate::AppState;
use crate::api_error::ApiError;
use crate::request_types::{ProgressQuery, ProgressRequest};

pub async fn upsert(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ProgressRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ParticipantProgress>), ApiError> {
    let Json(req) = payload?;
    let update = req.into_checked()?;
    let saved = state.progress_service.upsert(&update).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// One record (or `null`) when `session` is given, otherwise every record for the participant.
pub async fn get(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ProgressQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let (participant_id, session) = query.into_checked()?;
    let response = match session {
        Some(session) => {
            Json(state.progress_service.get(&participant_id, session).await?).into_response()
        },
        None => Json(state.progress_service.list(&participant_id).await?).into_response(),
    };
    Ok(response)
}
