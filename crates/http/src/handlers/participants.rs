use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use voice_study_core::Participant;

use crate::AppState;
use crate::api_error::ApiError;
use crate::request_types::RegisterRequest;

/// Register a participant, or return the existing record for a known id.
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<Participant>, ApiError> {
    let Json(req) = payload?;
    let (id, group) = req.into_checked()?;
    let registration = state.participant_service.register(&id, group).await?;
    Ok(Json(registration.participant))
}

pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Participant>>, ApiError> {
    Ok(Json(state.participant_service.list().await?))
}
