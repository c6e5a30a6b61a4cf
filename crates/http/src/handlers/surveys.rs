use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use voice_study_core::{SurveyResponse, TaskNote};

use crate::AppState;
use crate::api_error::ApiError;
use crate::request_types::{ParticipantQuery, SurveyQuery, SurveyRequest, TaskNoteRequest};

pub async fn submit(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SurveyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SurveyResponse>), ApiError> {
    let Json(req) = payload?;
    let response = req.into_checked()?;
    let saved = state.survey_service.submit(&response).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    query: Result<Query<SurveyQuery>, QueryRejection>,
) -> Result<Json<Vec<SurveyResponse>>, ApiError> {
    let Query(query) = query?;
    let filter = query.into_checked()?;
    Ok(Json(state.survey_service.list(&filter).await?))
}

pub async fn save_note(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TaskNoteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskNote>), ApiError> {
    let Json(req) = payload?;
    let (participant_id, task_id, note) = req.into_checked()?;
    let saved = state.survey_service.save_note(&participant_id, task_id, &note).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn list_notes(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ParticipantQuery>, QueryRejection>,
) -> Result<Json<Vec<TaskNote>>, ApiError> {
    let Query(query) = query?;
    let participant_id = query.into_checked()?;
    Ok(Json(state.survey_service.list_notes(&participant_id).await?))
}
