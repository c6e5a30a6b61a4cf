use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use voice_study_core::PlaybackAsset;

use crate::AppState;
use crate::api_error::ApiError;
use crate::request_types::PlaybackQuery;

pub async fn get(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PlaybackQuery>, QueryRejection>,
) -> Result<Json<PlaybackAsset>, ApiError> {
    let Query(query) = query?;
    let (participant_id, task_id, condition_id) = query.into_checked()?;
    Ok(Json(state.playback_service.get(&participant_id, task_id, condition_id).await?))
}
