use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use chrono::Utc;
use voice_study_core::{ConversationSummary, TimingEvent, TurnView};

use crate::AppState;
use crate::api_error::ApiError;
use crate::request_types::{ScopeQuery, TimingRequest, TurnRequest, check_timing, check_turns};
use crate::response_types::{OkResponse, TurnsAppendedResponse};

pub async fn append_turns(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Vec<TurnRequest>>, JsonRejection>,
) -> Result<Json<TurnsAppendedResponse>, ApiError> {
    let Json(batch) = payload?;
    let turns = check_turns(batch)?;
    let outcome = state.conversation_service.append_turns(&turns).await?;
    Ok(Json(TurnsAppendedResponse {
        ok: true,
        inserted: outcome.inserted,
        skipped: outcome.skipped,
    }))
}

pub async fn list_turns(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ScopeQuery>, QueryRejection>,
) -> Result<Json<Vec<TurnView>>, ApiError> {
    let Query(query) = query?;
    let scope = query.into_checked()?;
    Ok(Json(state.conversation_service.list_turns(&scope).await?))
}

pub async fn append_timing(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Vec<TimingRequest>>, JsonRejection>,
) -> Result<Json<OkResponse>, ApiError> {
    let Json(batch) = payload?;
    let events = check_timing(batch, Utc::now())?;
    state.conversation_service.append_timing(&events).await?;
    Ok(Json(OkResponse::ok()))
}

pub async fn list_timing(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ScopeQuery>, QueryRejection>,
) -> Result<Json<Vec<TimingEvent>>, ApiError> {
    let Query(query) = query?;
    let scope = query.into_checked()?;
    Ok(Json(state.conversation_service.list_timing(&scope).await?))
}

pub async fn summary(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ScopeQuery>, QueryRejection>,
) -> Result<Json<ConversationSummary>, ApiError> {
    let Query(query) = query?;
    let scope = query.into_checked()?;
    Ok(Json(state.conversation_service.summary(&scope).await?))
}
