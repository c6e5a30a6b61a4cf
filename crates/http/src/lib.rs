//! HTTP API server for voice-study.

#![allow(missing_docs, reason = "Internal crate with self-explanatory API")]
#![allow(unreachable_pub, reason = "pub items are re-exported")]
#![allow(clippy::absolute_paths, reason = "Explicit paths for clarity")]
#![allow(missing_debug_implementations, reason = "Internal types")]
#![allow(clippy::missing_docs_in_private_items, reason = "Internal crate")]
#![allow(clippy::implicit_return, reason = "Implicit return is idiomatic Rust")]
#![allow(clippy::question_mark_used, reason = "? operator is idiomatic Rust")]
#![allow(clippy::min_ident_chars, reason = "Short closure params are idiomatic")]
#![allow(clippy::shadow_reuse, reason = "Shadowing for Arc clones is idiomatic")]
#![allow(clippy::exhaustive_structs, reason = "HTTP types are stable")]

pub mod api_error;
mod handlers;
mod request_types;
mod response_types;

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use voice_study_core::MAX_AUDIO_UPLOAD_BYTES;
use voice_study_service::{
    AudioService, ConversationService, ParticipantService, PlaybackService, ProgressService,
    SurveyService,
};
use voice_study_storage::StorageBackend;

pub use response_types::{ReadinessResponse, VersionResponse};

/// Multipart framing overhead allowed on top of the audio payload.
const UPLOAD_FORM_OVERHEAD: usize = 64 * 1024;

/// Shared application state for all HTTP handlers.
pub struct AppState {
    pub storage: Arc<StorageBackend>,
    pub participant_service: Arc<ParticipantService>,
    pub progress_service: Arc<ProgressService>,
    pub conversation_service: Arc<ConversationService>,
    pub survey_service: Arc<SurveyService>,
    pub playback_service: Arc<PlaybackService>,
    pub audio_service: Arc<AudioService>,
}

impl AppState {
    /// Wire every service to one storage backend.
    #[must_use]
    pub fn new(storage: Arc<StorageBackend>, audio_service: AudioService) -> Self {
        Self {
            participant_service: Arc::new(ParticipantService::new(Arc::clone(&storage))),
            progress_service: Arc::new(ProgressService::new(Arc::clone(&storage))),
            conversation_service: Arc::new(ConversationService::new(Arc::clone(&storage))),
            survey_service: Arc::new(SurveyService::new(Arc::clone(&storage))),
            playback_service: Arc::new(PlaybackService::new(Arc::clone(&storage))),
            audio_service: Arc::new(audio_service),
            storage,
        }
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/readiness", get(readiness))
        .route("/api/version", get(version))
        .route(
            "/participants",
            post(handlers::participants::register).get(handlers::participants::list),
        )
        .route("/progress", post(handlers::progress::upsert).get(handlers::progress::get))
        .route(
            "/conversation/turns",
            post(handlers::conversation::append_turns).get(handlers::conversation::list_turns),
        )
        .route(
            "/conversation/timing",
            post(handlers::conversation::append_timing).get(handlers::conversation::list_timing),
        )
        .route("/conversation/summary", get(handlers::conversation::summary))
        .route("/surveys", post(handlers::surveys::submit).get(handlers::surveys::list))
        .route(
            "/task-notes",
            post(handlers::surveys::save_note).get(handlers::surveys::list_notes),
        )
        .route("/playback-assets", get(handlers::playback::get))
        .route(
            "/upload-audio",
            post(handlers::audio::upload)
                .layer(DefaultBodyLimit::max(MAX_AUDIO_UPLOAD_BYTES + UPLOAD_FORM_OVERHEAD)),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn readiness(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ReadinessResponse>) {
    let backend = state.storage.kind();
    let audio_upload = state.audio_service.is_configured();
    match state.storage.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadinessResponse { status: "ready", backend, audio_upload, message: None }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, backend, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "unavailable",
                    backend,
                    audio_upload,
                    message: Some("database unreachable".to_owned()),
                }),
            )
        },
    }
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse { version: env!("CARGO_PKG_VERSION") })
}
