use anyhow::Result;
use std::sync::Arc;
use voice_study_http::{AppState, create_router};
use voice_study_service::AudioService;

use crate::open_storage;

pub(crate) async fn run(port: u16, host: String) -> Result<()> {
    let storage = open_storage().await?;
    let audio_service = AudioService::from_env();
    if !audio_service.is_configured() {
        tracing::warn!("audio upload disabled until object storage credentials are set");
    }

    let state = Arc::new(AppState::new(storage, audio_service));
    let router = create_router(state);
    let addr = format!("{host}:{port}");
    tracing::info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
