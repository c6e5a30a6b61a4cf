//! Object storage for recorded conversation audio.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use voice_study_core::DEFAULT_AUDIO_BUCKET;
use voice_study_core::env_config::env_first;

/// Errors from object storage uploads.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),
    #[error("HTTP status {code}: {body}")]
    HttpStatus { code: u16, body: String },
    #[error("client initialization failed: {0}")]
    ClientInit(String),
}

impl UploadError {
    /// Whether this error is transient and should be retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::HttpRequest(e) => e.is_timeout() || e.is_connect(),
            Self::HttpStatus { code, .. } => matches!(code, 429 | 500 | 502 | 503),
            Self::ClientInit(_) => false,
        }
    }
}

/// Destination for uploaded audio blobs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` at `path`, overwriting any existing object.
    async fn put(&self, path: &str, content_type: &str, bytes: Vec<u8>) -> Result<(), UploadError>;

    /// Publicly readable URL for `path`.
    fn public_url(&self, path: &str) -> String;
}

/// Connection settings for the Supabase storage API.
#[derive(Clone)]
pub struct ObjectStoreConfig {
    pub base_url: String,
    pub service_key: String,
    pub bucket: String,
}

impl std::fmt::Debug for ObjectStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreConfig")
            .field("base_url", &self.base_url)
            .field("service_key", &"***")
            .field("bucket", &self.bucket)
            .finish()
    }
}

impl ObjectStoreConfig {
    /// Read settings from the environment; `None` when the URL or key is missing.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env_first(&["SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"])?;
        let service_key = env_first(&[
            "SUPABASE_SERVICE_ROLE_KEY",
            "SUPABASE_SERVICE_KEY",
            "SUPABASE_SECRET_KEY",
        ])?;
        let bucket = env_first(&["CONVERSATION_AUDIO_BUCKET"])
            .unwrap_or_else(|| DEFAULT_AUDIO_BUCKET.to_owned());
        Some(Self { base_url: base_url.trim_end_matches('/').to_owned(), service_key, bucket })
    }
}

/// Supabase storage REST client.
pub struct SupabaseAudioStore {
    client: reqwest::Client,
    config: ObjectStoreConfig,
}

impl std::fmt::Debug for SupabaseAudioStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseAudioStore").field("config", &self.config).finish_non_exhaustive()
    }
}

impl SupabaseAudioStore {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built (TLS backend failure).
    pub fn new(config: ObjectStoreConfig) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| UploadError::ClientInit(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{path}", self.config.base_url, self.config.bucket)
    }
}

#[async_trait]
impl ObjectStore for SupabaseAudioStore {
    async fn put(&self, path: &str, content_type: &str, bytes: Vec<u8>) -> Result<(), UploadError> {
        const MAX_RETRIES: usize = 2;
        const RETRY_DELAYS: [u64; 3] = [0, 1, 2];
        let mut last_error: Option<UploadError> = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = Duration::from_secs(RETRY_DELAYS.get(attempt).copied().unwrap_or(2));
                tokio::time::sleep(delay).await;
                tracing::warn!(path, "audio upload retry {attempt}/{MAX_RETRIES} after {delay:?}");
            }

            let result = self
                .client
                .post(self.object_url(path))
                .header("Authorization", format!("Bearer {}", self.config.service_key))
                .header("apikey", &self.config.service_key)
                .header("Content-Type", content_type)
                .header("x-upsert", "true")
                .body(bytes.clone())
                .send()
                .await;

            let response = match result {
                Ok(r) => r,
                Err(e) => {
                    let err = UploadError::HttpRequest(e);
                    if !err.is_transient() {
                        return Err(err);
                    }
                    last_error = Some(err);
                    continue;
                },
            };

            let status = response.status();
            if status.is_success() {
                return Ok(());
            }
            let body =
                response.text().await.unwrap_or_else(|_| "Could not read error body".to_owned());
            let err = UploadError::HttpStatus { code: status.as_u16(), body };
            if !err.is_transient() {
                return Err(err);
            }
            last_error = Some(err);
        }

        Err(last_error.unwrap_or_else(|| UploadError::HttpStatus {
            code: 0,
            body: "upload retries exhausted".to_owned(),
        }))
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{path}", self.config.base_url, self.config.bucket)
    }
}
