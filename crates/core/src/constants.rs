//! Shared constants for voice-study.

use std::time::Duration;

/// Number of canonical tasks in each main session.
pub const TASKS_PER_SESSION: usize = 3;

/// Task identifier used by the single-task practice session.
pub const PRACTICE_TASK_ID: &str = "PRACTICE";

/// Maximum number of rows in a turn or timing batch request (DoS protection).
pub const MAX_BATCH_LEN: usize = 500;

/// Hard cap on a single voice interaction.
pub const VOICE_TIME_LIMIT: Duration = Duration::from_secs(8 * 60);

/// PostgreSQL connection pool: default maximum connections.
pub const PG_POOL_MAX_CONNECTIONS: u32 = 20;

/// PostgreSQL connection pool: acquire timeout in seconds.
pub const PG_POOL_ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// PostgreSQL connection pool: idle timeout in seconds.
pub const PG_POOL_IDLE_TIMEOUT_SECS: u64 = 300;

/// Advisory lock key serializing participant registration in PostgreSQL.
pub const REGISTRATION_LOCK_KEY: i64 = 0x766f_6963_655f_7331;

/// Default object-storage bucket for conversation audio.
pub const DEFAULT_AUDIO_BUCKET: &str = "conversation-audio";

/// Content type assumed when an upload does not declare one.
pub const DEFAULT_AUDIO_CONTENT_TYPE: &str = "audio/webm";

/// Maximum accepted audio upload size in bytes.
pub const MAX_AUDIO_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Timing event emitted when the voice interaction starts.
pub const EVENT_SESSION_START: &str = "session_start";

/// Timing event emitted when the voice interaction stops.
pub const EVENT_SESSION_STOP: &str = "session_stop";

/// Timing event measuring the gap between assistant end and user speech start.
pub const EVENT_ASSISTANT_END_TO_USER_START: &str = "assistant_end_to_user_start";
