//! PostgreSQL schema migrations for voice-study storage.

use sqlx::PgPool;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS participants (
        id TEXT PRIMARY KEY,
        participant_group TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_participants_group ON participants (participant_group)",
    "CREATE INDEX IF NOT EXISTS idx_participants_created ON participants (created_at DESC)",
    r#"
    CREATE TABLE IF NOT EXISTS assignments (
        id TEXT PRIMARY KEY,
        participant_id TEXT NOT NULL REFERENCES participants (id) ON DELETE CASCADE,
        task_id TEXT NOT NULL,
        order_index INTEGER NOT NULL,
        condition_id TEXT NOT NULL,
        UNIQUE (participant_id, task_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS playback_assets (
        id TEXT PRIMARY KEY,
        participant_id TEXT NOT NULL REFERENCES participants (id) ON DELETE CASCADE,
        task_id TEXT NOT NULL,
        condition_id TEXT NOT NULL,
        audio_url TEXT NOT NULL DEFAULT '',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE (participant_id, task_id, condition_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS participant_progress (
        id TEXT PRIMARY KEY,
        participant_id TEXT NOT NULL,
        session TEXT NOT NULL,
        task_index INTEGER NOT NULL,
        stage TEXT NOT NULL,
        completed BOOLEAN NOT NULL DEFAULT FALSE,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE (participant_id, session)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS conversation_turns (
        id BIGSERIAL PRIMARY KEY,
        participant_id TEXT NOT NULL,
        session TEXT NOT NULL,
        task_id TEXT NOT NULL,
        turn_index BIGINT NOT NULL,
        role TEXT NOT NULL,
        text TEXT,
        audio_url TEXT,
        duration_ms BIGINT NOT NULL DEFAULT 0,
        started_at TIMESTAMPTZ NOT NULL,
        ended_at TIMESTAMPTZ NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE (participant_id, session, task_id, turn_index)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS conversation_timings (
        id BIGSERIAL PRIMARY KEY,
        participant_id TEXT NOT NULL,
        session TEXT NOT NULL,
        task_id TEXT NOT NULL,
        event TEXT NOT NULL,
        occurred_at TIMESTAMPTZ NOT NULL,
        extra JSONB,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_timings_scope
        ON conversation_timings (participant_id, session, task_id)",
    r#"
    CREATE TABLE IF NOT EXISTS conversation_summaries (
        participant_id TEXT NOT NULL,
        session TEXT NOT NULL,
        task_id TEXT NOT NULL,
        user_utterance_count BIGINT NOT NULL DEFAULT 0,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        PRIMARY KEY (participant_id, session, task_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS survey_responses (
        id BIGSERIAL PRIMARY KEY,
        participant_id TEXT NOT NULL,
        session TEXT NOT NULL,
        task_id TEXT,
        stage TEXT NOT NULL,
        condition_id TEXT,
        answers JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_surveys_lookup
        ON survey_responses (participant_id, session, stage)",
    r#"
    CREATE TABLE IF NOT EXISTS task_notes (
        id TEXT PRIMARY KEY,
        participant_id TEXT NOT NULL,
        task_id TEXT NOT NULL,
        note TEXT NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE (participant_id, task_id)
    )
    "#,
];

/// Run all PostgreSQL migrations. Every statement is idempotent.
pub async fn run_pg_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::info!(statements = STATEMENTS.len(), "PostgreSQL schema up to date");
    Ok(())
}
