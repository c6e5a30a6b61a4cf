//! Migration v1: initial schema

pub(super) const SQL: &str = "
CREATE TABLE IF NOT EXISTS participants (
    id TEXT PRIMARY KEY,
    participant_group TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_participants_group ON participants(participant_group);
CREATE INDEX IF NOT EXISTS idx_participants_created ON participants(created_at DESC);

CREATE TABLE IF NOT EXISTS assignments (
    id TEXT PRIMARY KEY,
    participant_id TEXT NOT NULL REFERENCES participants(id) ON DELETE CASCADE,
    task_id TEXT NOT NULL,
    order_index INTEGER NOT NULL,
    condition_id TEXT NOT NULL,
    UNIQUE (participant_id, task_id)
);

CREATE TABLE IF NOT EXISTS playback_assets (
    id TEXT PRIMARY KEY,
    participant_id TEXT NOT NULL REFERENCES participants(id) ON DELETE CASCADE,
    task_id TEXT NOT NULL,
    condition_id TEXT NOT NULL,
    audio_url TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (participant_id, task_id, condition_id)
);

CREATE TABLE IF NOT EXISTS participant_progress (
    id TEXT PRIMARY KEY,
    participant_id TEXT NOT NULL,
    session TEXT NOT NULL,
    task_index INTEGER NOT NULL,
    stage TEXT NOT NULL,
    completed INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL,
    UNIQUE (participant_id, session)
);
";
