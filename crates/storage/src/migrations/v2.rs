//! Migration v2: conversation logs, surveys and task notes

pub(super) const SQL: &str = "
CREATE TABLE IF NOT EXISTS conversation_turns (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    participant_id TEXT NOT NULL,
    session TEXT NOT NULL,
    task_id TEXT NOT NULL,
    turn_index INTEGER NOT NULL,
    role TEXT NOT NULL,
    text TEXT,
    audio_url TEXT,
    duration_ms INTEGER NOT NULL DEFAULT 0,
    started_at TEXT NOT NULL,
    ended_at TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (participant_id, session, task_id, turn_index)
);

CREATE TABLE IF NOT EXISTS conversation_timings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    participant_id TEXT NOT NULL,
    session TEXT NOT NULL,
    task_id TEXT NOT NULL,
    event TEXT NOT NULL,
    occurred_at TEXT NOT NULL,
    extra TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_timings_scope
    ON conversation_timings(participant_id, session, task_id);

CREATE TABLE IF NOT EXISTS conversation_summaries (
    participant_id TEXT NOT NULL,
    session TEXT NOT NULL,
    task_id TEXT NOT NULL,
    user_utterance_count INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (participant_id, session, task_id)
);

CREATE TABLE IF NOT EXISTS survey_responses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    participant_id TEXT NOT NULL,
    session TEXT NOT NULL,
    task_id TEXT,
    stage TEXT NOT NULL,
    condition_id TEXT,
    answers TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_surveys_lookup ON survey_responses(participant_id, session, stage);

CREATE TABLE IF NOT EXISTS task_notes (
    id TEXT PRIMARY KEY,
    participant_id TEXT NOT NULL,
    task_id TEXT NOT NULL,
    note TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (participant_id, task_id)
);
";
