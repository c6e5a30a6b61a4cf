//! Integration tests for PgStorage.
//! Run with:
//! DATABASE_URL=... cargo test -p voice-study-storage --features postgres -- --ignored pg_

#![cfg(feature = "postgres")]
#![allow(clippy::unwrap_used, reason = "integration test code")]

use std::collections::HashSet;

use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;
use voice_study_core::{
    Group, GroupSource, NewSurveyResponse, NewTimingEvent, NewTurn, ProgressUpdate, Role, Session,
    Stage, SurveyFilter, TaskId, TurnScope,
};
use voice_study_storage::traits::{
    ConversationStore, ParticipantStore, PlaybackStore, ProgressStore, SurveyStore, TaskNoteStore,
};
use voice_study_storage::PgStorage;

async fn create_pg_storage() -> PgStorage {
    let url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for PgStorage integration tests");
    PgStorage::new(&url, 5).await.expect("Failed to connect to PostgreSQL")
}

fn unique_id() -> String {
    format!("test-{}", Uuid::new_v4())
}

fn turn(scope: &TurnScope, index: i64, role: Role) -> NewTurn {
    let started_at = Utc::now();
    NewTurn {
        scope: scope.clone(),
        turn_index: index,
        role,
        text: Some(format!("turn {index}")),
        audio_url: None,
        duration_ms: None,
        started_at,
        ended_at: started_at + Duration::seconds(2),
    }
}

// ── Registrar ────────────────────────────────────────────────────

#[tokio::test]
#[ignore]
async fn pg_registration_is_idempotent() {
    let storage = create_pg_storage().await;
    let id = unique_id();

    let first = storage.register_participant(&id, Some(Group::G6)).await.unwrap();
    assert!(first.created);
    assert_eq!(first.source, GroupSource::Explicit);

    let again = storage.register_participant(&id, Some(Group::G2)).await.unwrap();
    assert!(!again.created);
    assert_eq!(again.participant.group, Group::G6);
    assert_eq!(storage.list_assignments(&id).await.unwrap().len(), 3);
    assert_eq!(storage.list_playback_assets(&id).await.unwrap().len(), 3);
}

#[tokio::test]
#[ignore]
async fn pg_registration_preserves_curated_audio() {
    let storage = create_pg_storage().await;
    let id = unique_id();
    let reg = storage.register_participant(&id, Some(Group::G1)).await.unwrap();
    let entry = reg.assignments.first().unwrap();

    storage
        .set_playback_audio_url(&id, entry.task_id, entry.condition_id, "https://x/y.mp3")
        .await
        .unwrap();
    storage.register_participant(&id, None).await.unwrap();

    let asset = storage
        .get_playback_asset(&id, entry.task_id, entry.condition_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(asset.audio_url, "https://x/y.mp3");
}

#[tokio::test]
#[ignore]
async fn pg_concurrent_registrations_agree() {
    let storage = create_pg_storage().await;
    let id = unique_id();
    let mut handles = Vec::new();
    for _ in 0..6 {
        let storage = storage.clone();
        let id = id.clone();
        handles.push(tokio::spawn(async move {
            storage.register_participant(&id, None).await.unwrap().participant.group
        }));
    }
    let mut groups = HashSet::new();
    for handle in handles {
        groups.insert(handle.await.unwrap());
    }
    assert_eq!(groups.len(), 1);
}

#[tokio::test]
#[ignore]
async fn pg_concurrent_turn_retries_store_once() {
    let storage = create_pg_storage().await;
    let scope = TurnScope::new(unique_id(), Session::S1, "BIRTHDAY_GIFT");
    let roles = [Role::User, Role::Assistant, Role::Assistant, Role::User, Role::Assistant];
    let turns: Vec<NewTurn> =
        roles.iter().zip(0_i64..).map(|(role, i)| turn(&scope, i, *role)).collect();

    let mut handles = Vec::new();
    for _ in 0..6 {
        let storage = storage.clone();
        let turns = turns.clone();
        handles.push(tokio::spawn(async move { storage.append_turns(&turns).await.unwrap() }));
    }
    let (mut inserted, mut skipped, mut starts) = (0, 0, 0);
    for handle in handles {
        let outcome = handle.await.unwrap();
        inserted += outcome.inserted;
        skipped += outcome.skipped;
        starts += outcome.assistant_run_starts;
    }
    assert_eq!((inserted, skipped, starts), (5, 25, 2));

    let summary = storage.get_conversation_summary(&scope).await.unwrap();
    assert_eq!(summary.user_utterance_count, 2);
    assert_eq!(storage.list_turns(&scope).await.unwrap().len(), 5);
}

// ── Progress ─────────────────────────────────────────────────────

#[tokio::test]
#[ignore]
async fn pg_progress_upsert_and_list() {
    let storage = create_pg_storage().await;
    let id = unique_id();

    let voice = ProgressUpdate::new(&id, Session::S1, 1, Stage::Voice, false);
    storage.upsert_progress(&voice).await.unwrap();
    let practice = ProgressUpdate::new(&id, Session::Practice, 0, Stage::Complete, true);
    storage.upsert_progress(&practice).await.unwrap();

    let s1 = storage.get_progress(&id, Session::S1).await.unwrap().unwrap();
    assert_eq!((s1.task_index, s1.stage, s1.completed), (1, Stage::Voice, false));

    let sessions: Vec<Session> =
        storage.list_progress(&id).await.unwrap().into_iter().map(|p| p.session).collect();
    assert_eq!(sessions, vec![Session::Practice, Session::S1]);
}

// ── Conversation ─────────────────────────────────────────────────

#[tokio::test]
#[ignore]
async fn pg_turns_summary_and_replay() {
    let storage = create_pg_storage().await;
    let scope = TurnScope::new(unique_id(), Session::S2, "WEEKEND_TRIP");
    let roles = [Role::User, Role::Assistant, Role::Assistant, Role::User, Role::Assistant];
    let turns: Vec<NewTurn> =
        roles.iter().zip(0_i64..).map(|(role, i)| turn(&scope, i, *role)).collect();

    let outcome = storage.append_turns(&turns).await.unwrap();
    assert_eq!(outcome.assistant_run_starts, 2);

    let replay = storage.append_turns(&turns).await.unwrap();
    assert_eq!(replay.inserted, 0);
    assert_eq!(replay.skipped, 5);

    let summary = storage.get_conversation_summary(&scope).await.unwrap();
    assert_eq!(summary.user_utterance_count, 2);
    assert_eq!(summary.next_turn_index, 5);
    assert_eq!(storage.list_turns(&scope).await.unwrap().len(), 5);
}

#[tokio::test]
#[ignore]
async fn pg_timing_events_round_trip() {
    let storage = create_pg_storage().await;
    let scope = TurnScope::new(unique_id(), Session::S1, "BIRTHDAY_GIFT");
    let event = NewTimingEvent {
        scope: scope.clone(),
        event: "assistant_end_to_user_start".to_owned(),
        timestamp: Utc::now(),
        extra: Some(json!({ "delayMs": 420 })),
    };
    assert_eq!(storage.append_timing_events(&[event]).await.unwrap(), 1);
    let stored = storage.list_timing_events(&scope).await.unwrap();
    assert_eq!(stored[0].extra, Some(json!({ "delayMs": 420 })));
}

// ── Surveys and notes ────────────────────────────────────────────

#[tokio::test]
#[ignore]
async fn pg_surveys_and_notes() {
    let storage = create_pg_storage().await;
    let id = unique_id();
    for stage in ["pre", "post", "pre"] {
        storage
            .save_survey(&NewSurveyResponse {
                participant_id: id.clone(),
                session: Session::S1,
                task_id: Some("FAREWELL_PARTY".to_owned()),
                stage: stage.to_owned(),
                condition: None,
                answers: json!({ "q1": stage }),
            })
            .await
            .unwrap();
    }
    let filter = SurveyFilter {
        participant_id: Some(id.clone()),
        stage: Some("pre".to_owned()),
        ..SurveyFilter::default()
    };
    assert_eq!(storage.list_surveys(&filter).await.unwrap().len(), 2);

    storage.upsert_task_note(&id, TaskId::FarewellParty, "v1").await.unwrap();
    storage.upsert_task_note(&id, TaskId::FarewellParty, "v2").await.unwrap();
    let notes = storage.list_task_notes(&id).await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].note, "v2");
}
