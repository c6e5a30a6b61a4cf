#![allow(clippy::unwrap_used, reason = "test code")]

use chrono::{Duration, Utc};
use serde_json::json;
use voice_study_core::{NewTimingEvent, Role, EVENT_ASSISTANT_END_TO_USER_START};

use super::{create_test_storage, make_turn, scope};
use crate::storage::get_conn;

#[test]
fn run_starts_are_added_to_summary() {
    let (storage, _temp_dir) = create_test_storage();
    let s = scope("BIRTHDAY_GIFT");
    let base = Utc::now();
    let roles = [Role::User, Role::Assistant, Role::Assistant, Role::User, Role::Assistant];
    let turns: Vec<_> =
        roles.iter().enumerate().map(|(i, r)| make_turn(&s, i as i64, *r, base)).collect();

    let outcome = storage.append_turns(&turns).unwrap();
    assert_eq!(outcome.inserted, 5);
    assert_eq!(outcome.assistant_run_starts, 2);

    let summary = storage.get_conversation_summary(&s).unwrap();
    assert_eq!(summary.user_utterance_count, 2);
    assert_eq!(summary.next_turn_index, 5);
}

#[test]
fn counter_accumulates_and_is_seeded_by_last_stored_role() {
    let (storage, _temp_dir) = create_test_storage();
    let s = scope("FAREWELL_PARTY");
    let base = Utc::now();

    storage.append_turns(&[make_turn(&s, 0, Role::Assistant, base)]).unwrap();
    // given: last stored role is assistant, so a leading assistant continues that run
    let outcome = storage
        .append_turns(&[
            make_turn(&s, 1, Role::Assistant, base),
            make_turn(&s, 2, Role::User, base),
        ])
        .unwrap();
    assert_eq!(outcome.assistant_run_starts, 0);

    // when: the next batch opens with an assistant turn after a stored user turn
    let outcome = storage.append_turns(&[make_turn(&s, 3, Role::Assistant, base)]).unwrap();

    // then: one new run start, added on top of the first
    assert_eq!(outcome.assistant_run_starts, 1);
    assert_eq!(storage.get_conversation_summary(&s).unwrap().user_utterance_count, 2);
}

#[test]
fn replayed_turns_are_skipped() {
    let (storage, _temp_dir) = create_test_storage();
    let s = scope("WEEKEND_TRIP");
    let base = Utc::now();
    let batch: Vec<_> = [Role::User, Role::Assistant]
        .iter()
        .enumerate()
        .map(|(i, r)| make_turn(&s, i as i64, *r, base))
        .collect();
    storage.append_turns(&batch).unwrap();

    let mut retry = batch.clone();
    retry.push(make_turn(&s, 2, Role::User, base));
    let outcome = storage.append_turns(&retry).unwrap();

    assert_eq!(outcome.inserted, 1);
    assert_eq!(outcome.skipped, 2);
    assert_eq!(outcome.assistant_run_starts, 0);
    assert_eq!(storage.list_turns(&s).unwrap().len(), 3);
    assert_eq!(storage.get_conversation_summary(&s).unwrap().user_utterance_count, 1);
}

#[test]
fn turns_are_listed_in_index_order_without_empty_text() {
    let (storage, _temp_dir) = create_test_storage();
    let s = scope("BIRTHDAY_GIFT");
    let base = Utc::now();
    let mut silent = make_turn(&s, 1, Role::Assistant, base);
    silent.text = None;
    let turns =
        vec![make_turn(&s, 0, Role::User, base), silent, make_turn(&s, 2, Role::User, base)];
    storage.append_turns(&turns).unwrap();

    let listed = storage.list_turns(&s).unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].text, "user says 0");
    assert_eq!(listed[1].text, "user says 2");
    assert_eq!(listed[0].role, Role::User);
    assert_eq!(listed[0].started_at, turns[0].started_at);
    assert_eq!(listed[1].ended_at, turns[2].ended_at);
}

#[test]
fn durations_default_to_elapsed_and_clamp() {
    let (storage, _temp_dir) = create_test_storage();
    let s = scope("BIRTHDAY_GIFT");
    let base = Utc::now();
    let mut elapsed = make_turn(&s, 0, Role::User, base);
    elapsed.ended_at = elapsed.started_at + Duration::milliseconds(5000);
    let mut backwards = make_turn(&s, 1, Role::Assistant, base);
    backwards.ended_at = backwards.started_at - Duration::milliseconds(300);
    storage.append_turns(&[elapsed, backwards]).unwrap();

    let conn = get_conn(&storage.pool).unwrap();
    let mut stmt = conn
        .prepare("SELECT duration_ms FROM conversation_turns ORDER BY turn_index")
        .unwrap();
    let durations: Vec<i64> =
        stmt.query_map([], |row| row.get(0)).unwrap().map(Result::unwrap).collect();
    assert_eq!(durations, vec![5000, 0]);
}

#[test]
fn batches_spanning_scopes_are_counted_per_scope() {
    let (storage, _temp_dir) = create_test_storage();
    let a = scope("BIRTHDAY_GIFT");
    let b = scope("FAREWELL_PARTY");
    let base = Utc::now();
    let turns = vec![
        make_turn(&a, 0, Role::User, base),
        make_turn(&b, 0, Role::Assistant, base),
        make_turn(&a, 1, Role::Assistant, base),
    ];

    let outcome = storage.append_turns(&turns).unwrap();
    assert_eq!(outcome.inserted, 3);
    assert_eq!(outcome.assistant_run_starts, 2);
    assert_eq!(storage.get_conversation_summary(&a).unwrap().user_utterance_count, 1);
    assert_eq!(storage.get_conversation_summary(&b).unwrap().user_utterance_count, 1);
}

#[test]
fn empty_scope_summary_is_zero() {
    let (storage, _temp_dir) = create_test_storage();
    let summary = storage.get_conversation_summary(&scope("WEEKEND_TRIP")).unwrap();
    assert_eq!(summary.user_utterance_count, 0);
    assert_eq!(summary.next_turn_index, 0);
    assert_eq!(storage.append_turns(&[]).unwrap(), crate::AppendOutcome::default());
}

#[test]
fn timing_events_round_trip_in_order() {
    let (storage, _temp_dir) = create_test_storage();
    let s = scope("BIRTHDAY_GIFT");
    let now = Utc::now();
    let events = vec![
        NewTimingEvent {
            scope: s.clone(),
            event: "session_start".to_owned(),
            timestamp: now,
            extra: None,
        },
        NewTimingEvent {
            scope: s.clone(),
            event: EVENT_ASSISTANT_END_TO_USER_START.to_owned(),
            timestamp: now + Duration::seconds(3),
            extra: Some(json!({ "delayMs": 812 })),
        },
    ];

    assert_eq!(storage.append_timing_events(&events).unwrap(), 2);
    let stored = storage.list_timing_events(&s).unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].event, "session_start");
    assert_eq!(stored[1].extra, Some(json!({ "delayMs": 812 })));
    assert!(storage.list_timing_events(&scope("WEEKEND_TRIP")).unwrap().is_empty());
}
