#![allow(clippy::unwrap_used, reason = "test code")]

use voice_study_core::{ProgressUpdate, Session, Stage};

use super::create_test_storage;

#[test]
fn absent_progress_is_none() {
    let (storage, _temp_dir) = create_test_storage();
    assert!(storage.get_progress("p1", Session::S1).unwrap().is_none());
    assert!(storage.list_progress("p1").unwrap().is_empty());
}

#[test]
fn upsert_overwrites_checkpoint() {
    let (storage, _temp_dir) = create_test_storage();

    let voice = ProgressUpdate::new("p1", Session::S1, 1, Stage::Voice, false);
    storage.upsert_progress(&voice).unwrap();
    let stored = storage.get_progress("p1", Session::S1).unwrap().unwrap();
    assert_eq!(stored.task_index, 1);
    assert_eq!(stored.stage, Stage::Voice);
    assert!(!stored.completed);

    let done = storage
        .upsert_progress(&ProgressUpdate::new("p1", Session::S1, 2, Stage::Complete, true))
        .unwrap();
    assert!(done.completed);
    let stored = storage.get_progress("p1", Session::S1).unwrap().unwrap();
    assert_eq!(stored, done);
    assert_eq!(storage.list_progress("p1").unwrap().len(), 1);
}

#[test]
fn list_is_ordered_by_session() {
    let (storage, _temp_dir) = create_test_storage();
    for session in [Session::S2, Session::Practice, Session::S1] {
        let update = ProgressUpdate::new("p1", session, 0, Stage::Survey, false);
        storage.upsert_progress(&update).unwrap();
    }
    let other = ProgressUpdate::new("other", Session::S1, 0, Stage::Survey, false);
    storage.upsert_progress(&other).unwrap();

    let sessions: Vec<Session> =
        storage.list_progress("p1").unwrap().into_iter().map(|p| p.session).collect();
    assert_eq!(sessions, vec![Session::Practice, Session::S1, Session::S2]);
}
