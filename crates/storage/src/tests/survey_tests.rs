#![allow(clippy::unwrap_used, reason = "test code")]

use serde_json::json;
use voice_study_core::{NewSurveyResponse, Session, SurveyFilter, TaskId};

use super::create_test_storage;

fn response(participant: &str, session: Session, stage: &str) -> NewSurveyResponse {
    NewSurveyResponse {
        participant_id: participant.to_owned(),
        session,
        task_id: Some("BIRTHDAY_GIFT".to_owned()),
        stage: stage.to_owned(),
        condition: Some("SUMMARY".to_owned()),
        answers: json!({ "q1": "4", "nested": { "list": [1, 2] } }),
    }
}

#[test]
fn surveys_accumulate_and_filter() {
    let (storage, _temp_dir) = create_test_storage();
    let first = storage.save_survey(&response("p1", Session::S1, "pre")).unwrap();
    storage.save_survey(&response("p1", Session::S1, "pre")).unwrap();
    storage.save_survey(&response("p1", Session::S1, "post")).unwrap();
    storage.save_survey(&response("p2", Session::S2, "pre")).unwrap();

    assert_eq!(first.answers["nested"]["list"], json!([1, 2]));
    assert_eq!(storage.list_surveys(&SurveyFilter::default()).unwrap().len(), 4);

    let filter = SurveyFilter {
        participant_id: Some("p1".to_owned()),
        session: Some(Session::S1),
        stage: Some("pre".to_owned()),
    };
    let listed = storage.list_surveys(&filter).unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0], first);
    assert!(listed[0].id < listed[1].id);

    let by_session = SurveyFilter { session: Some(Session::S2), ..SurveyFilter::default() };
    assert_eq!(storage.list_surveys(&by_session).unwrap().len(), 1);
}

#[test]
fn optional_survey_fields_round_trip() {
    let (storage, _temp_dir) = create_test_storage();
    let mut demographics = response("p1", Session::S1, "demographics");
    demographics.task_id = None;
    demographics.condition = None;
    demographics.answers = json!(["free", "form"]);

    let saved = storage.save_survey(&demographics).unwrap();
    assert_eq!(saved.task_id, None);
    assert_eq!(saved.condition, None);
    assert_eq!(saved.answers, json!(["free", "form"]));
}

#[test]
fn task_note_upsert_keeps_latest() {
    let (storage, _temp_dir) = create_test_storage();
    let first = storage.upsert_task_note("p1", TaskId::WeekendTrip, "draft").unwrap();
    let second = storage.upsert_task_note("p1", TaskId::WeekendTrip, "final").unwrap();
    storage.upsert_task_note("p1", TaskId::BirthdayGift, "cake").unwrap();

    assert_eq!(first.id, second.id);
    let notes = storage.list_task_notes("p1").unwrap();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0].task_id, TaskId::BirthdayGift);
    assert_eq!(notes[1].note, "final");
    assert!(storage.list_task_notes("p2").unwrap().is_empty());
}
