use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::experiment::TaskId;
use crate::progress::Session;

/// Schema-less answers document; each survey stage owns its shape.
pub type Answers = serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSurveyResponse {
    pub participant_id: String,
    pub session: Session,
    pub task_id: Option<String>,
    pub stage: String,
    pub condition: Option<String>,
    pub answers: Answers,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResponse {
    pub id: i64,
    pub participant_id: String,
    pub session: Session,
    pub task_id: Option<String>,
    pub stage: String,
    pub condition: Option<String>,
    pub answers: Answers,
    pub created_at: DateTime<Utc>,
}

/// Optional equality filters for listing survey responses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurveyFilter {
    pub participant_id: Option<String>,
    pub session: Option<Session>,
    pub stage: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskNote {
    pub id: String,
    pub participant_id: String,
    pub task_id: TaskId,
    pub note: String,
    pub updated_at: DateTime<Utc>,
}

/// Check a post-task answers document: a non-empty object with no null or blank values.
///
/// # Errors
/// Returns a description of the first problem found.
pub fn check_post_answers(answers: &Answers) -> Result<(), String> {
    let Some(map) = answers.as_object() else {
        return Err("answers must be an object".to_owned());
    };
    if map.is_empty() {
        return Err("answers must not be empty".to_owned());
    }
    for (key, value) in map {
        let blank = match value {
            serde_json::Value::Null => true,
            serde_json::Value::String(s) => s.trim().is_empty(),
            _ => false,
        };
        if blank {
            return Err(format!("{key} is unanswered"));
        }
    }
    Ok(())
}
