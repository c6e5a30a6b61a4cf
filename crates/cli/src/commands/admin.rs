//! Operator commands run directly against the store.

use anyhow::Result;
use serde_json::json;
use voice_study_core::{Condition, Group, TaskId, assignment_plan};
use voice_study_service::{ParticipantService, PlaybackService, ProgressService};

use crate::open_storage;

pub(crate) fn run_plan(group: Option<Group>) -> Result<()> {
    let groups = group.map_or_else(|| Group::ALL.to_vec(), |g| vec![g]);
    for g in groups {
        let entries: Vec<String> = assignment_plan(g)
            .iter()
            .map(|e| format!("{}. {} / {}", e.order_index, e.task_id, e.condition_id))
            .collect();
        println!("{g}: {}", entries.join(", "));
    }
    Ok(())
}

pub(crate) async fn run_register(id: &str, group: Option<Group>) -> Result<()> {
    let service = ParticipantService::new(open_storage().await?);
    let registration = service.register(id, group).await?;
    let output = json!({
        "participant": registration.participant,
        "assignments": registration.assignments,
        "source": registration.source.as_str(),
        "created": registration.created,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub(crate) async fn run_participants() -> Result<()> {
    let service = ParticipantService::new(open_storage().await?);
    let participants = service.list().await?;
    let counts = service.group_counts().await?;
    let per_group: serde_json::Map<String, serde_json::Value> =
        Group::ALL.iter().map(|g| (g.to_string(), json!(counts.get(*g)))).collect();
    let output = json!({ "participants": participants, "groupCounts": per_group });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub(crate) async fn run_progress(participant_id: &str) -> Result<()> {
    let service = ProgressService::new(open_storage().await?);
    let progress = service.list(participant_id).await?;
    println!("{}", serde_json::to_string_pretty(&progress)?);
    Ok(())
}

pub(crate) async fn run_playback_set(
    participant_id: &str,
    task_id: TaskId,
    condition_id: Condition,
    url: &str,
) -> Result<()> {
    let service = PlaybackService::new(open_storage().await?);
    let asset = service.set_audio_url(participant_id, task_id, condition_id, url).await?;
    println!("{}", serde_json::to_string_pretty(&asset)?);
    Ok(())
}

pub(crate) async fn run_playback_list(participant_id: &str) -> Result<()> {
    let service = PlaybackService::new(open_storage().await?);
    let assets = service.list(participant_id).await?;
    println!("{}", serde_json::to_string_pretty(&assets)?);
    Ok(())
}
