//! Latin-square assignment planning and balanced group resolution.
//!
//! Task order and condition order are two independent cyclic Latin squares.
//! Group `g` (zero-based) uses task rotation `g % 3` and condition rotation
//! `g / 3`, so the nine groups cross every task order with every condition
//! order exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::TASKS_PER_SESSION;
use crate::experiment::{Condition, Group, TaskId};

const TASK_ORDERS: [[TaskId; TASKS_PER_SESSION]; 3] = [
    [TaskId::BirthdayGift, TaskId::FarewellParty, TaskId::WeekendTrip],
    [TaskId::FarewellParty, TaskId::WeekendTrip, TaskId::BirthdayGift],
    [TaskId::WeekendTrip, TaskId::BirthdayGift, TaskId::FarewellParty],
];

const CONDITION_ORDERS: [[Condition; TASKS_PER_SESSION]; 3] = [
    [Condition::Summary, Condition::Narrative, Condition::None],
    [Condition::Narrative, Condition::None, Condition::Summary],
    [Condition::None, Condition::Summary, Condition::Narrative],
];

const ORDER_INDICES: [i32; TASKS_PER_SESSION] = [1, 2, 3];

/// One slot of a participant's plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanEntry {
    /// 1-based presentation position.
    pub order_index: i32,
    pub task_id: TaskId,
    pub condition_id: Condition,
}

/// The ordered (task, condition) plan for a group. Pure and stable.
#[must_use]
pub fn assignment_plan(group: Group) -> [PlanEntry; TASKS_PER_SESSION] {
    let g = group.index();
    let tasks = &TASK_ORDERS[g % 3];
    let conditions = &CONDITION_ORDERS[g / 3];
    std::array::from_fn(|i| PlanEntry {
        order_index: ORDER_INDICES[i],
        task_id: tasks[i],
        condition_id: conditions[i],
    })
}

/// Participant counts per group, missing groups count as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupCounts([u64; 9]);

impl GroupCounts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, group: Group, count: u64) {
        self.0[group.index()] = count;
    }

    #[must_use]
    pub const fn get(&self, group: Group) -> u64 {
        self.0[group.index()]
    }

    /// First group in canonical order among those with the minimum count.
    #[must_use]
    pub fn least_populated(&self) -> Group {
        Group::ALL.into_iter().min_by_key(|g| self.get(*g)).unwrap_or(Group::G1)
    }
}

impl FromIterator<(Group, u64)> for GroupCounts {
    fn from_iter<I: IntoIterator<Item = (Group, u64)>>(iter: I) -> Self {
        let mut counts = Self::new();
        for (group, count) in iter {
            counts.set(group, count);
        }
        counts
    }
}

/// Why a participant ended up in a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupSource {
    /// Already registered; the stored group is kept.
    Existing,
    /// Caller asked for this group.
    Explicit,
    /// Picked as the least populated group.
    Balanced,
}

impl GroupSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Existing => "existing",
            Self::Explicit => "explicit",
            Self::Balanced => "balanced",
        }
    }
}

/// The group fixed without looking at counts, if any.
///
/// Storage backends call this first and only aggregate group counts when it
/// returns `None`.
#[must_use]
pub const fn preassigned_group(
    existing: Option<Group>,
    explicit: Option<Group>,
) -> Option<(Group, GroupSource)> {
    match (existing, explicit) {
        (Some(g), _) => Some((g, GroupSource::Existing)),
        (None, Some(g)) => Some((g, GroupSource::Explicit)),
        (None, None) => None,
    }
}

/// Full resolution: existing group, else explicit group, else least populated.
#[must_use]
pub fn resolve_group(
    existing: Option<Group>,
    explicit: Option<Group>,
    counts: &GroupCounts,
) -> (Group, GroupSource) {
    preassigned_group(existing, explicit)
        .unwrap_or_else(|| (counts.least_populated(), GroupSource::Balanced))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub group: Group,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: String,
    pub participant_id: String,
    pub task_id: TaskId,
    pub order_index: i32,
    pub condition_id: Condition,
}

/// Audio played back before a task. `audio_url` is curated by hand after
/// registration and empty until then.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackAsset {
    pub id: String,
    pub participant_id: String,
    pub task_id: TaskId,
    pub condition_id: Condition,
    pub audio_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn plan_is_stable_and_covers_each_task_once() {
        for group in Group::ALL {
            let plan = assignment_plan(group);
            assert_eq!(plan, assignment_plan(group));

            let tasks: HashSet<TaskId> = plan.iter().map(|e| e.task_id).collect();
            assert_eq!(tasks.len(), TASKS_PER_SESSION);

            let mut orders: Vec<i32> = plan.iter().map(|e| e.order_index).collect();
            orders.sort_unstable();
            assert_eq!(orders, vec![1, 2, 3]);
        }
    }

    #[test]
    fn plan_conditions_form_a_permutation() {
        for group in Group::ALL {
            let conditions: HashSet<Condition> =
                assignment_plan(group).iter().map(|e| e.condition_id).collect();
            assert_eq!(conditions.len(), 3, "group {group}");
        }
    }

    #[test]
    fn groups_cross_task_and_condition_orders() {
        let mut seen = HashSet::new();
        for group in Group::ALL {
            let plan = assignment_plan(group);
            let tasks: Vec<TaskId> = plan.iter().map(|e| e.task_id).collect();
            let conditions: Vec<Condition> = plan.iter().map(|e| e.condition_id).collect();
            assert!(seen.insert((tasks, conditions)), "duplicate plan for {group}");
        }
        assert_eq!(seen.len(), 9);
    }

    #[test]
    fn each_task_condition_pair_leads_exactly_one_group() {
        let mut pairs = HashSet::new();
        for group in Group::ALL {
            let first = assignment_plan(group)[0];
            assert!(pairs.insert((first.task_id, first.condition_id)));
        }
        for task in TaskId::ALL {
            for condition in Condition::ALL {
                assert!(pairs.contains(&(task, condition)), "{task} x {condition} missing");
            }
        }
    }

    #[test]
    fn each_task_sees_each_condition_equally_often() {
        let mut tally = std::collections::HashMap::new();
        for group in Group::ALL {
            for entry in assignment_plan(group) {
                *tally.entry((entry.task_id, entry.condition_id)).or_insert(0) += 1;
            }
        }
        assert_eq!(tally.len(), 9);
        assert!(tally.values().all(|n| *n == 3));
    }

    #[test]
    fn known_plans() {
        let g1 = assignment_plan(Group::G1);
        assert_eq!(g1[0].task_id, TaskId::BirthdayGift);
        assert_eq!(g1[0].condition_id, Condition::Summary);
        assert_eq!(g1[2].condition_id, Condition::None);

        let g2 = assignment_plan(Group::G2);
        assert_eq!(g2[0].task_id, TaskId::FarewellParty);
        assert_eq!(g2[0].condition_id, Condition::Summary);

        let g9 = assignment_plan(Group::G9);
        assert_eq!(g9[0].task_id, TaskId::WeekendTrip);
        assert_eq!(g9[0].condition_id, Condition::None);
        assert_eq!(g9[1].task_id, TaskId::BirthdayGift);
        assert_eq!(g9[1].condition_id, Condition::Summary);
    }

    #[test]
    fn least_populated_breaks_ties_in_canonical_order() {
        let counts: GroupCounts = [
            (Group::G1, 5),
            (Group::G2, 3),
            (Group::G3, 3),
            (Group::G4, 5),
            (Group::G5, 5),
            (Group::G6, 5),
            (Group::G7, 5),
            (Group::G8, 5),
            (Group::G9, 5),
        ]
        .into_iter()
        .collect();
        assert_eq!(resolve_group(None, None, &counts), (Group::G2, GroupSource::Balanced));
    }

    #[test]
    fn empty_counts_pick_first_group() {
        assert_eq!(GroupCounts::new().least_populated(), Group::G1);
        let counts: GroupCounts = [(Group::G1, 1)].into_iter().collect();
        assert_eq!(counts.least_populated(), Group::G2);
    }

    #[test]
    fn existing_group_wins_over_explicit_request() {
        let counts = GroupCounts::new();
        assert_eq!(
            resolve_group(Some(Group::G4), Some(Group::G7), &counts),
            (Group::G4, GroupSource::Existing)
        );
        assert_eq!(
            resolve_group(None, Some(Group::G7), &counts),
            (Group::G7, GroupSource::Explicit)
        );
    }
}
