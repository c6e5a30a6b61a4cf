//! Closed vocabularies of the study design: groups, tasks and conditions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// One of the nine counterbalancing groups. Fixed for a participant's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Group {
    G1,
    G2,
    G3,
    G4,
    G5,
    G6,
    G7,
    G8,
    G9,
}

impl Group {
    /// Canonical order, also the tie-break order for balanced assignment.
    pub const ALL: [Self; 9] =
        [Self::G1, Self::G2, Self::G3, Self::G4, Self::G5, Self::G6, Self::G7, Self::G8, Self::G9];

    /// Zero-based position in [`Group::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::G1 => 0,
            Self::G2 => 1,
            Self::G3 => 2,
            Self::G4 => 3,
            Self::G5 => 4,
            Self::G6 => 5,
            Self::G7 => 6,
            Self::G8 => 7,
            Self::G9 => 8,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::G1 => "G1",
            Self::G2 => "G2",
            Self::G3 => "G3",
            Self::G4 => "G4",
            Self::G5 => "G5",
            Self::G6 => "G6",
            Self::G7 => "G7",
            Self::G8 => "G8",
            Self::G9 => "G9",
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Group {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| ParseError::new("group", s))
    }
}

/// The three canonical search topics every participant works through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskId {
    BirthdayGift,
    FarewellParty,
    WeekendTrip,
}

impl TaskId {
    pub const ALL: [Self; 3] = [Self::BirthdayGift, Self::FarewellParty, Self::WeekendTrip];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BirthdayGift => "BIRTHDAY_GIFT",
            Self::FarewellParty => "FAREWELL_PARTY",
            Self::WeekendTrip => "WEEKEND_TRIP",
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseError::new("task id", s))
    }
}

/// Experimental treatment applied to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Condition {
    Summary,
    Narrative,
    /// Control: no playback before the task.
    None,
}

impl Condition {
    pub const ALL: [Self; 3] = [Self::Summary, Self::Narrative, Self::None];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Summary => "SUMMARY",
            Self::Narrative => "NARRATIVE",
            Self::None => "NONE",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ParseError::new("condition", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_index_matches_canonical_order() {
        for (i, g) in Group::ALL.into_iter().enumerate() {
            assert_eq!(g.index(), i);
        }
    }

    #[test]
    fn parse_round_trips_display() {
        for g in Group::ALL {
            assert_eq!(g.to_string().parse::<Group>(), Ok(g));
        }
        assert_eq!("WEEKEND_TRIP".parse::<TaskId>(), Ok(TaskId::WeekendTrip));
        assert_eq!("NONE".parse::<Condition>(), Ok(Condition::None));
    }

    #[test]
    fn parse_rejects_unknown_values() {
        let err = "G10".parse::<Group>().unwrap_err();
        assert_eq!(err.kind, "group");
        assert!("birthday_gift".parse::<TaskId>().is_err());
        assert!("".parse::<Condition>().is_err());
    }

    #[test]
    fn serde_uses_wire_names() {
        assert_eq!(serde_json::to_string(&TaskId::FarewellParty).unwrap(), "\"FAREWELL_PARTY\"");
        assert_eq!(serde_json::to_string(&Condition::None).unwrap(), "\"NONE\"");
        assert_eq!(serde_json::to_string(&Group::G7).unwrap(), "\"G7\"");
    }
}
