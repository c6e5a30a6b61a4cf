//! Result types shared by both backends.

use std::str::FromStr;

use voice_study_core::{Assignment, Group, GroupCounts, GroupSource, ParseError, Participant};

use crate::error::StorageError;

/// Outcome of the registrar transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub participant: Participant,
    /// The three planned assignments, ordered by `order_index`.
    pub assignments: Vec<Assignment>,
    pub source: GroupSource,
    /// `false` when the id was already registered.
    pub created: bool,
}

/// What an `append_turns` call actually wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendOutcome {
    pub inserted: usize,
    /// Turns at or below the stored high-water mark of their scope.
    pub skipped: usize,
    /// Sum of summary increments across all scopes in the batch.
    pub assistant_run_starts: i64,
}

/// Parse a closed-enum text column; unknown literals mean the row is corrupt.
pub(crate) fn parse_stored<T>(column: &'static str, raw: &str) -> Result<T, StorageError>
where
    T: FromStr<Err = ParseError>,
{
    raw.parse().map_err(|e| StorageError::corrupt(format!("invalid {column} column"), e))
}

/// Fold `(group literal, count)` rows into [`GroupCounts`], skipping unknown literals.
pub(crate) fn counts_from_rows<I>(rows: I) -> GroupCounts
where
    I: IntoIterator<Item = (String, i64)>,
{
    let mut counts = GroupCounts::new();
    for (raw, count) in rows {
        match raw.parse::<Group>() {
            Ok(group) => counts.set(group, u64::try_from(count).unwrap_or(0)),
            Err(e) => tracing::warn!(error = %e, count, "ignoring participants with unknown group"),
        }
    }
    counts
}
