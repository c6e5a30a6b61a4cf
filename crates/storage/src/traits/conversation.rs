use async_trait::async_trait;
use voice_study_core::{
    ConversationSummary, NewTimingEvent, NewTurn, TimingEvent, TurnScope, TurnView,
};

use crate::error::StorageError;
use crate::types::AppendOutcome;

/// Append-only conversation logs and the derived per-task summary.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Append a batch of turns in one transaction.
    ///
    /// Turns whose index is not above the highest stored index of their scope
    /// are skipped. For each scope, assistant runs that start after a
    /// non-assistant turn (seeded with the last stored role) are added to the
    /// summary counter.
    async fn append_turns(&self, turns: &[NewTurn]) -> Result<AppendOutcome, StorageError>;

    /// Turns with text, ordered by turn index.
    async fn list_turns(&self, scope: &TurnScope) -> Result<Vec<TurnView>, StorageError>;

    /// Append timing events verbatim. Returns the number of rows written.
    async fn append_timing_events(&self, events: &[NewTimingEvent]) -> Result<usize, StorageError>;

    /// Timing events of one scope in insertion order.
    async fn list_timing_events(&self, scope: &TurnScope) -> Result<Vec<TimingEvent>, StorageError>;

    /// Counter and next free turn index; zeros when nothing was recorded.
    async fn get_conversation_summary(
        &self,
        scope: &TurnScope,
    ) -> Result<ConversationSummary, StorageError>;
}
