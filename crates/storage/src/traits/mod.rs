//! Storage backend trait abstraction
//!
//! Async domain traits implemented by both `PgStorage` and the SQLite
//! `Storage`, dispatched through `StorageBackend`.

pub mod conversation;
pub mod participant;
pub mod progress;
pub mod survey;

pub use conversation::ConversationStore;
pub use participant::{ParticipantStore, PlaybackStore};
pub use progress::ProgressStore;
pub use survey::{SurveyStore, TaskNoteStore};
